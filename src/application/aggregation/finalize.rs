use super::AggregationContext;
use crate::domain::ensemble::diversity::max_entropy_bits;
use crate::domain::ensemble::{AggregationMethod, DiversityAnalyzer, RiskAssessor};
use crate::domain::signal::{EnsembleSignal, ModelSignal, ProbabilityDistribution, SignalAction};

/// Strategy-specific part of a decision, before the shared post-processing
#[derive(Debug, Clone)]
pub struct Tally {
    pub masses: [f64; 3],
    pub consensus: f64,
    pub confidence: f64,
    pub strength: f64,
    /// Strategy's own uncertainty estimate, before consensus widening
    pub uncertainty: f64,
    pub contributing_models: Vec<String>,
    pub regime: Option<String>,
    pub explanations: Vec<String>,
}

/// Normalized entropy of a distribution in BUY, SELL, HOLD order
pub fn normalized_entropy(distribution: &ProbabilityDistribution) -> f64 {
    (distribution.entropy_bits() / max_entropy_bits()).clamp(0.0, 1.0)
}

/// Shared post-processing: normalizes the distribution, widens uncertainty under low
/// consensus, attaches the risk assessment and the diversity score.
pub fn finalize(
    method: AggregationMethod,
    signals: &[ModelSignal],
    tally: Tally,
    ctx: &AggregationContext<'_>,
) -> EnsembleSignal {
    let distribution = ProbabilityDistribution::from_masses(tally.masses);
    // Raw masses decide, so exact ties keep enumeration order after normalization
    let action = SignalAction::argmax(&tally.masses);
    let consensus = clamp_unit(tally.consensus);

    let mut uncertainty = clamp_unit(tally.uncertainty);
    if consensus < ctx.config.consensus_threshold {
        uncertainty = uncertainty.max(1.0 - consensus);
    }

    let diversity = DiversityAnalyzer::analyze(signals);
    let risk_assessment = RiskAssessor::assess(signals, consensus, &diversity, ctx.risk);

    let mut explanations = tally.explanations;
    for factor in &risk_assessment.factors {
        explanations.push(format!("Risk: {factor}"));
    }

    EnsembleSignal {
        action,
        confidence: clamp_unit(tally.confidence),
        strength: clamp_unit(tally.strength),
        consensus_level: consensus,
        diversity_score: diversity.normalized_entropy(),
        uncertainty: clamp_unit(uncertainty),
        method,
        regime: tally.regime,
        contributing_models: tally.contributing_models,
        probability_distribution: distribution,
        risk_assessment,
        explanations,
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Mean strength of the signals that voted for `action`
pub fn supporter_strength(signals: &[ModelSignal], action: SignalAction) -> f64 {
    let supporters: Vec<f64> = signals
        .iter()
        .filter(|s| s.action == action)
        .map(|s| s.strength)
        .collect();
    if supporters.is_empty() {
        0.0
    } else {
        supporters.iter().sum::<f64>() / supporters.len() as f64
    }
}
