use super::finalize::{Tally, finalize, normalized_entropy};
use super::{AggregationContext, AggregationStrategy, ensure_non_empty};
use crate::domain::ensemble::{AggregationMethod, WeightPartition};
use crate::domain::errors::EnsembleError;
use crate::domain::signal::{
    EnsembleSignal, ModelPerformance, ModelSignal, ProbabilityDistribution, SignalAction,
};

const MIN_PERFORMANCE_WEIGHT: f64 = 0.1;
const MASS_EPSILON: f64 = 1e-12;

/// Composite quality score of a model's track record
///
/// `0.30·accuracy + 0.30·tanh(sharpe/2) + 0.25·tanh(profit_factor/2) + 0.15·f1`, floored at 0.1
pub fn performance_weight(performance: &ModelPerformance) -> f64 {
    let score = 0.30 * performance.accuracy
        + 0.30 * (performance.sharpe_ratio / 2.0).tanh()
        + 0.25 * (performance.profit_factor / 2.0).tanh()
        + 0.15 * performance.f1_score;

    if score.is_finite() {
        score.max(MIN_PERFORMANCE_WEIGHT)
    } else {
        MIN_PERFORMANCE_WEIGHT
    }
}

/// Votes weighted by track record and the adaptive performance multiplier
pub struct PerformanceWeightedStrategy;

impl AggregationStrategy for PerformanceWeightedStrategy {
    fn method(&self) -> AggregationMethod {
        AggregationMethod::PerformanceWeighted
    }

    fn aggregate(
        &self,
        signals: &[ModelSignal],
        ctx: &AggregationContext<'_>,
    ) -> Result<EnsembleSignal, EnsembleError> {
        ensure_non_empty(signals)?;
        let tally = weighted_tally(signals, ctx);
        Ok(finalize(self.method(), signals, tally, ctx))
    }
}

/// Weighted vote shared with the contextual strategy, which runs it on its selected subset
pub(crate) fn weighted_tally(signals: &[ModelSignal], ctx: &AggregationContext<'_>) -> Tally {
    let mut masses = [0.0_f64; 3];
    let mut weight_sum = 0.0;
    let mut weighted_confidence = 0.0;
    let mut weights = Vec::with_capacity(signals.len());

    for signal in signals {
        let weight = performance_weight(&signal.performance)
            * ctx.weights.get(&WeightPartition::Performance, &signal.model_id);
        masses[signal.action.index()] += weight * signal.confidence;
        weight_sum += weight;
        weighted_confidence += weight * signal.confidence;
        weights.push(weight);
    }

    let total_mass: f64 = masses.iter().sum();
    let (winner, consensus) = if total_mass > MASS_EPSILON {
        let winner = SignalAction::argmax(&masses);
        (winner, masses[winner.index()] / total_mass)
    } else {
        // every model reported zero confidence
        (SignalAction::Buy, 1.0 / 3.0)
    };

    let mean_confidence = if weight_sum > MASS_EPSILON {
        weighted_confidence / weight_sum
    } else {
        0.0
    };

    let mut supporter_weight = 0.0;
    let mut supporter_strength = 0.0;
    let mut explanations = Vec::new();
    for (signal, weight) in signals.iter().zip(&weights) {
        if signal.action == winner {
            supporter_weight += weight;
            supporter_strength += weight * signal.strength;
            explanations.push(format!(
                "{}: {} @ {:.2} (weight {:.3})",
                signal.model_name, signal.action, signal.confidence, weight
            ));
        }
    }
    explanations.insert(
        0,
        format!(
            "Performance-weighted vote: {} with {:.1}% of weighted mass",
            winner,
            consensus * 100.0
        ),
    );

    Tally {
        masses,
        consensus,
        confidence: mean_confidence * consensus,
        strength: if supporter_weight > MASS_EPSILON {
            supporter_strength / supporter_weight
        } else {
            0.0
        },
        uncertainty: normalized_entropy(&ProbabilityDistribution::from_masses(masses)),
        contributing_models: signals.iter().map(|s| s.model_id.clone()).collect(),
        regime: None,
        explanations,
    }
}
