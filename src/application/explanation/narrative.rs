use crate::domain::explanation::{FeatureAttribution, RiskFactor};
use crate::domain::signal::SignalAction;

const TOP_FEATURES: usize = 3;

pub fn confidence_bucket(confidence: f64) -> &'static str {
    if confidence >= 0.7 {
        "high"
    } else if confidence >= 0.4 {
        "moderate"
    } else {
        "low"
    }
}

/// Human-readable summary of an explained prediction
pub fn compose_narrative(
    action: SignalAction,
    confidence: f64,
    attributions: &[FeatureAttribution],
    risk_factors: &[RiskFactor],
) -> String {
    let mut narrative = format!(
        "Recommendation: {} with {} confidence ({:.2}).",
        action,
        confidence_bucket(confidence),
        confidence
    );

    let total: f64 = attributions.iter().map(|a| a.attribution.abs()).sum();
    if total > f64::EPSILON {
        let mut ranked: Vec<&FeatureAttribution> = attributions.iter().collect();
        ranked.sort_by(|a, b| {
            b.attribution
                .abs()
                .partial_cmp(&a.attribution.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let drivers: Vec<String> = ranked
            .iter()
            .take(TOP_FEATURES)
            .map(|a| format!("{} ({:+.1}%)", a.name, a.attribution / total * 100.0))
            .collect();
        narrative.push_str(&format!(" Key drivers: {}.", drivers.join(", ")));
    } else {
        narrative.push_str(" No feature carried measurable weight.");
    }

    if !risk_factors.is_empty() {
        let risks: Vec<String> = risk_factors
            .iter()
            .map(|r| format!("{} via {} ({})", r.category, r.feature, r.severity))
            .collect();
        narrative.push_str(&format!(" Risks: {}.", risks.join("; ")));
    }

    narrative
}
