use crate::domain::explanation::{FeatureAttribution, RiskCategory, RiskFactor, Severity};

const VOLATILITY_KEYWORDS: &[&str] = &["volatil"];
const LIQUIDITY_KEYWORDS: &[&str] = &["liquid", "volume", "spread"];
const TREND_KEYWORDS: &[&str] = &["trend", "momentum", "adx", "macd"];

/// Flags features whose names and attributions point at a known market risk
pub fn identify_risk_factors(attributions: &[FeatureAttribution]) -> Vec<RiskFactor> {
    let mut factors: Vec<RiskFactor> = attributions.iter().filter_map(classify).collect();
    factors.sort_by(|a, b| b.severity.cmp(&a.severity));
    factors
}

fn classify(attribution: &FeatureAttribution) -> Option<RiskFactor> {
    let name = attribution.name.to_lowercase();
    let magnitude = attribution.attribution.abs();
    let matches = |keywords: &[&str]| keywords.iter().any(|k| name.contains(k));

    if matches(VOLATILITY_KEYWORDS) {
        let severity = if magnitude > 0.7 {
            Severity::Critical
        } else if magnitude > 0.4 {
            Severity::High
        } else {
            return None;
        };
        return Some(RiskFactor {
            category: RiskCategory::Volatility,
            severity,
            feature: attribution.name.clone(),
            attribution: attribution.attribution,
            description: format!(
                "{} drives {:.2} of the score; price swings may exceed model assumptions",
                attribution.name, attribution.attribution
            ),
            mitigations: vec![
                "reduce position size".to_string(),
                "widen stop-loss".to_string(),
            ],
        });
    }

    if matches(LIQUIDITY_KEYWORDS) {
        let severity = if magnitude > 0.7 {
            Severity::High
        } else if magnitude > 0.5 {
            Severity::Medium
        } else {
            return None;
        };
        return Some(RiskFactor {
            category: RiskCategory::Liquidity,
            severity,
            feature: attribution.name.clone(),
            attribution: attribution.attribution,
            description: format!(
                "{} carries {:.2} of the score; fills may slip",
                attribution.name, attribution.attribution
            ),
            mitigations: vec![
                "use limit orders".to_string(),
                "split the order".to_string(),
            ],
        });
    }

    if matches(TREND_KEYWORDS) && attribution.attribution < -0.5 {
        return Some(RiskFactor {
            category: RiskCategory::TrendReversal,
            severity: Severity::Medium,
            feature: attribution.name.clone(),
            attribution: attribution.attribution,
            description: format!(
                "{} pushes against the signal ({:.2}); trend may be reversing",
                attribution.name, attribution.attribution
            ),
            mitigations: vec![
                "wait for trend confirmation".to_string(),
                "tighten trailing stop".to_string(),
            ],
        });
    }

    None
}
