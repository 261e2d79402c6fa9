use crate::domain::signal::SignalAction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Approximate Shapley value of one input feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureAttribution {
    pub index: usize,
    pub name: String,
    pub value: f64,
    pub attribution: f64,
}

/// Coefficient of the local linear surrogate for one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub index: usize,
    pub name: String,
    pub coefficient: f64,
    /// `coefficient * value`, the contribution at the explained point
    pub contribution: f64,
}

/// Weighted linear surrogate fitted around the explained point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalExplanation {
    pub intercept: f64,
    pub contributions: Vec<FeatureContribution>,
    /// `exp(-weighted MSE)`, in (0, 1]
    pub local_fidelity: f64,
    pub r_squared: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionStep {
    pub depth: usize,
    pub feature_index: usize,
    pub feature_name: String,
    pub value: f64,
    pub threshold: f64,
    pub information_gain: f64,
    pub decision: SignalAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    Volatility,
    Liquidity,
    TrendReversal,
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskCategory::Volatility => write!(f, "volatility"),
            RiskCategory::Liquidity => write!(f, "liquidity"),
            RiskCategory::TrendReversal => write!(f, "trend reversal"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub category: RiskCategory,
    pub severity: Severity,
    pub feature: String,
    pub attribution: f64,
    pub description: String,
    pub mitigations: Vec<String>,
}

/// Full explanation of one prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationResult {
    pub action: SignalAction,
    pub confidence: f64,
    pub score: f64,
    pub attributions: Vec<FeatureAttribution>,
    pub local: LocalExplanation,
    pub decision_path: Vec<DecisionStep>,
    pub risk_factors: Vec<RiskFactor>,
    pub narrative: String,
}

impl ExplanationResult {
    /// Attributions sorted by magnitude, largest first
    pub fn top_attributions(&self, n: usize) -> Vec<&FeatureAttribution> {
        let mut sorted: Vec<&FeatureAttribution> = self.attributions.iter().collect();
        sorted.sort_by(|a, b| {
            b.attribution
                .abs()
                .partial_cmp(&a.attribution.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted.truncate(n);
        sorted
    }
}
