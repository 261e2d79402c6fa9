use super::diversity::DiversityMetrics;
use crate::domain::signal::{ModelSignal, RiskAssessment, RiskLevel};
use serde::{Deserialize, Serialize};

/// Trigger levels for the ensemble risk rules
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub min_consensus: f64,
    pub max_pairwise_correlation: f64,
    pub min_average_confidence: f64,
    /// Entropy ceiling in bits
    pub max_entropy_bits: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            min_consensus: 0.6,
            max_pairwise_correlation: 0.8,
            min_average_confidence: 0.5,
            max_entropy_bits: 1.5,
        }
    }
}

pub const LOW_CONSENSUS: &str = "low consensus";
pub const HIGH_CORRELATION: &str = "high model correlation";
pub const LOW_CONFIDENCE: &str = "low average confidence";
pub const HIGH_UNCERTAINTY: &str = "high uncertainty";

pub struct RiskAssessor;

impl RiskAssessor {
    pub fn assess(
        signals: &[ModelSignal],
        consensus_level: f64,
        diversity: &DiversityMetrics,
        thresholds: &RiskThresholds,
    ) -> RiskAssessment {
        let mut risk = RiskAssessment::low();

        if consensus_level < thresholds.min_consensus {
            risk.flag(LOW_CONSENSUS, "reduce position size", RiskLevel::Medium);
        }

        if diversity.average_pairwise_correlation > thresholds.max_pairwise_correlation {
            risk.flag(HIGH_CORRELATION, "diversify model pool", RiskLevel::Medium);
        }

        if !signals.is_empty() {
            let mean_confidence =
                signals.iter().map(|s| s.confidence).sum::<f64>() / signals.len() as f64;
            if mean_confidence < thresholds.min_average_confidence {
                risk.flag(LOW_CONFIDENCE, "await stronger signal", RiskLevel::High);
            }
        }

        if diversity.entropy > thresholds.max_entropy_bits {
            risk.flag(HIGH_UNCERTAINTY, "use conservative sizing", RiskLevel::Medium);
        }

        risk
    }
}
