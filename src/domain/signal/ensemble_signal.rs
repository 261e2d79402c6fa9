use super::types::SignalAction;
use crate::domain::ensemble::method::AggregationMethod;
use serde::{Deserialize, Serialize};
use std::fmt;

const DISTRIBUTION_EPSILON: f64 = 1e-12;

/// Probability mass over the three actions. Always normalized to sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityDistribution {
    pub buy: f64,
    pub sell: f64,
    pub hold: f64,
}

impl ProbabilityDistribution {
    pub fn uniform() -> Self {
        Self {
            buy: 1.0 / 3.0,
            sell: 1.0 / 3.0,
            hold: 1.0 / 3.0,
        }
    }

    /// Normalizes non-negative masses (BUY, SELL, HOLD order).
    /// Falls back to uniform when the total mass is zero or not finite.
    pub fn from_masses(masses: [f64; 3]) -> Self {
        let cleaned = masses.map(|m| if m.is_finite() && m > 0.0 { m } else { 0.0 });
        let total: f64 = cleaned.iter().sum();
        if total <= DISTRIBUTION_EPSILON {
            return Self::uniform();
        }
        let buy = cleaned[0] / total;
        let sell = cleaned[1] / total;
        // Remainder keeps the sum exact despite rounding
        let hold = (1.0 - buy - sell).max(0.0);
        Self { buy, sell, hold }
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.buy, self.sell, self.hold]
    }

    pub fn get(&self, action: SignalAction) -> f64 {
        self.as_array()[action.index()]
    }

    pub fn sum(&self) -> f64 {
        self.buy + self.sell + self.hold
    }

    pub fn argmax(&self) -> SignalAction {
        SignalAction::argmax(&self.as_array())
    }

    /// Shannon entropy in bits
    pub fn entropy_bits(&self) -> f64 {
        shannon_entropy_bits(&self.as_array())
    }
}

/// Shannon entropy (base 2) of a probability vector; zero entries contribute nothing
pub fn shannon_entropy_bits(probabilities: &[f64]) -> f64 {
    probabilities
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| -p * p.log2())
        .sum()
}

/// Qualitative risk posture of an ensemble decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub factors: Vec<String>,
    pub mitigations: Vec<String>,
}

impl RiskAssessment {
    pub fn low() -> Self {
        Self {
            level: RiskLevel::Low,
            factors: Vec::new(),
            mitigations: Vec::new(),
        }
    }

    /// Records a factor and raises the level to at least `floor`
    pub fn flag(&mut self, factor: &str, mitigation: &str, floor: RiskLevel) {
        self.factors.push(factor.to_string());
        self.mitigations.push(mitigation.to_string());
        self.level = self.level.max(floor);
    }
}

impl Default for RiskAssessment {
    fn default() -> Self {
        Self::low()
    }
}

/// The single decision produced by one aggregation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleSignal {
    pub action: SignalAction,
    pub confidence: f64,
    pub strength: f64,
    pub consensus_level: f64,
    pub diversity_score: f64,
    pub uncertainty: f64,
    pub method: AggregationMethod,
    pub regime: Option<String>,
    pub contributing_models: Vec<String>,
    pub probability_distribution: ProbabilityDistribution,
    pub risk_assessment: RiskAssessment,
    pub explanations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distribution_normalizes_to_one() {
        let dist = ProbabilityDistribution::from_masses([3.0, 1.0, 0.5]);
        assert!((dist.sum() - 1.0).abs() < 1e-12);
        assert_eq!(dist.argmax(), SignalAction::Buy);
        assert!((dist.buy - 3.0 / 4.5).abs() < 1e-12);
    }

    #[test]
    fn test_distribution_zero_mass_is_uniform() {
        let dist = ProbabilityDistribution::from_masses([0.0, 0.0, 0.0]);
        assert_eq!(dist, ProbabilityDistribution::uniform());

        let dist = ProbabilityDistribution::from_masses([f64::NAN, -1.0, 0.0]);
        assert_eq!(dist, ProbabilityDistribution::uniform());
    }

    #[test]
    fn test_entropy_bounds() {
        let uniform = ProbabilityDistribution::uniform();
        assert!((uniform.entropy_bits() - 3f64.log2()).abs() < 1e-9);

        let certain = ProbabilityDistribution::from_masses([1.0, 0.0, 0.0]);
        assert_eq!(certain.entropy_bits(), 0.0);
    }

    #[test]
    fn test_risk_flag_never_downgrades() {
        let mut risk = RiskAssessment::low();
        risk.flag("low average confidence", "await stronger signal", RiskLevel::High);
        risk.flag("high uncertainty", "use conservative sizing", RiskLevel::Medium);
        assert_eq!(risk.level, RiskLevel::High);
        assert_eq!(risk.factors.len(), 2);
        assert_eq!(risk.mitigations.len(), 2);
    }
}
