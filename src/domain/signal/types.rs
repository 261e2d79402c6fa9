use crate::domain::errors::EnsembleError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction proposed by a strategy or by the ensemble
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

impl SignalAction {
    /// Enumeration order. Vote ties resolve to the earliest entry.
    pub const ALL: [SignalAction; 3] = [SignalAction::Buy, SignalAction::Sell, SignalAction::Hold];

    pub fn index(self) -> usize {
        match self {
            SignalAction::Buy => 0,
            SignalAction::Sell => 1,
            SignalAction::Hold => 2,
        }
    }

    /// +1 for BUY, -1 for SELL, 0 for HOLD
    pub fn signed(self) -> f64 {
        match self {
            SignalAction::Buy => 1.0,
            SignalAction::Sell => -1.0,
            SignalAction::Hold => 0.0,
        }
    }

    /// One-hot encoding in `ALL` order
    pub fn one_hot(self) -> [f64; 3] {
        let mut target = [0.0; 3];
        target[self.index()] = 1.0;
        target
    }

    /// Index of the largest entry, earliest action wins ties
    pub fn argmax(values: &[f64; 3]) -> SignalAction {
        let mut best = 0;
        for i in 1..3 {
            if values[i] > values[best] {
                best = i;
            }
        }
        SignalAction::ALL[best]
    }
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalAction::Buy => write!(f, "BUY"),
            SignalAction::Sell => write!(f, "SELL"),
            SignalAction::Hold => write!(f, "HOLD"),
        }
    }
}

impl std::str::FromStr for SignalAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "buy" => Ok(SignalAction::Buy),
            "sell" => Ok(SignalAction::Sell),
            "hold" => Ok(SignalAction::Hold),
            _ => anyhow::bail!("Invalid action: {}. Must be 'buy', 'sell', or 'hold'", s),
        }
    }
}

/// Rolling performance metrics of a contributing model, supplied by the caller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPerformance {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub sharpe_ratio: f64,
    pub profit_factor: f64,
}

impl Default for ModelPerformance {
    fn default() -> Self {
        Self {
            accuracy: 0.5,
            precision: 0.5,
            recall: 0.5,
            f1_score: 0.5,
            sharpe_ratio: 0.0,
            profit_factor: 1.0,
        }
    }
}

/// Prediction emitted by one upstream strategy for one inference tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSignal {
    pub model_id: String,
    pub model_name: String,
    pub action: SignalAction,
    pub confidence: f64,
    pub strength: f64,
    pub probability: f64,
    #[serde(default)]
    pub features: Vec<f64>,
    #[serde(default)]
    pub performance: ModelPerformance,
    #[serde(default = "default_regime")]
    pub regime: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

fn default_regime() -> String {
    "unknown".to_string()
}

impl ModelSignal {
    /// Creates a signal with `confidence` used for strength and probability too.
    /// Scores are clamped to [0, 1].
    pub fn new(model_id: impl Into<String>, action: SignalAction, confidence: f64) -> Self {
        let model_id = model_id.into();
        let confidence = clamp_unit(confidence);
        Self {
            model_name: model_id.clone(),
            model_id,
            action,
            confidence,
            strength: confidence,
            probability: confidence,
            features: Vec::new(),
            performance: ModelPerformance::default(),
            regime: default_regime(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = clamp_unit(strength);
        self
    }

    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = clamp_unit(probability);
        self
    }

    pub fn with_features(mut self, features: Vec<f64>) -> Self {
        self.features = features;
        self
    }

    pub fn with_performance(mut self, performance: ModelPerformance) -> Self {
        self.performance = performance;
        self
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.performance.accuracy = clamp_unit(accuracy);
        self
    }

    pub fn with_regime(mut self, regime: impl Into<String>) -> Self {
        self.regime = regime.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Rejects scores outside [0, 1]. Deserialized signals bypass the clamping builders.
    pub fn validate(&self) -> Result<(), EnsembleError> {
        for (field, value) in [
            ("confidence", self.confidence),
            ("strength", self.strength),
            ("probability", self.probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EnsembleError::invalid_input(format!(
                    "signal '{}' has {} {} outside [0, 1]",
                    self.model_id, field, value
                )));
            }
        }
        Ok(())
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
