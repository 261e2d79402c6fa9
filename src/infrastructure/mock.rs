//! Deterministic scorers and signal builders for tests and demos.

use crate::domain::errors::ScorerError;
use crate::domain::ml::Scorer;
use crate::domain::signal::{ModelSignal, SignalAction};
use chrono::{TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};

/// `bias + Σ wᵢ·xᵢ`; missing weights count as zero
pub struct LinearScorer {
    weights: Vec<f64>,
    bias: f64,
}

impl LinearScorer {
    pub fn new(weights: Vec<f64>, bias: f64) -> Self {
        Self { weights, bias }
    }
}

impl Scorer for LinearScorer {
    fn predict(&self, features: &[f64]) -> Result<f64, ScorerError> {
        Ok(self.bias
            + features
                .iter()
                .zip(&self.weights)
                .map(|(x, w)| x * w)
                .sum::<f64>())
    }

    fn name(&self) -> &str {
        "Linear"
    }
}

/// `Σ wᵢ·xᵢ·|xᵢ|`, non-linear but sign-preserving
pub struct QuadraticScorer {
    weights: Vec<f64>,
}

impl QuadraticScorer {
    pub fn new(weights: Vec<f64>) -> Self {
        Self { weights }
    }
}

impl Scorer for QuadraticScorer {
    fn predict(&self, features: &[f64]) -> Result<f64, ScorerError> {
        Ok(features
            .iter()
            .zip(&self.weights)
            .map(|(x, w)| w * x * x.abs())
            .sum())
    }

    fn name(&self) -> &str {
        "Quadratic"
    }
}

/// Always fails with the given message
pub struct FailingScorer {
    message: String,
}

impl FailingScorer {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Scorer for FailingScorer {
    fn predict(&self, _features: &[f64]) -> Result<f64, ScorerError> {
        Err(ScorerError::new(self.message.clone()))
    }

    fn name(&self) -> &str {
        "Failing"
    }
}

/// Linear scorer that counts its calls, used to observe cancellation
pub struct CountingScorer {
    inner: LinearScorer,
    calls: AtomicUsize,
}

impl CountingScorer {
    pub fn new(weights: Vec<f64>) -> Self {
        Self {
            inner: LinearScorer::new(weights, 0.0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Scorer for CountingScorer {
    fn predict(&self, features: &[f64]) -> Result<f64, ScorerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.predict(features)
    }

    fn name(&self) -> &str {
        "Counting"
    }
}

/// Signal with a fixed timestamp so batches compare equal across calls
pub fn signal(model_id: &str, action: SignalAction, confidence: f64) -> ModelSignal {
    let fixed = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);
    ModelSignal::new(model_id, action, confidence).with_timestamp(fixed)
}

/// Three models, two BUY and one SELL
pub fn split_batch() -> Vec<ModelSignal> {
    vec![
        signal("lstm", SignalAction::Buy, 0.9),
        signal("xgboost", SignalAction::Buy, 0.6),
        signal("transformer", SignalAction::Sell, 0.6),
    ]
}
