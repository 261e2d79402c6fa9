//! Adaptive per-model weights.
//!
//! Thread-safety: all mutable state is behind one `parking_lot::RwLock`. Readers take a
//! cloned `WeightSnapshot`; every multiplicative update runs under a single write guard.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which weight family an entry belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WeightPartition {
    /// Performance-weighted vote multipliers
    Performance,
    /// Bayesian evidence multipliers
    Bayesian,
    /// Contextual selection weights scoped to one market regime
    Regime(String),
}

impl WeightPartition {
    pub fn regime(label: &str) -> Self {
        WeightPartition::Regime(normalize_regime(label))
    }
}

pub fn normalize_regime(label: &str) -> String {
    label.trim().to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightBounds {
    pub default: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for WeightBounds {
    fn default() -> Self {
        Self {
            default: 0.5,
            min: 0.1,
            max: 1.0,
        }
    }
}

impl WeightBounds {
    pub fn clamp(&self, weight: f64) -> f64 {
        weight.clamp(self.min, self.max)
    }
}

/// Result of one weight update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightChange {
    pub model_id: String,
    pub previous: f64,
    pub current: f64,
}

/// Immutable copy of the table taken under one read guard
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeightSnapshot {
    pub version: u64,
    pub bounds: WeightBounds,
    pub performance: HashMap<String, f64>,
    pub bayesian: HashMap<String, f64>,
    pub contextual: HashMap<String, HashMap<String, f64>>,
}

impl WeightSnapshot {
    /// Weight for a model, or the default when it has never been updated
    pub fn get(&self, partition: &WeightPartition, model_id: &str) -> f64 {
        let entry = match partition {
            WeightPartition::Performance => self.performance.get(model_id),
            WeightPartition::Bayesian => self.bayesian.get(model_id),
            WeightPartition::Regime(regime) => self
                .contextual
                .get(regime)
                .and_then(|weights| weights.get(model_id)),
        };
        entry.copied().unwrap_or(self.bounds.default)
    }
}

#[derive(Debug, Default)]
struct WeightState {
    version: u64,
    performance: HashMap<String, f64>,
    bayesian: HashMap<String, f64>,
    contextual: HashMap<String, HashMap<String, f64>>,
}

impl WeightState {
    fn partition_mut(&mut self, partition: &WeightPartition) -> &mut HashMap<String, f64> {
        match partition {
            WeightPartition::Performance => &mut self.performance,
            WeightPartition::Bayesian => &mut self.bayesian,
            WeightPartition::Regime(regime) => self.contextual.entry(regime.clone()).or_default(),
        }
    }
}

/// Process-wide weight table, mutated only by the weight adapter
#[derive(Debug)]
pub struct WeightTable {
    bounds: WeightBounds,
    state: RwLock<WeightState>,
}

impl WeightTable {
    pub fn new(bounds: WeightBounds) -> Self {
        Self {
            bounds,
            state: RwLock::new(WeightState::default()),
        }
    }

    pub fn bounds(&self) -> WeightBounds {
        self.bounds
    }

    pub fn get(&self, partition: &WeightPartition, model_id: &str) -> f64 {
        let state = self.state.read();
        let entry = match partition {
            WeightPartition::Performance => state.performance.get(model_id),
            WeightPartition::Bayesian => state.bayesian.get(model_id),
            WeightPartition::Regime(regime) => state
                .contextual
                .get(regime)
                .and_then(|weights| weights.get(model_id)),
        };
        entry.copied().unwrap_or(self.bounds.default)
    }

    pub fn snapshot(&self) -> WeightSnapshot {
        let state = self.state.read();
        WeightSnapshot {
            version: state.version,
            bounds: self.bounds,
            performance: state.performance.clone(),
            bayesian: state.bayesian.clone(),
            contextual: state.contextual.clone(),
        }
    }

    pub fn version(&self) -> u64 {
        self.state.read().version
    }

    /// Multiplies each listed model's weight by its factor, clamped to the bounds.
    /// The whole batch is applied under one write guard.
    pub fn scale_all(
        &self,
        partition: &WeightPartition,
        factors: &[(String, f64)],
    ) -> Vec<WeightChange> {
        if factors.is_empty() {
            return Vec::new();
        }

        let bounds = self.bounds;
        let mut state = self.state.write();
        state.version += 1;
        let weights = state.partition_mut(partition);

        factors
            .iter()
            .map(|(model_id, factor)| {
                let entry = weights.entry(model_id.clone()).or_insert(bounds.default);
                let previous = *entry;
                *entry = bounds.clamp(previous * factor);
                WeightChange {
                    model_id: model_id.clone(),
                    previous,
                    current: *entry,
                }
            })
            .collect()
    }

    pub fn reset(&self) {
        let mut state = self.state.write();
        let version = state.version + 1;
        *state = WeightState {
            version,
            ..WeightState::default()
        };
    }
}

impl Default for WeightTable {
    fn default() -> Self {
        Self::new(WeightBounds::default())
    }
}
