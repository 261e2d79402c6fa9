//! Explanation engine configuration.

use super::parse_env;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplanationConfig {
    // Shapley sampling
    pub shapley_samples: usize,
    pub max_coalition_size: usize,
    /// Value substituted for features absent from a coalition
    pub baseline_value: f64,

    // Local surrogate
    pub perturbation_count: usize,
    /// Noise std as a fraction of |value|
    pub noise_scale: f64,
    pub noise_floor: f64,
    pub kernel_width: f64,
    pub ridge: f64,

    // Decision path
    pub max_path_depth: usize,
    /// Features smaller than this in magnitude cannot decide a step (0 disables the band)
    pub min_split_magnitude: f64,

    /// Score magnitude needed for a BUY/SELL verdict
    pub action_threshold: f64,
    pub seed: u64,
    pub timeout_ms: u64,
    pub feature_names: Vec<String>,
}

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self {
            shapley_samples: 100,
            max_coalition_size: 5,
            baseline_value: 0.0,
            perturbation_count: 2000,
            noise_scale: 0.1,
            noise_floor: 1e-3,
            kernel_width: 0.25,
            ridge: 1e-8,
            max_path_depth: 5,
            min_split_magnitude: 0.0,
            action_threshold: 0.1,
            seed: 42,
            timeout_ms: 5_000,
            feature_names: Vec::new(),
        }
    }
}

impl ExplanationConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let feature_names = env::var("ENSEMBLE_FEATURE_NAMES")
            .map(|names| {
                names
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            shapley_samples: parse_env("ENSEMBLE_SHAPLEY_SAMPLES", defaults.shapley_samples)?,
            max_coalition_size: parse_env(
                "ENSEMBLE_MAX_COALITION_SIZE",
                defaults.max_coalition_size,
            )?,
            baseline_value: parse_env("ENSEMBLE_BASELINE_VALUE", defaults.baseline_value)?,
            perturbation_count: parse_env(
                "ENSEMBLE_PERTURBATION_COUNT",
                defaults.perturbation_count,
            )?,
            noise_scale: parse_env("ENSEMBLE_NOISE_SCALE", defaults.noise_scale)?,
            noise_floor: parse_env("ENSEMBLE_NOISE_FLOOR", defaults.noise_floor)?,
            kernel_width: parse_env("ENSEMBLE_KERNEL_WIDTH", defaults.kernel_width)?,
            ridge: parse_env("ENSEMBLE_RIDGE", defaults.ridge)?,
            max_path_depth: parse_env("ENSEMBLE_MAX_PATH_DEPTH", defaults.max_path_depth)?,
            min_split_magnitude: parse_env(
                "ENSEMBLE_MIN_SPLIT_MAGNITUDE",
                defaults.min_split_magnitude,
            )?,
            action_threshold: parse_env("ENSEMBLE_ACTION_THRESHOLD", defaults.action_threshold)?,
            seed: parse_env("ENSEMBLE_EXPLANATION_SEED", defaults.seed)?,
            timeout_ms: parse_env("ENSEMBLE_EXPLANATION_TIMEOUT_MS", defaults.timeout_ms)?,
            feature_names,
        })
    }

    /// Configured name for a feature, or `feature_{index}`
    pub fn feature_name(&self, index: usize) -> String {
        self.feature_names
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("feature_{index}"))
    }
}
