//! Configuration module for the ensemble engine.
//!
//! One typed `EngineConfig` is built at startup (defaults, environment variables, or a
//! TOML file) and handed to the engine by value. Nothing mutates it afterwards.

mod adaptation_config;
mod aggregation_config;
mod explanation_config;

pub use adaptation_config::AdaptationConfig;
pub use aggregation_config::{AggregationConfig, risk_thresholds_from_env};
pub use explanation_config::ExplanationConfig;

use crate::domain::ensemble::RiskThresholds;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;

/// Bounded decision history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: 1_000 }
    }
}

/// Main engine configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub aggregation: AggregationConfig,
    pub risk: RiskThresholds,
    pub adaptation: AdaptationConfig,
    pub explanation: ExplanationConfig,
    pub history: HistoryConfig,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            aggregation: AggregationConfig::from_env()
                .context("Failed to load aggregation config")?,
            risk: risk_thresholds_from_env().context("Failed to load risk thresholds")?,
            adaptation: AdaptationConfig::from_env()
                .context("Failed to load adaptation config")?,
            explanation: ExplanationConfig::from_env()
                .context("Failed to load explanation config")?,
            history: HistoryConfig {
                capacity: parse_env("ENSEMBLE_HISTORY_CAPACITY", HistoryConfig::default().capacity)?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse engine config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Rejects combinations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        let weights = &self.adaptation.weights;
        if !(weights.min > 0.0 && weights.min <= weights.max) {
            anyhow::bail!(
                "Invalid weight bounds: min {} must be > 0 and <= max {}",
                weights.min,
                weights.max
            );
        }
        if !(weights.min..=weights.max).contains(&weights.default) {
            anyhow::bail!(
                "Default weight {} outside [{}, {}]",
                weights.default,
                weights.min,
                weights.max
            );
        }
        if self.adaptation.reward_factor < 1.0 || self.adaptation.penalty_factor > 1.0 {
            anyhow::bail!("Reward factor must be >= 1 and penalty factor <= 1");
        }
        if self.adaptation.contextual_reward_factor < 1.0
            || self.adaptation.contextual_penalty_factor > 1.0
        {
            anyhow::bail!("Contextual reward factor must be >= 1 and penalty factor <= 1");
        }
        if self.adaptation.penalty_factor <= 0.0 || self.adaptation.contextual_penalty_factor <= 0.0
        {
            anyhow::bail!("Penalty factors must be positive");
        }
        if self.adaptation.correctness_threshold < 0.0 {
            anyhow::bail!("Correctness threshold must be non-negative");
        }
        if self.history.capacity == 0 {
            anyhow::bail!("History capacity must be at least 1");
        }
        if self.aggregation.meta_input_width == 0 {
            anyhow::bail!("Meta-learner input width must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.aggregation.contextual_selection_ratio) {
            anyhow::bail!(
                "Contextual selection ratio {} outside [0, 1]",
                self.aggregation.contextual_selection_ratio
            );
        }
        if self.explanation.kernel_width <= 0.0 {
            anyhow::bail!("Kernel width must be positive");
        }
        if !(self.explanation.noise_scale >= 0.0 && self.explanation.noise_floor > 0.0) {
            anyhow::bail!(
                "Noise scale {} must be >= 0 and noise floor {} > 0",
                self.explanation.noise_scale,
                self.explanation.noise_floor
            );
        }
        if self.explanation.perturbation_count < 2 {
            anyhow::bail!("At least two perturbations are required for a local surrogate");
        }
        Ok(())
    }
}

/// Reads `key` from the environment, falling back to `default` when unset
pub(crate) fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + ToString,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<T>()
        .context(format!("Failed to parse {}", key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.adaptation.correctness_threshold, 0.02);
        assert_eq!(config.adaptation.weights.default, 0.5);
        assert_eq!(config.history.capacity, 1_000);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [adaptation]
            reward_factor = 1.2

            [adaptation.weights]
            min = 0.2

            [explanation]
            perturbation_count = 500
            feature_names = ["rsi", "volatility"]
            "#,
        )
        .unwrap();

        assert_eq!(config.adaptation.reward_factor, 1.2);
        assert_eq!(config.adaptation.penalty_factor, 0.9);
        assert_eq!(config.adaptation.weights.min, 0.2);
        assert_eq!(config.adaptation.weights.max, 1.0);
        assert_eq!(config.explanation.perturbation_count, 500);
        assert_eq!(config.explanation.feature_name(1), "volatility");
        assert_eq!(config.explanation.feature_name(5), "feature_5");
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let result = EngineConfig::from_toml_str(
            r#"
            [adaptation.weights]
            min = 0.9
            max = 0.5
            "#,
        );
        assert!(result.is_err());

        let mut config = EngineConfig::default();
        config.history.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_contextual_factors_and_noise_validated() {
        let result = EngineConfig::from_toml_str(
            r#"
            [adaptation]
            contextual_reward_factor = 0.8
            "#,
        );
        assert!(result.is_err());

        let mut config = EngineConfig::default();
        config.adaptation.contextual_penalty_factor = 1.2;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.explanation.noise_scale = -0.1;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.explanation.noise_floor = 0.0;
        assert!(config.validate().is_err());
    }
}
