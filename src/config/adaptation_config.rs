//! Weight adaptation configuration.
//!
//! The correctness band and the multiplicative factors are tunable; the defaults
//! reproduce the historical behaviour (+/-2% band, 1.1/0.9 and 1.05/0.95 steps).

use super::parse_env;
use crate::domain::ensemble::WeightBounds;
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptationConfig {
    /// Absolute realized return separating BUY/SELL outcomes from HOLD
    pub correctness_threshold: f64,
    pub weights: WeightBounds,

    // Performance-weighted and Bayesian
    pub reward_factor: f64,
    pub penalty_factor: f64,

    // Dynamic contextual (regime-scoped)
    pub contextual_reward_factor: f64,
    pub contextual_penalty_factor: f64,

    // Stacking
    pub learning_rate: f64,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            correctness_threshold: 0.02,
            weights: WeightBounds::default(),
            reward_factor: 1.1,
            penalty_factor: 0.9,
            contextual_reward_factor: 1.05,
            contextual_penalty_factor: 0.95,
            learning_rate: 0.05,
        }
    }
}

impl AdaptationConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            correctness_threshold: parse_env(
                "ENSEMBLE_CORRECTNESS_THRESHOLD",
                defaults.correctness_threshold,
            )?,
            weights: WeightBounds {
                default: parse_env("ENSEMBLE_DEFAULT_WEIGHT", defaults.weights.default)?,
                min: parse_env("ENSEMBLE_MIN_WEIGHT", defaults.weights.min)?,
                max: parse_env("ENSEMBLE_MAX_WEIGHT", defaults.weights.max)?,
            },
            reward_factor: parse_env("ENSEMBLE_REWARD_FACTOR", defaults.reward_factor)?,
            penalty_factor: parse_env("ENSEMBLE_PENALTY_FACTOR", defaults.penalty_factor)?,
            contextual_reward_factor: parse_env(
                "ENSEMBLE_CONTEXTUAL_REWARD_FACTOR",
                defaults.contextual_reward_factor,
            )?,
            contextual_penalty_factor: parse_env(
                "ENSEMBLE_CONTEXTUAL_PENALTY_FACTOR",
                defaults.contextual_penalty_factor,
            )?,
            learning_rate: parse_env("ENSEMBLE_LEARNING_RATE", defaults.learning_rate)?,
        })
    }
}
