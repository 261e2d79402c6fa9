//! Aggregation and risk-rule configuration.

use super::parse_env;
use crate::domain::ensemble::RiskThresholds;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Aggregation strategy parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Consensus below this widens uncertainty
    pub consensus_threshold: f64,

    // Dynamic contextual selection
    pub contextual_selection_ratio: f64,
    pub contextual_min_models: usize,

    // Stacking
    pub meta_input_width: usize,
    /// Gain of the vote-shaped prior used when no trained learner is supplied
    pub meta_prior_gain: f64,
    /// Install the vote-shaped learner at startup
    pub bootstrap_meta_learner: bool,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            consensus_threshold: 0.6,
            contextual_selection_ratio: 0.7,
            contextual_min_models: 2,
            meta_input_width: 32,
            meta_prior_gain: 2.0,
            bootstrap_meta_learner: false,
        }
    }
}

impl AggregationConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            consensus_threshold: parse_env(
                "ENSEMBLE_CONSENSUS_THRESHOLD",
                defaults.consensus_threshold,
            )?,
            contextual_selection_ratio: parse_env(
                "ENSEMBLE_CONTEXTUAL_SELECTION_RATIO",
                defaults.contextual_selection_ratio,
            )?,
            contextual_min_models: parse_env(
                "ENSEMBLE_CONTEXTUAL_MIN_MODELS",
                defaults.contextual_min_models,
            )?,
            meta_input_width: parse_env("ENSEMBLE_META_INPUT_WIDTH", defaults.meta_input_width)?,
            meta_prior_gain: parse_env("ENSEMBLE_META_PRIOR_GAIN", defaults.meta_prior_gain)?,
            bootstrap_meta_learner: parse_env(
                "ENSEMBLE_BOOTSTRAP_META_LEARNER",
                defaults.bootstrap_meta_learner,
            )?,
        })
    }
}

pub fn risk_thresholds_from_env() -> Result<RiskThresholds> {
    let defaults = RiskThresholds::default();
    Ok(RiskThresholds {
        min_consensus: parse_env("ENSEMBLE_RISK_MIN_CONSENSUS", defaults.min_consensus)?,
        max_pairwise_correlation: parse_env(
            "ENSEMBLE_RISK_MAX_CORRELATION",
            defaults.max_pairwise_correlation,
        )?,
        min_average_confidence: parse_env(
            "ENSEMBLE_RISK_MIN_CONFIDENCE",
            defaults.min_average_confidence,
        )?,
        max_entropy_bits: parse_env("ENSEMBLE_RISK_MAX_ENTROPY_BITS", defaults.max_entropy_bits)?,
    })
}
