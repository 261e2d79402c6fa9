//! Explanation engine.
//!
//! Explains one prediction of a `Scorer` with sampled Shapley attributions, a local
//! linear surrogate, a greedy decision path, keyword risk rules and a short narrative.
//! The engine only reads its inputs; a failing scorer aborts the whole explanation.

pub mod decision_path;
pub mod lime;
pub mod narrative;
pub mod risk_factors;
pub mod shapley;

use crate::config::ExplanationConfig;
use crate::domain::errors::EnsembleError;
use crate::domain::explanation::{ExplanationResult, FeatureAttribution};
use crate::domain::ml::Scorer;
use crate::domain::signal::SignalAction;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct ExplanationEngine {
    config: ExplanationConfig,
}

impl ExplanationEngine {
    pub fn new(config: ExplanationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExplanationConfig {
        &self.config
    }

    /// Maps a raw score onto an action and a confidence in [0, 1]
    pub fn classify_score(&self, score: f64) -> (SignalAction, f64) {
        let action = if score > self.config.action_threshold {
            SignalAction::Buy
        } else if score < -self.config.action_threshold {
            SignalAction::Sell
        } else {
            SignalAction::Hold
        };
        (action, score.abs().min(1.0))
    }

    pub fn explain(
        &self,
        features: &[f64],
        scorer: &dyn Scorer,
        cancel: &CancellationToken,
    ) -> Result<ExplanationResult, EnsembleError> {
        if features.is_empty() {
            return Err(EnsembleError::invalid_input("feature vector is empty"));
        }
        if let Some(bad) = features.iter().position(|v| !v.is_finite()) {
            return Err(EnsembleError::invalid_input(format!(
                "feature {bad} is not finite"
            )));
        }

        let started = Instant::now();
        info!(
            "ExplanationEngine: explaining {} features with {}",
            features.len(),
            scorer.name()
        );

        let score = scorer
            .predict(features)
            .map_err(|source| EnsembleError::ExplanationFailed {
                stage: "score",
                source,
            })?;
        let (action, confidence) = self.classify_score(score);

        let shapley = shapley::shapley_values(scorer, features, &self.config, cancel)?;
        debug!("ExplanationEngine: shapley done in {:?}", started.elapsed());

        let local = lime::fit_local_surrogate(scorer, features, &self.config, cancel)?;
        debug!(
            "ExplanationEngine: surrogate fidelity {:.4} (R² {:.4})",
            local.local_fidelity, local.r_squared
        );

        if cancel.is_cancelled() {
            return Err(EnsembleError::ExplanationCancelled);
        }

        let attributions: Vec<FeatureAttribution> = features
            .iter()
            .zip(shapley)
            .enumerate()
            .map(|(index, (&value, attribution))| FeatureAttribution {
                index,
                name: self.config.feature_name(index),
                value,
                attribution,
            })
            .collect();

        let decision_path = decision_path::build_decision_path(features, &self.config);
        let risk_factors = risk_factors::identify_risk_factors(&attributions);
        let narrative =
            narrative::compose_narrative(action, confidence, &attributions, &risk_factors);

        info!(
            "ExplanationEngine: {} (score {:.3}) explained in {:?}",
            action,
            score,
            started.elapsed()
        );

        Ok(ExplanationResult {
            action,
            confidence,
            score,
            attributions,
            local,
            decision_path,
            risk_factors,
            narrative,
        })
    }
}
