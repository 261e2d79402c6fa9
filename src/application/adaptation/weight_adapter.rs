//! Outcome-driven weight adaptation.
//!
//! Each strategy family learns differently:
//! - PerformanceWeighted / Bayesian: multiplicative reward or penalty per contributing model
//! - DynamicContextual: the same rule with gentler factors, scoped to the decision's regime
//! - Stacking: one gradient step of the meta-learner toward the realized category
//! - MajorityVote: nothing to learn

use crate::config::AdaptationConfig;
use crate::domain::ensemble::outcome::outcome_category;
use crate::domain::ensemble::{
    AggregationMethod, DecisionRecord, WeightChange, WeightPartition, WeightTable,
};
use crate::domain::errors::ScorerError;
use crate::domain::ml::MetaLearner;
use crate::domain::signal::SignalAction;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What one realized outcome changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptationReport {
    pub sequence: u64,
    pub method: AggregationMethod,
    pub outcome: f64,
    /// Action the outcome called for
    pub category: SignalAction,
    pub ensemble_correct: bool,
    pub weight_changes: Vec<WeightChange>,
    /// Cross-entropy before the meta-learner step, stacking only
    pub meta_loss: Option<f64>,
}

pub struct WeightAdapter {
    config: AdaptationConfig,
}

impl WeightAdapter {
    pub fn new(config: AdaptationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AdaptationConfig {
        &self.config
    }

    pub fn category(&self, outcome: f64) -> SignalAction {
        outcome_category(outcome, self.config.correctness_threshold)
    }

    /// Applies the multiplicative rule for the record's method.
    /// Stacking and majority vote leave the table untouched.
    pub fn adapt_weights(
        &self,
        table: &WeightTable,
        record: &DecisionRecord,
        outcome: f64,
    ) -> AdaptationReport {
        let category = self.category(outcome);

        let (partition, reward, penalty) = match record.method {
            AggregationMethod::PerformanceWeighted => (
                Some(WeightPartition::Performance),
                self.config.reward_factor,
                self.config.penalty_factor,
            ),
            AggregationMethod::Bayesian => (
                Some(WeightPartition::Bayesian),
                self.config.reward_factor,
                self.config.penalty_factor,
            ),
            AggregationMethod::DynamicContextual => (
                record.regime.as_deref().map(WeightPartition::regime),
                self.config.contextual_reward_factor,
                self.config.contextual_penalty_factor,
            ),
            AggregationMethod::Stacking | AggregationMethod::MajorityVote => (None, 1.0, 1.0),
        };

        let weight_changes = match partition {
            Some(partition) => {
                let factors = Self::factors(record, category, reward, penalty);
                let changes = table.scale_all(&partition, &factors);
                for change in &changes {
                    debug!(
                        "WeightAdapter: {:?} {} {:.4} -> {:.4}",
                        partition, change.model_id, change.previous, change.current
                    );
                }
                changes
            }
            None => Vec::new(),
        };

        AdaptationReport {
            sequence: record.sequence,
            method: record.method,
            outcome,
            category,
            ensemble_correct: record.ensemble.action == category,
            weight_changes,
            meta_loss: None,
        }
    }

    /// Reward or penalty per contributing model, judged on the model's own vote
    fn factors(
        record: &DecisionRecord,
        category: SignalAction,
        reward: f64,
        penalty: f64,
    ) -> Vec<(String, f64)> {
        record
            .ensemble
            .contributing_models
            .iter()
            .filter_map(|model_id| {
                record
                    .signals
                    .iter()
                    .find(|s| &s.model_id == model_id)
                    .map(|signal| {
                        let factor = if signal.action == category {
                            reward
                        } else {
                            penalty
                        };
                        (model_id.clone(), factor)
                    })
            })
            .collect()
    }

    /// One gradient step of `learner` toward the one-hot outcome category
    pub fn train_meta_learner(
        &self,
        learner: &mut dyn MetaLearner,
        features: &[f64],
        outcome: f64,
    ) -> Result<f64, ScorerError> {
        let target = self.category(outcome).one_hot();
        learner.train_step(features, &target, self.config.learning_rate)
    }
}
