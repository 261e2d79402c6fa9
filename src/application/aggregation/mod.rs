//! Aggregation strategies.
//!
//! Every strategy turns one batch of `ModelSignal`s into a single `EnsembleSignal`.
//! Strategies are stateless: adaptive weights and the meta-learner arrive through
//! `AggregationContext` as immutable snapshots, so the same batch and the same snapshot
//! always produce the same result.

pub mod bayesian;
pub mod contextual;
pub mod finalize;
pub mod majority_vote;
pub mod performance_weighted;
pub mod registry;
pub mod stacking;

pub use bayesian::BayesianStrategy;
pub use contextual::DynamicContextualStrategy;
pub use majority_vote::MajorityVoteStrategy;
pub use performance_weighted::PerformanceWeightedStrategy;
pub use registry::StrategyRegistry;
pub use stacking::StackingStrategy;

use crate::config::AggregationConfig;
use crate::domain::ensemble::{AggregationMethod, RiskThresholds, WeightSnapshot};
use crate::domain::errors::EnsembleError;
use crate::domain::ml::MetaLearner;
use crate::domain::signal::{EnsembleSignal, ModelSignal};

/// Read-only state a strategy may consult
pub struct AggregationContext<'a> {
    pub config: &'a AggregationConfig,
    pub risk: &'a RiskThresholds,
    pub weights: &'a WeightSnapshot,
    pub meta_learner: Option<&'a dyn MetaLearner>,
}

pub trait AggregationStrategy: Send + Sync {
    fn method(&self) -> AggregationMethod;

    fn aggregate(
        &self,
        signals: &[ModelSignal],
        ctx: &AggregationContext<'_>,
    ) -> Result<EnsembleSignal, EnsembleError>;

    /// Signals that actually decide the result. Diversity and risk describe this set.
    fn deciding_signals<'s>(
        &self,
        signals: &'s [ModelSignal],
        _ctx: &AggregationContext<'_>,
    ) -> Vec<&'s ModelSignal> {
        signals.iter().collect()
    }
}

pub(crate) fn ensure_non_empty(signals: &[ModelSignal]) -> Result<(), EnsembleError> {
    if signals.is_empty() {
        return Err(EnsembleError::invalid_input("signal batch is empty"));
    }
    Ok(())
}
