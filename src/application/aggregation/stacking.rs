use super::finalize::{Tally, finalize, normalized_entropy};
use super::{AggregationContext, AggregationStrategy, ensure_non_empty};
use crate::domain::ensemble::AggregationMethod;
use crate::domain::errors::EnsembleError;
use crate::domain::ml::build_meta_features;
use crate::domain::ml::meta_features::SLOT_WIDTH;
use crate::domain::signal::{EnsembleSignal, ModelSignal, ProbabilityDistribution, SignalAction};

/// Meta-learner over the concatenated per-signal features
pub struct StackingStrategy;

impl AggregationStrategy for StackingStrategy {
    fn method(&self) -> AggregationMethod {
        AggregationMethod::Stacking
    }

    fn aggregate(
        &self,
        signals: &[ModelSignal],
        ctx: &AggregationContext<'_>,
    ) -> Result<EnsembleSignal, EnsembleError> {
        ensure_non_empty(signals)?;

        let learner = ctx
            .meta_learner
            .ok_or_else(|| EnsembleError::UninitializedModel {
                method: self.method().as_str().to_string(),
            })?;

        let width = learner.input_width();
        let features = build_meta_features(signals, width);
        let probabilities = learner
            .predict_proba(&features)
            .map_err(|source| EnsembleError::MetaLearnerFailed { source })?;

        let distribution = ProbabilityDistribution::from_masses(probabilities);
        let winner = SignalAction::argmax(&probabilities);
        let belief = distribution.get(winner);

        let considered = &signals[..considered_len(signals.len(), width)];
        let used = considered.len();

        let mut explanations = vec![format!(
            "{}: {} with p={:.3}",
            learner.name(),
            winner,
            belief
        )];
        if used < signals.len() {
            explanations.push(format!(
                "{} of {} signals beyond meta-learner input width were ignored",
                signals.len() - used,
                signals.len()
            ));
        }

        let tally = Tally {
            masses: probabilities,
            consensus: belief,
            confidence: belief,
            strength: considered.iter().map(|s| s.strength).sum::<f64>() / used.max(1) as f64,
            uncertainty: normalized_entropy(&distribution),
            contributing_models: considered.iter().map(|s| s.model_id.clone()).collect(),
            regime: None,
            explanations,
        };

        Ok(finalize(self.method(), considered, tally, ctx))
    }

    fn deciding_signals<'s>(
        &self,
        signals: &'s [ModelSignal],
        ctx: &AggregationContext<'_>,
    ) -> Vec<&'s ModelSignal> {
        let len = ctx
            .meta_learner
            .map_or(signals.len(), |l| considered_len(signals.len(), l.input_width()));
        signals[..len].iter().collect()
    }
}

/// Signals past the input width never reach the learner
fn considered_len(n: usize, width: usize) -> usize {
    n.min(width.div_ceil(SLOT_WIDTH))
}
