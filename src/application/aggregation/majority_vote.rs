use super::finalize::{Tally, finalize, normalized_entropy, supporter_strength};
use super::{AggregationContext, AggregationStrategy, ensure_non_empty};
use crate::domain::ensemble::AggregationMethod;
use crate::domain::errors::EnsembleError;
use crate::domain::signal::{EnsembleSignal, ModelSignal, ProbabilityDistribution, SignalAction};

/// One model, one vote
///
/// - Winner is the action with the most votes, ties resolve BUY, SELL, HOLD
/// - Consensus is the winner's vote share
/// - Confidence is the mean confidence scaled by consensus
pub struct MajorityVoteStrategy;

impl AggregationStrategy for MajorityVoteStrategy {
    fn method(&self) -> AggregationMethod {
        AggregationMethod::MajorityVote
    }

    fn aggregate(
        &self,
        signals: &[ModelSignal],
        ctx: &AggregationContext<'_>,
    ) -> Result<EnsembleSignal, EnsembleError> {
        ensure_non_empty(signals)?;

        let mut votes = [0.0_f64; 3];
        for signal in signals {
            votes[signal.action.index()] += 1.0;
        }

        let total = signals.len() as f64;
        let winner = SignalAction::argmax(&votes);
        let consensus = votes[winner.index()] / total;
        let mean_confidence = signals.iter().map(|s| s.confidence).sum::<f64>() / total;

        let explanations = vec![format!(
            "Majority vote ({}/{} agree): {}",
            votes[winner.index()] as usize,
            signals.len(),
            winner
        )];

        let tally = Tally {
            masses: votes,
            consensus,
            confidence: mean_confidence * consensus,
            strength: supporter_strength(signals, winner),
            uncertainty: normalized_entropy(&ProbabilityDistribution::from_masses(votes)),
            contributing_models: signals.iter().map(|s| s.model_id.clone()).collect(),
            regime: None,
            explanations,
        };

        Ok(finalize(self.method(), signals, tally, ctx))
    }
}
