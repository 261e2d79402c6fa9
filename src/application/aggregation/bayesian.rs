use super::finalize::{Tally, finalize, normalized_entropy, supporter_strength};
use super::{AggregationContext, AggregationStrategy, ensure_non_empty};
use crate::domain::ensemble::{AggregationMethod, WeightPartition};
use crate::domain::errors::EnsembleError;
use crate::domain::signal::{EnsembleSignal, ModelSignal, ProbabilityDistribution, SignalAction};

const PRIOR: [f64; 3] = [1.0 / 3.0; 3];

/// Bayesian model averaging over the three actions.
///
/// Each model contributes evidence `accuracy * confidence * multiplier` to the action it
/// voted for, scaled once more by its confidence. The posterior is the normalized product
/// of the uniform prior and the per-action likelihood.
pub struct BayesianStrategy;

impl AggregationStrategy for BayesianStrategy {
    fn method(&self) -> AggregationMethod {
        AggregationMethod::Bayesian
    }

    fn aggregate(
        &self,
        signals: &[ModelSignal],
        ctx: &AggregationContext<'_>,
    ) -> Result<EnsembleSignal, EnsembleError> {
        ensure_non_empty(signals)?;

        let mut likelihood = [0.0_f64; 3];
        for signal in signals {
            let evidence = signal.performance.accuracy
                * signal.confidence
                * ctx.weights.get(&WeightPartition::Bayesian, &signal.model_id);
            likelihood[signal.action.index()] += evidence * signal.confidence;
        }

        let unnormalized: [f64; 3] = std::array::from_fn(|i| PRIOR[i] * likelihood[i]);
        let posterior = ProbabilityDistribution::from_masses(unnormalized);
        let winner = SignalAction::argmax(&unnormalized);
        let belief = posterior.get(winner);

        let explanations = vec![format!(
            "Bayesian posterior: BUY {:.3}, SELL {:.3}, HOLD {:.3}",
            posterior.buy, posterior.sell, posterior.hold
        )];

        let tally = Tally {
            masses: unnormalized,
            consensus: belief,
            confidence: belief,
            strength: supporter_strength(signals, winner),
            uncertainty: normalized_entropy(&posterior),
            contributing_models: signals.iter().map(|s| s.model_id.clone()).collect(),
            regime: None,
            explanations,
        };

        Ok(finalize(self.method(), signals, tally, ctx))
    }
}
