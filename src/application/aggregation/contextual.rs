use super::finalize::finalize;
use super::performance_weighted::weighted_tally;
use super::{AggregationContext, AggregationStrategy, ensure_non_empty};
use crate::domain::ensemble::weights::normalize_regime;
use crate::domain::ensemble::{AggregationMethod, WeightPartition};
use crate::domain::errors::EnsembleError;
use crate::domain::signal::{EnsembleSignal, ModelSignal};

/// Regime-aware model selection.
///
/// Detects the batch's dominant regime, keeps the models that have done best in that
/// regime, then runs a performance-weighted vote over them.
pub struct DynamicContextualStrategy;

impl DynamicContextualStrategy {
    /// Most frequent regime label; ties go to the label seen first
    pub fn dominant_regime(signals: &[ModelSignal]) -> String {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for signal in signals {
            let label = normalize_regime(&signal.regime);
            match counts.iter_mut().find(|(l, _)| *l == label) {
                Some((_, count)) => *count += 1,
                None => counts.push((label, 1)),
            }
        }

        let mut best: Option<(String, usize)> = None;
        for (label, count) in counts {
            if best.as_ref().is_none_or(|(_, c)| count > *c) {
                best = Some((label, count));
            }
        }
        best.map(|(label, _)| label).unwrap_or_default()
    }

    /// Number of models kept out of `n`
    fn selection_size(n: usize, ctx: &AggregationContext<'_>) -> usize {
        let by_ratio = (ctx.config.contextual_selection_ratio * n as f64).ceil() as usize;
        by_ratio.max(ctx.config.contextual_min_models).min(n)
    }

    fn select<'s>(
        signals: &'s [ModelSignal],
        regime: &str,
        ctx: &AggregationContext<'_>,
    ) -> Vec<&'s ModelSignal> {
        let partition = WeightPartition::Regime(regime.to_string());
        let mut ranked: Vec<(usize, f64)> = signals
            .iter()
            .enumerate()
            .map(|(i, s)| (i, ctx.weights.get(&partition, &s.model_id)))
            .collect();
        // stable: equal weights keep input order
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(Self::selection_size(signals.len(), ctx));

        let mut kept: Vec<usize> = ranked.into_iter().map(|(i, _)| i).collect();
        kept.sort_unstable();
        kept.into_iter().map(|i| &signals[i]).collect()
    }
}

impl AggregationStrategy for DynamicContextualStrategy {
    fn method(&self) -> AggregationMethod {
        AggregationMethod::DynamicContextual
    }

    fn aggregate(
        &self,
        signals: &[ModelSignal],
        ctx: &AggregationContext<'_>,
    ) -> Result<EnsembleSignal, EnsembleError> {
        ensure_non_empty(signals)?;

        let regime = Self::dominant_regime(signals);
        let selected: Vec<ModelSignal> = Self::select(signals, &regime, ctx)
            .into_iter()
            .cloned()
            .collect();

        let mut tally = weighted_tally(&selected, ctx);
        tally.explanations.insert(
            0,
            format!(
                "Regime '{}': selected {} of {} models",
                regime,
                selected.len(),
                signals.len()
            ),
        );
        tally.regime = Some(regime);

        Ok(finalize(self.method(), &selected, tally, ctx))
    }

    fn deciding_signals<'s>(
        &self,
        signals: &'s [ModelSignal],
        ctx: &AggregationContext<'_>,
    ) -> Vec<&'s ModelSignal> {
        Self::select(signals, &Self::dominant_regime(signals), ctx)
    }
}
