//! Sampled Shapley attributions.
//!
//! For each feature, random coalitions of the other features are drawn and the score
//! with and without the feature is compared. Features absent from a coalition take the
//! baseline value. Each feature has its own RNG seeded from `seed + index`, so the result
//! does not depend on how rayon schedules the work.

use crate::config::ExplanationConfig;
use crate::domain::errors::EnsembleError;
use crate::domain::ml::Scorer;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tokio_util::sync::CancellationToken;

const CANCEL_CHECK_INTERVAL: usize = 16;

pub fn shapley_values(
    scorer: &dyn Scorer,
    features: &[f64],
    config: &ExplanationConfig,
    cancel: &CancellationToken,
) -> Result<Vec<f64>, EnsembleError> {
    let n = features.len();
    if config.shapley_samples == 0 {
        return Ok(vec![0.0; n]);
    }

    (0..n)
        .into_par_iter()
        .map(|index| feature_value(scorer, features, index, config, cancel))
        .collect()
}

fn feature_value(
    scorer: &dyn Scorer,
    features: &[f64],
    index: usize,
    config: &ExplanationConfig,
    cancel: &CancellationToken,
) -> Result<f64, EnsembleError> {
    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(index as u64));
    let others: Vec<usize> = (0..features.len()).filter(|&j| j != index).collect();
    let max_size = config.max_coalition_size.min(others.len());

    let mut without = vec![config.baseline_value; features.len()];
    let mut with = without.clone();
    let mut total = 0.0;

    for sample in 0..config.shapley_samples {
        if sample % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
            return Err(EnsembleError::ExplanationCancelled);
        }

        without.fill(config.baseline_value);
        let size = rng.random_range(0..=max_size);
        for position in rand::seq::index::sample(&mut rng, others.len(), size).iter() {
            let j = others[position];
            without[j] = features[j];
        }
        with.copy_from_slice(&without);
        with[index] = features[index];

        let gain = score(scorer, &with)? - score(scorer, &without)?;
        total += gain;
    }

    Ok(total / config.shapley_samples as f64)
}

fn score(scorer: &dyn Scorer, features: &[f64]) -> Result<f64, EnsembleError> {
    scorer
        .predict(features)
        .map_err(|source| EnsembleError::ExplanationFailed {
            stage: "shapley",
            source,
        })
}
