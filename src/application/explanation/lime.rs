//! Local linear surrogate around one feature vector.
//!
//! Perturbations are scored in parallel and a weighted least-squares model with intercept
//! is fitted on the offsets from the explained point. Each sample is weighted by
//! `exp(-d / kernel_width)` where `d` is the Euclidean norm of its offset vector.

use crate::config::ExplanationConfig;
use crate::domain::errors::EnsembleError;
use crate::domain::explanation::{FeatureContribution, LocalExplanation};
use crate::domain::ml::Scorer;
use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;
use tokio_util::sync::CancellationToken;

const CANCEL_CHECK_INTERVAL: usize = 64;
const SUM_EPSILON: f64 = 1e-12;

struct Perturbation {
    offsets: Vec<f64>,
    distance: f64,
}

pub fn fit_local_surrogate(
    scorer: &dyn Scorer,
    features: &[f64],
    config: &ExplanationConfig,
    cancel: &CancellationToken,
) -> Result<LocalExplanation, EnsembleError> {
    let n = features.len();
    let scales: Vec<f64> = features
        .iter()
        .map(|x| (config.noise_scale * x.abs()).max(config.noise_floor))
        .collect();

    let perturbations = sample_perturbations(&scales, config);

    let targets: Vec<f64> = perturbations
        .par_iter()
        .enumerate()
        .map(|(i, p)| {
            if i % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                return Err(EnsembleError::ExplanationCancelled);
            }
            let point: Vec<f64> = features
                .iter()
                .zip(&p.offsets)
                .map(|(x, offset)| x + offset)
                .collect();
            scorer
                .predict(&point)
                .map_err(|source| EnsembleError::ExplanationFailed {
                    stage: "lime",
                    source,
                })
        })
        .collect::<Result<Vec<f64>, EnsembleError>>()?;

    // Subtracting the closest distance keeps the kernel from underflowing in high dimension
    let nearest = perturbations
        .iter()
        .map(|p| p.distance)
        .fold(f64::INFINITY, f64::min);
    let weights: Vec<f64> = perturbations
        .iter()
        .map(|p| (-(p.distance - nearest) / config.kernel_width).exp())
        .collect();

    let m = perturbations.len();
    let sqrt_w: Vec<f64> = weights.iter().map(|w| w.sqrt()).collect();
    let design = DMatrix::from_fn(m, n + 1, |r, c| {
        let x = if c == 0 { 1.0 } else { perturbations[r].offsets[c - 1] };
        x * sqrt_w[r]
    });
    let response = DVector::from_fn(m, |r, _| targets[r] * sqrt_w[r]);

    let normal = design.transpose() * &design + DMatrix::identity(n + 1, n + 1) * config.ridge;
    let rhs = design.transpose() * &response;
    let beta = solve(normal, &rhs).unwrap_or_else(|| {
        // degenerate system: constant surrogate at the weighted mean
        let weight_sum: f64 = weights.iter().sum();
        let mean = weights.iter().zip(&targets).map(|(w, y)| w * y).sum::<f64>()
            / weight_sum.max(SUM_EPSILON);
        let mut beta = DVector::zeros(n + 1);
        beta[0] = mean;
        beta
    });

    let (local_fidelity, r_squared) = goodness_of_fit(&perturbations, &targets, &weights, &beta);

    let contributions = (0..n)
        .map(|j| FeatureContribution {
            index: j,
            name: config.feature_name(j),
            coefficient: beta[j + 1],
            contribution: beta[j + 1] * features[j],
        })
        .collect();

    Ok(LocalExplanation {
        intercept: beta[0],
        contributions,
        local_fidelity,
        r_squared,
        samples: m,
    })
}

fn sample_perturbations(scales: &[f64], config: &ExplanationConfig) -> Vec<Perturbation> {
    let mut rng = StdRng::seed_from_u64(config.seed);

    (0..config.perturbation_count)
        .map(|_| {
            let offsets: Vec<f64> = scales
                .iter()
                .map(|scale| {
                    let z: f64 = StandardNormal.sample(&mut rng);
                    z * scale
                })
                .collect();
            let distance = euclidean_norm(&offsets);
            Perturbation { offsets, distance }
        })
        .collect()
}

fn euclidean_norm(offsets: &[f64]) -> f64 {
    offsets.iter().map(|o| o * o).sum::<f64>().sqrt()
}

fn solve(normal: DMatrix<f64>, rhs: &DVector<f64>) -> Option<DVector<f64>> {
    if let Some(cholesky) = normal.clone().cholesky() {
        return Some(cholesky.solve(rhs));
    }
    normal.lu().solve(rhs)
}

/// `(exp(-weighted MSE), weighted R²)`
fn goodness_of_fit(
    perturbations: &[Perturbation],
    targets: &[f64],
    weights: &[f64],
    beta: &DVector<f64>,
) -> (f64, f64) {
    let weight_sum: f64 = weights.iter().sum();
    if weight_sum <= SUM_EPSILON {
        return (1.0, 0.0);
    }

    let weighted_mean = weights.iter().zip(targets).map(|(w, y)| w * y).sum::<f64>() / weight_sum;

    let mut residual = 0.0;
    let mut spread = 0.0;
    for ((p, y), w) in perturbations.iter().zip(targets).zip(weights) {
        let fitted = beta[0]
            + p.offsets
                .iter()
                .enumerate()
                .map(|(j, x)| beta[j + 1] * x)
                .sum::<f64>();
        residual += w * (y - fitted).powi(2);
        spread += w * (y - weighted_mean).powi(2);
    }

    let mse = residual / weight_sum;
    let r_squared = if spread > SUM_EPSILON {
        (1.0 - residual / spread).clamp(0.0, 1.0)
    } else if residual <= SUM_EPSILON {
        1.0
    } else {
        0.0
    };

    ((-mse).exp(), r_squared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::{FailingScorer, LinearScorer, QuadraticScorer};

    fn config(samples: usize) -> ExplanationConfig {
        ExplanationConfig {
            perturbation_count: samples,
            ..ExplanationConfig::default()
        }
    }

    #[test]
    fn test_linear_scorer_is_recovered() {
        let scorer = LinearScorer::new(vec![0.8, -0.5, 0.3], 0.2);
        let features = [1.0, 2.0, -0.5];

        let local =
            fit_local_surrogate(&scorer, &features, &config(500), &CancellationToken::new())
                .unwrap();

        assert!(local.local_fidelity > 0.999_999);
        assert!(local.r_squared > 0.999);
        assert!((local.contributions[0].coefficient - 0.8).abs() < 1e-4);
        assert!((local.contributions[1].coefficient + 0.5).abs() < 1e-4);
        // intercept is the score at the explained point
        assert!((local.intercept - (0.2 + 0.8 - 1.0 - 0.15)).abs() < 1e-4);
        assert_eq!(local.samples, 500);
    }

    #[test]
    fn test_fidelity_stays_in_unit_interval() {
        let scorer = QuadraticScorer::new(vec![3.0, -2.0]);
        let local = fit_local_surrogate(
            &scorer,
            &[5.0, -4.0],
            &config(300),
            &CancellationToken::new(),
        )
        .unwrap();

        assert!(local.local_fidelity > 0.0 && local.local_fidelity <= 1.0);
        assert!((0.0..=1.0).contains(&local.r_squared));
    }

    #[test]
    fn test_fidelity_approaches_one_as_noise_shrinks() {
        let scorer = QuadraticScorer::new(vec![3.0, -2.0]);

        let fidelities: Vec<f64> = [0.3, 0.1, 0.01, 0.001]
            .iter()
            .map(|&noise_scale| {
                let config = ExplanationConfig {
                    noise_scale,
                    perturbation_count: 400,
                    ..ExplanationConfig::default()
                };
                fit_local_surrogate(&scorer, &[5.0, -4.0], &config, &CancellationToken::new())
                    .unwrap()
                    .local_fidelity
            })
            .collect();

        assert!(fidelities.windows(2).all(|w| w[0] <= w[1]), "{fidelities:?}");
        assert!(fidelities[0] < fidelities[3]);
        assert!(fidelities[3] > 0.999);
    }

    #[test]
    fn test_kernel_distance_is_raw_euclidean() {
        let config = ExplanationConfig {
            perturbation_count: 50,
            ..ExplanationConfig::default()
        };
        let perturbations = sample_perturbations(&[0.5, 0.4], &config);

        for p in &perturbations {
            let expected = (p.offsets[0].powi(2) + p.offsets[1].powi(2)).sqrt();
            assert!((p.distance - expected).abs() < 1e-12);
        }
        assert_eq!(euclidean_norm(&[3.0, -4.0]), 5.0);
    }

    #[test]
    fn test_scorer_failure_is_lime_stage() {
        let err = fit_local_surrogate(
            &FailingScorer::new("offline"),
            &[1.0],
            &config(10),
            &CancellationToken::new(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            EnsembleError::ExplanationFailed { stage: "lime", .. }
        ));
    }
}
