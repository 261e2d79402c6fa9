use super::meta_features::SLOT_WIDTH;
use super::scorer::{MetaLearner, Scorer};
use crate::domain::errors::ScorerError;
use serde::{Deserialize, Serialize};

const CLASSES: usize = 3;

/// Multinomial logistic regression over the stacking vector.
///
/// `p = softmax(W x + b)` with one row of `W` per action (BUY, SELL, HOLD).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxMetaLearner {
    input_width: usize,
    weights: Vec<[f64; CLASSES]>,
    bias: [f64; CLASSES],
}

impl SoftmaxMetaLearner {
    /// Untrained learner, predicts uniform probabilities
    pub fn new(input_width: usize) -> Self {
        Self {
            input_width,
            weights: vec![[0.0; CLASSES]; input_width],
            bias: [0.0; CLASSES],
        }
    }

    /// Learner initialised to behave like a confidence-weighted vote: each slot's signed
    /// action pushes mass toward BUY or SELL with `gain`, weak confidence leans HOLD.
    pub fn with_vote_prior(input_width: usize, gain: f64) -> Self {
        let mut learner = Self::new(input_width);
        for (index, row) in learner.weights.iter_mut().enumerate() {
            match index % SLOT_WIDTH {
                // signed action
                3 => {
                    row[0] = gain;
                    row[1] = -gain;
                }
                // confidence
                0 => row[2] = -0.5 * gain,
                _ => {}
            }
        }
        learner.bias[2] = 0.25 * gain;
        learner
    }

    fn logits(&self, features: &[f64]) -> Result<[f64; CLASSES], ScorerError> {
        if features.len() != self.input_width {
            return Err(ScorerError::new(format!(
                "expected {} features, got {}",
                self.input_width,
                features.len()
            )));
        }
        if let Some(bad) = features.iter().position(|v| !v.is_finite()) {
            return Err(ScorerError::new(format!("feature {bad} is not finite")));
        }

        let mut logits = self.bias;
        for (x, row) in features.iter().zip(&self.weights) {
            for k in 0..CLASSES {
                logits[k] += row[k] * x;
            }
        }
        Ok(logits)
    }
}

fn softmax(logits: [f64; CLASSES]) -> [f64; CLASSES] {
    let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps = logits.map(|l| (l - max).exp());
    let total: f64 = exps.iter().sum();
    exps.map(|e| e / total)
}

impl MetaLearner for SoftmaxMetaLearner {
    fn input_width(&self) -> usize {
        self.input_width
    }

    fn predict_proba(&self, features: &[f64]) -> Result<[f64; 3], ScorerError> {
        Ok(softmax(self.logits(features)?))
    }

    fn train_step(
        &mut self,
        features: &[f64],
        target: &[f64; 3],
        learning_rate: f64,
    ) -> Result<f64, ScorerError> {
        let probs = softmax(self.logits(features)?);
        let loss: f64 = target
            .iter()
            .zip(&probs)
            .map(|(t, p)| -t * p.max(1e-12).ln())
            .sum();

        // d(cross-entropy)/d(logit_k) = p_k - t_k
        let gradient: [f64; CLASSES] = std::array::from_fn(|k| probs[k] - target[k]);

        for (x, row) in features.iter().zip(self.weights.iter_mut()) {
            for k in 0..CLASSES {
                row[k] -= learning_rate * gradient[k] * x;
            }
        }
        for k in 0..CLASSES {
            self.bias[k] -= learning_rate * gradient[k];
        }

        Ok(loss)
    }

    fn clone_box(&self) -> Box<dyn MetaLearner> {
        Box::new(self.clone())
    }

    fn name(&self) -> &str {
        "Softmax Meta-Learner"
    }
}

/// Scores as `P(BUY) - P(SELL)`, so the learner can also be explained
impl Scorer for SoftmaxMetaLearner {
    fn predict(&self, features: &[f64]) -> Result<f64, ScorerError> {
        let probs = self.predict_proba(features)?;
        Ok(probs[0] - probs[1])
    }

    fn name(&self) -> &str {
        "Softmax Meta-Learner"
    }
}
