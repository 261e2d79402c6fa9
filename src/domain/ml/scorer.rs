use crate::domain::errors::ScorerError;

/// Interface for any model that scores a feature vector.
///
/// The concrete architecture (gradient boosting, a feedforward net, a linear model)
/// stays behind this trait. Positive scores lean BUY, negative lean SELL.
pub trait Scorer: Send + Sync {
    fn predict(&self, features: &[f64]) -> Result<f64, ScorerError>;

    /// Get model name/type
    fn name(&self) -> &str;

    /// Get model version/id
    fn version(&self) -> &str {
        "v1"
    }
}

/// Trainable model that maps a fixed-width vector onto a BUY/SELL/HOLD distribution
pub trait MetaLearner: Send + Sync {
    /// Number of inputs the learner expects
    fn input_width(&self) -> usize;

    /// Class probabilities in BUY, SELL, HOLD order, summing to 1
    fn predict_proba(&self, features: &[f64]) -> Result<[f64; 3], ScorerError>;

    /// One gradient step toward `target` (a distribution in BUY, SELL, HOLD order).
    /// Returns the cross-entropy loss before the step.
    fn train_step(
        &mut self,
        features: &[f64],
        target: &[f64; 3],
        learning_rate: f64,
    ) -> Result<f64, ScorerError>;

    /// Independent copy used for copy-on-write training
    fn clone_box(&self) -> Box<dyn MetaLearner>;

    fn name(&self) -> &str;
}
