use thiserror::Error;

/// Error raised by a scorer or meta-learner while evaluating a feature vector
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct ScorerError {
    pub message: String,
}

impl ScorerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors surfaced by the ensemble engine.
///
/// None of these are fatal: callers can recover at the call site, typically by
/// retrying with `AggregationMethod::PerformanceWeighted`, which needs no auxiliary model.
#[derive(Debug, Error)]
pub enum EnsembleError {
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Unknown aggregation strategy: {name}")]
    UnknownStrategy { name: String },

    #[error("Model not initialized for {method}")]
    UninitializedModel { method: String },

    #[error("Meta-learner failed: {source}")]
    MetaLearnerFailed {
        #[source]
        source: ScorerError,
    },

    #[error("Explanation failed during {stage}: {source}")]
    ExplanationFailed {
        stage: &'static str,
        #[source]
        source: ScorerError,
    },

    #[error("Explanation cancelled")]
    ExplanationCancelled,

    #[error("Explanation timed out after {timeout_ms}ms")]
    ExplanationTimeout { timeout_ms: u64 },

    #[error("Background worker failed: {reason}")]
    Worker { reason: String },
}

impl EnsembleError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        EnsembleError::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Short label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            EnsembleError::InvalidInput { .. } => "invalid_input",
            EnsembleError::UnknownStrategy { .. } => "unknown_strategy",
            EnsembleError::UninitializedModel { .. } => "uninitialized_model",
            EnsembleError::MetaLearnerFailed { .. } => "meta_learner_failed",
            EnsembleError::ExplanationFailed { .. } => "explanation_failed",
            EnsembleError::ExplanationCancelled => "explanation_cancelled",
            EnsembleError::ExplanationTimeout { .. } => "explanation_timeout",
            EnsembleError::Worker { .. } => "worker",
        }
    }

    /// Errors for which retrying with performance-weighted voting is a safe default
    pub fn is_recoverable_with_fallback(&self) -> bool {
        matches!(
            self,
            EnsembleError::UnknownStrategy { .. } | EnsembleError::UninitializedModel { .. }
        )
    }
}
