//! Async facade over `EnsembleEngine`.
//!
//! Aggregation is cheap and runs inline. Outcome recording (which may train the
//! meta-learner) and explanations run on tokio's blocking pool. Explanations are bounded
//! by a timeout; when it fires the job's cancellation token is tripped so the sampling
//! loops stop instead of running on in the background.

use crate::application::adaptation::AdaptationReport;
use crate::application::engine::EnsembleEngine;
use crate::domain::ensemble::AggregationMethod;
use crate::domain::errors::EnsembleError;
use crate::domain::explanation::ExplanationResult;
use crate::domain::signal::{EnsembleSignal, ModelSignal};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Clone)]
pub struct EnsembleService {
    engine: Arc<EnsembleEngine>,
    explanation_timeout: Duration,
}

impl EnsembleService {
    pub fn new(engine: Arc<EnsembleEngine>) -> Self {
        let explanation_timeout = Duration::from_millis(engine.config().explanation.timeout_ms);
        Self {
            engine,
            explanation_timeout,
        }
    }

    pub fn with_explanation_timeout(mut self, timeout: Duration) -> Self {
        self.explanation_timeout = timeout;
        self
    }

    pub fn engine(&self) -> &Arc<EnsembleEngine> {
        &self.engine
    }

    pub async fn aggregate(
        &self,
        signals: &[ModelSignal],
        method: AggregationMethod,
        regime_filter: Option<&str>,
    ) -> Result<EnsembleSignal, EnsembleError> {
        self.engine.aggregate(signals, method, regime_filter)
    }

    pub async fn record_outcome(&self, outcome: f64) -> Result<AdaptationReport, EnsembleError> {
        let engine = self.engine.clone();
        tokio::task::spawn_blocking(move || engine.record_outcome(outcome))
            .await
            .map_err(worker_error)?
    }

    pub async fn record_outcome_for(
        &self,
        sequence: u64,
        outcome: f64,
    ) -> Result<AdaptationReport, EnsembleError> {
        let engine = self.engine.clone();
        tokio::task::spawn_blocking(move || engine.record_outcome_for(sequence, outcome))
            .await
            .map_err(worker_error)?
    }

    /// Explains `features` with the installed scorer, bounded by the configured timeout
    pub async fn explain(&self, features: Vec<f64>) -> Result<ExplanationResult, EnsembleError> {
        self.explain_with_token(features, CancellationToken::new())
            .await
    }

    /// Like `explain`, but `cancel` lets the caller abort early
    pub async fn explain_with_token(
        &self,
        features: Vec<f64>,
        cancel: CancellationToken,
    ) -> Result<ExplanationResult, EnsembleError> {
        let scorer = self
            .engine
            .scorer()
            .ok_or_else(|| EnsembleError::UninitializedModel {
                method: "explanation".to_string(),
            })?;

        let job_token = cancel.child_token();
        let worker_token = job_token.clone();
        let engine = self.engine.clone();
        let handle = tokio::task::spawn_blocking(move || {
            engine.explain_with(&features, scorer.as_ref(), &worker_token)
        });

        match tokio::time::timeout(self.explanation_timeout, handle).await {
            Ok(joined) => joined.map_err(worker_error)?,
            Err(_) => {
                job_token.cancel();
                let timeout_ms = self.explanation_timeout.as_millis() as u64;
                warn!("EnsembleService: explanation timed out after {}ms", timeout_ms);
                let error = EnsembleError::ExplanationTimeout { timeout_ms };
                if let Some(metrics) = self.engine.metrics() {
                    metrics.inc_errors(error.kind());
                }
                Err(error)
            }
        }
    }
}

fn worker_error(error: JoinError) -> EnsembleError {
    EnsembleError::Worker {
        reason: error.to_string(),
    }
}
