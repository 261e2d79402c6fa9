//! Ensemble engine: the synchronous core behind `EnsembleService`.
//!
//! Aggregation reads a cloned weight snapshot and an `Arc` of the installed meta-learner,
//! so decisions never block on training. Weight updates go through the table's single
//! write guard. Meta-learner training is copy-on-write: the learner is cloned, trained,
//! then swapped in with a bumped version while a training mutex serializes writers.

use crate::application::adaptation::{AdaptationReport, WeightAdapter};
use crate::application::aggregation::{AggregationContext, StrategyRegistry};
use crate::application::explanation::ExplanationEngine;
use crate::config::EngineConfig;
use crate::domain::ensemble::weights::normalize_regime;
use crate::domain::ensemble::{
    AggregationMethod, DecisionHistory, DecisionRecord, DiversityAnalyzer, DiversityMetrics,
    WeightPartition, WeightSnapshot, WeightTable,
};
use crate::domain::errors::EnsembleError;
use crate::domain::explanation::ExplanationResult;
use crate::domain::ml::{MetaLearner, Scorer, SoftmaxMetaLearner, build_meta_features};
use crate::domain::signal::{EnsembleSignal, ModelSignal};
use crate::infrastructure::observability::EnsembleMetrics;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Clone)]
struct InstalledLearner {
    version: u64,
    learner: Arc<dyn MetaLearner>,
}

pub struct EnsembleEngine {
    config: EngineConfig,
    registry: StrategyRegistry,
    weights: WeightTable,
    adapter: WeightAdapter,
    explainer: ExplanationEngine,
    meta_learner: RwLock<Option<InstalledLearner>>,
    training: Mutex<()>,
    scorer: RwLock<Option<Arc<dyn Scorer>>>,
    history: RwLock<DecisionHistory>,
    latest_diversity: RwLock<DiversityMetrics>,
    metrics: Option<EnsembleMetrics>,
}

impl EnsembleEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_registry(config, StrategyRegistry::with_defaults())
    }

    pub fn with_registry(config: EngineConfig, registry: StrategyRegistry) -> Self {
        let meta_learner = config.aggregation.bootstrap_meta_learner.then(|| {
            let learner: Arc<dyn MetaLearner> = Arc::new(SoftmaxMetaLearner::with_vote_prior(
                config.aggregation.meta_input_width,
                config.aggregation.meta_prior_gain,
            ));
            InstalledLearner {
                version: 1,
                learner,
            }
        });

        info!(
            "EnsembleEngine: initialized with {} strategies, history capacity {}",
            registry.methods().len(),
            config.history.capacity
        );

        Self {
            weights: WeightTable::new(config.adaptation.weights),
            adapter: WeightAdapter::new(config.adaptation.clone()),
            explainer: ExplanationEngine::new(config.explanation.clone()),
            history: RwLock::new(DecisionHistory::new(config.history.capacity)),
            meta_learner: RwLock::new(meta_learner),
            training: Mutex::new(()),
            scorer: RwLock::new(None),
            latest_diversity: RwLock::new(DiversityMetrics::default()),
            metrics: None,
            registry,
            config,
        }
    }

    pub fn with_metrics(mut self, metrics: EnsembleMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> Option<&EnsembleMetrics> {
        self.metrics.as_ref()
    }

    // ---------------------------------------------------------------------
    // Aggregation
    // ---------------------------------------------------------------------

    /// Reduces a batch to one decision and records it in history.
    ///
    /// With `regime_filter`, only signals whose regime matches (case-insensitive) are used.
    pub fn aggregate(
        &self,
        signals: &[ModelSignal],
        method: AggregationMethod,
        regime_filter: Option<&str>,
    ) -> Result<EnsembleSignal, EnsembleError> {
        self.aggregate_inner(signals, method, regime_filter)
            .inspect_err(|e| self.record_error(e))
    }

    pub fn aggregate_by_name(
        &self,
        signals: &[ModelSignal],
        method: &str,
        regime_filter: Option<&str>,
    ) -> Result<EnsembleSignal, EnsembleError> {
        let method = method
            .parse::<AggregationMethod>()
            .inspect_err(|e| self.record_error(e))?;
        self.aggregate(signals, method, regime_filter)
    }

    /// Retries with performance-weighted voting when `method` is unavailable
    pub fn aggregate_with_fallback(
        &self,
        signals: &[ModelSignal],
        method: AggregationMethod,
        regime_filter: Option<&str>,
    ) -> Result<EnsembleSignal, EnsembleError> {
        match self.aggregate(signals, method, regime_filter) {
            Err(e)
                if e.is_recoverable_with_fallback()
                    && method != AggregationMethod::PerformanceWeighted =>
            {
                warn!(
                    "EnsembleEngine: {} unavailable ({}), falling back to performance_weighted",
                    method.as_str(),
                    e
                );
                self.aggregate(signals, AggregationMethod::PerformanceWeighted, regime_filter)
            }
            other => other,
        }
    }

    fn aggregate_inner(
        &self,
        signals: &[ModelSignal],
        method: AggregationMethod,
        regime_filter: Option<&str>,
    ) -> Result<EnsembleSignal, EnsembleError> {
        if signals.is_empty() {
            return Err(EnsembleError::invalid_input("signal batch is empty"));
        }
        for signal in signals {
            signal.validate()?;
        }

        let batch = filter_by_regime(signals, regime_filter)?;
        let strategy = self.registry.get(method)?;

        let snapshot = self.weights.snapshot();
        let installed = self.meta_learner.read().clone();
        let ctx = AggregationContext {
            config: &self.config.aggregation,
            risk: &self.config.risk,
            weights: &snapshot,
            meta_learner: installed.as_ref().map(|l| l.learner.as_ref()),
        };

        let ensemble = strategy.aggregate(&batch, &ctx)?;

        let deciding: Vec<ModelSignal> = strategy
            .deciding_signals(&batch, &ctx)
            .into_iter()
            .cloned()
            .collect();
        *self.latest_diversity.write() = DiversityAnalyzer::analyze(&deciding);

        let meta_features = match (method, &installed) {
            (AggregationMethod::Stacking, Some(l)) => {
                Some(build_meta_features(&batch, l.learner.input_width()))
            }
            _ => None,
        };

        let (sequence, history_len) = {
            let mut history = self.history.write();
            let sequence = history.push(method, batch, ensemble.clone(), meta_features);
            (sequence, history.len())
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_aggregation(
                method.as_str(),
                &ensemble.action.to_string(),
                ensemble.consensus_level,
            );
            metrics.history_size.set(history_len as f64);
        }

        info!(
            "EnsembleEngine: #{} {} -> {} (consensus {:.2}, confidence {:.2}, risk {})",
            sequence,
            method.as_str(),
            ensemble.action,
            ensemble.consensus_level,
            ensemble.confidence,
            ensemble.risk_assessment.level
        );

        Ok(ensemble)
    }

    // ---------------------------------------------------------------------
    // Adaptation
    // ---------------------------------------------------------------------

    /// Feeds the realized return of the most recent decision back into the weights
    pub fn record_outcome(&self, outcome: f64) -> Result<AdaptationReport, EnsembleError> {
        let sequence = self
            .history
            .read()
            .latest()
            .map(|r| r.sequence)
            .ok_or_else(|| EnsembleError::invalid_input("no decision to attach an outcome to"))?;
        self.record_outcome_for(sequence, outcome)
    }

    pub fn record_outcome_for(
        &self,
        sequence: u64,
        outcome: f64,
    ) -> Result<AdaptationReport, EnsembleError> {
        self.record_outcome_inner(sequence, outcome)
            .inspect_err(|e| self.record_error(e))
    }

    fn record_outcome_inner(
        &self,
        sequence: u64,
        outcome: f64,
    ) -> Result<AdaptationReport, EnsembleError> {
        if !outcome.is_finite() {
            return Err(EnsembleError::invalid_input("outcome is not finite"));
        }

        // Claim the record first so concurrent callers cannot adapt twice
        let record = {
            let mut history = self.history.write();
            let record = history.get_mut(sequence).ok_or_else(|| {
                EnsembleError::invalid_input(format!("decision #{sequence} is not in history"))
            })?;
            if record.outcome.is_some() {
                return Err(EnsembleError::invalid_input(format!(
                    "decision #{sequence} already has an outcome"
                )));
            }
            record.outcome = Some(outcome);
            record.clone()
        };

        match self.adapt(&record, outcome) {
            Ok(report) => Ok(report),
            Err(e) => {
                if let Some(r) = self.history.write().get_mut(sequence) {
                    r.outcome = None;
                }
                Err(e)
            }
        }
    }

    fn adapt(&self, record: &DecisionRecord, outcome: f64) -> Result<AdaptationReport, EnsembleError> {
        let mut report = self.adapter.adapt_weights(&self.weights, record, outcome);

        if let (AggregationMethod::Stacking, Some(features)) =
            (record.method, record.meta_features.as_ref())
        {
            report.meta_loss = Some(self.train_meta_learner(features, outcome)?);
        }

        if let Some(metrics) = &self.metrics {
            metrics.inc_weight_updates(record.method.as_str(), report.weight_changes.len());
        }

        info!(
            "EnsembleEngine: outcome {:+.4} for #{} ({}): category {}, ensemble {}, {} weight changes",
            outcome,
            record.sequence,
            record.method.as_str(),
            report.category,
            if report.ensemble_correct { "correct" } else { "wrong" },
            report.weight_changes.len()
        );

        Ok(report)
    }

    /// Clones the installed learner, trains the clone and swaps it in
    fn train_meta_learner(&self, features: &[f64], outcome: f64) -> Result<f64, EnsembleError> {
        let _guard = self.training.lock();

        let current = self
            .meta_learner
            .read()
            .clone()
            .ok_or_else(|| EnsembleError::UninitializedModel {
                method: AggregationMethod::Stacking.as_str().to_string(),
            })?;

        let mut candidate = current.learner.clone_box();
        let loss = self
            .adapter
            .train_meta_learner(candidate.as_mut(), features, outcome)
            .map_err(|source| EnsembleError::MetaLearnerFailed { source })?;

        let version = current.version + 1;
        *self.meta_learner.write() = Some(InstalledLearner {
            version,
            learner: Arc::from(candidate),
        });

        if let Some(metrics) = &self.metrics {
            metrics.meta_learner_version.set(version as f64);
        }
        debug!(
            "EnsembleEngine: meta-learner v{} installed (loss before step {:.4})",
            version, loss
        );

        Ok(loss)
    }

    // ---------------------------------------------------------------------
    // Models
    // ---------------------------------------------------------------------

    /// Installs a meta-learner for stacking and returns its version
    pub fn set_meta_learner(&self, learner: Box<dyn MetaLearner>) -> u64 {
        let _guard = self.training.lock();
        let mut slot = self.meta_learner.write();
        let version = slot.as_ref().map_or(1, |l| l.version + 1);
        info!(
            "EnsembleEngine: meta-learner '{}' installed as v{}",
            learner.name(),
            version
        );
        *slot = Some(InstalledLearner {
            version,
            learner: Arc::from(learner),
        });
        if let Some(metrics) = &self.metrics {
            metrics.meta_learner_version.set(version as f64);
        }
        version
    }

    pub fn meta_learner_version(&self) -> Option<u64> {
        self.meta_learner.read().as_ref().map(|l| l.version)
    }

    /// Class probabilities of the installed learner, for inspection
    pub fn meta_learner_predict(&self, features: &[f64]) -> Result<[f64; 3], EnsembleError> {
        let installed = self.meta_learner.read().clone().ok_or_else(|| {
            EnsembleError::UninitializedModel {
                method: AggregationMethod::Stacking.as_str().to_string(),
            }
        })?;
        installed
            .learner
            .predict_proba(features)
            .map_err(|source| EnsembleError::MetaLearnerFailed { source })
    }

    pub fn set_scorer(&self, scorer: Arc<dyn Scorer>) {
        info!("EnsembleEngine: scorer '{}' ({}) installed", scorer.name(), scorer.version());
        *self.scorer.write() = Some(scorer);
    }

    pub fn scorer(&self) -> Option<Arc<dyn Scorer>> {
        self.scorer.read().clone()
    }

    // ---------------------------------------------------------------------
    // Explanation
    // ---------------------------------------------------------------------

    /// Explains `features` with the installed scorer
    pub fn explain(&self, features: &[f64]) -> Result<ExplanationResult, EnsembleError> {
        let scorer = self.scorer().ok_or_else(|| EnsembleError::UninitializedModel {
            method: "explanation".to_string(),
        });
        let scorer = scorer.inspect_err(|e| self.record_error(e))?;
        self.explain_with(features, scorer.as_ref(), &CancellationToken::new())
    }

    pub fn explain_with(
        &self,
        features: &[f64],
        scorer: &dyn Scorer,
        cancel: &CancellationToken,
    ) -> Result<ExplanationResult, EnsembleError> {
        let started = Instant::now();
        let result = self.explainer.explain(features, scorer, cancel);

        match &result {
            Ok(_) => {
                if let Some(metrics) = &self.metrics {
                    metrics.observe_explanation(started.elapsed().as_secs_f64());
                }
            }
            Err(e) => self.record_error(e),
        }
        result
    }

    // ---------------------------------------------------------------------
    // State
    // ---------------------------------------------------------------------

    pub fn latest_diversity(&self) -> DiversityMetrics {
        *self.latest_diversity.read()
    }

    pub fn weight_snapshot(&self) -> WeightSnapshot {
        self.weights.snapshot()
    }

    pub fn weight(&self, partition: &WeightPartition, model_id: &str) -> f64 {
        self.weights.get(partition, model_id)
    }

    /// Ensemble decisions, oldest first
    pub fn history(&self) -> Vec<EnsembleSignal> {
        self.history.read().ensembles()
    }

    pub fn decision_records(&self) -> Vec<DecisionRecord> {
        self.history.read().records().cloned().collect()
    }

    pub fn decision(&self, sequence: u64) -> Option<DecisionRecord> {
        self.history.read().get(sequence).cloned()
    }

    pub fn reset_weights(&self) {
        self.weights.reset();
        info!("EnsembleEngine: weights reset");
    }

    pub fn reset_history(&self) {
        self.history.write().reset();
        *self.latest_diversity.write() = DiversityMetrics::default();
        if let Some(metrics) = &self.metrics {
            metrics.history_size.set(0.0);
        }
        info!("EnsembleEngine: history reset");
    }

    /// Clears weights and history. The installed models are kept.
    pub fn reset(&self) {
        self.reset_weights();
        self.reset_history();
    }

    fn record_error(&self, error: &EnsembleError) {
        warn!("EnsembleEngine: {} ({})", error, error.kind());
        if let Some(metrics) = &self.metrics {
            metrics.inc_errors(error.kind());
        }
    }
}

fn filter_by_regime(
    signals: &[ModelSignal],
    regime_filter: Option<&str>,
) -> Result<Vec<ModelSignal>, EnsembleError> {
    let Some(filter) = regime_filter else {
        return Ok(signals.to_vec());
    };

    let wanted = normalize_regime(filter);
    let batch: Vec<ModelSignal> = signals
        .iter()
        .filter(|s| normalize_regime(&s.regime) == wanted)
        .cloned()
        .collect();

    if batch.is_empty() {
        return Err(EnsembleError::invalid_input(format!(
            "no signals match regime '{filter}'"
        )));
    }
    Ok(batch)
}
