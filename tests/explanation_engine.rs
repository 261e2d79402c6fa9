use signal_ensemble::application::EnsembleEngine;
use signal_ensemble::config::{EngineConfig, ExplanationConfig};
use signal_ensemble::domain::ensemble::AggregationMethod;
use signal_ensemble::domain::errors::EnsembleError;
use signal_ensemble::domain::explanation::{RiskCategory, Severity};
use signal_ensemble::domain::signal::SignalAction;
use signal_ensemble::infrastructure::mock::{
    CountingScorer, FailingScorer, LinearScorer, split_batch,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn engine() -> EnsembleEngine {
    let config = EngineConfig {
        explanation: ExplanationConfig {
            shapley_samples: 40,
            perturbation_count: 400,
            feature_names: vec!["rsi".into(), "volatility".into(), "volume".into()],
            ..ExplanationConfig::default()
        },
        ..EngineConfig::default()
    };
    EnsembleEngine::new(config)
}

const FEATURES: [f64; 3] = [0.5, 1.0, 0.2];

fn linear() -> LinearScorer {
    LinearScorer::new(vec![0.6, 0.8, 0.1], 0.0)
}

#[test]
fn test_linear_model_is_explained_exactly() {
    let engine = engine();
    engine.set_scorer(Arc::new(linear()));

    let result = engine.explain(&FEATURES).unwrap();

    assert_eq!(result.action, SignalAction::Buy);
    assert!((result.score - 1.12).abs() < 1e-9);

    let expected = [0.3, 0.8, 0.02];
    for (attribution, want) in result.attributions.iter().zip(expected) {
        assert!(
            (attribution.attribution - want).abs() < 1e-9,
            "{}: {} != {}",
            attribution.name,
            attribution.attribution,
            want
        );
    }

    assert!(result.local.local_fidelity > 0.99);
    assert!(result.local.r_squared > 0.99);
    assert_eq!(result.top_attributions(1)[0].name, "volatility");
}

#[test]
fn test_risk_factors_and_narrative_name_features() {
    let engine = engine();
    engine.set_scorer(Arc::new(linear()));

    let result = engine.explain(&FEATURES).unwrap();

    let volatility = result
        .risk_factors
        .iter()
        .find(|r| r.category == RiskCategory::Volatility)
        .unwrap();
    assert_eq!(volatility.severity, Severity::Critical);
    assert_eq!(volatility.feature, "volatility");
    assert!(!volatility.mitigations.is_empty());

    assert!(result.narrative.contains("BUY"));
    assert!(result.narrative.contains("volatility"));
    assert!(!result.decision_path.is_empty());
}

/// Test: a failing scorer aborts the explanation and touches no engine state
#[test]
fn test_failing_scorer_leaves_state_untouched() {
    let engine = engine();
    engine
        .aggregate(&split_batch(), AggregationMethod::PerformanceWeighted, None)
        .unwrap();
    engine.record_outcome(0.05).unwrap();

    let weights_before = engine.weight_snapshot();
    let history_before = engine.decision_records();

    engine.set_scorer(Arc::new(FailingScorer::new("model offline")));
    let err = engine.explain(&FEATURES).unwrap_err();

    assert!(matches!(err, EnsembleError::ExplanationFailed { .. }));
    assert_eq!(engine.weight_snapshot(), weights_before);
    assert_eq!(engine.decision_records(), history_before);
}

#[test]
fn test_missing_scorer_is_reported() {
    let engine = engine();
    assert!(matches!(
        engine.explain(&FEATURES),
        Err(EnsembleError::UninitializedModel { .. })
    ));
}

#[test]
fn test_invalid_features_rejected() {
    let engine = engine();
    engine.set_scorer(Arc::new(linear()));

    assert!(matches!(
        engine.explain(&[]),
        Err(EnsembleError::InvalidInput { .. })
    ));
    assert!(matches!(
        engine.explain(&[0.1, f64::INFINITY, 0.3]),
        Err(EnsembleError::InvalidInput { .. })
    ));
}

#[test]
fn test_cancelled_explanation() {
    let engine = engine();
    let token = CancellationToken::new();
    token.cancel();

    let err = engine.explain_with(&FEATURES, &linear(), &token).unwrap_err();

    assert!(matches!(err, EnsembleError::ExplanationCancelled));
}

#[test]
fn test_cancelled_explanation_stops_scoring() {
    let engine = engine();
    let scorer = CountingScorer::new(vec![0.6, 0.8, 0.1]);
    let token = CancellationToken::new();
    token.cancel();

    let err = engine.explain_with(&FEATURES, &scorer, &token).unwrap_err();

    assert!(matches!(err, EnsembleError::ExplanationCancelled));
    // only the initial score runs, no sampling
    assert_eq!(scorer.calls(), 1);

    let scorer = CountingScorer::new(vec![0.6, 0.8, 0.1]);
    engine
        .explain_with(&FEATURES, &scorer, &CancellationToken::new())
        .unwrap();
    assert!(scorer.calls() > 1);
}

#[test]
fn test_explanations_are_reproducible() {
    let engine = engine();
    engine.set_scorer(Arc::new(linear()));

    let first = engine.explain(&FEATURES).unwrap();
    let second = engine.explain(&FEATURES).unwrap();

    assert_eq!(first, second);
}
