use signal_ensemble::application::EnsembleEngine;
use signal_ensemble::config::EngineConfig;
use signal_ensemble::domain::ensemble::{AggregationMethod, WeightPartition};
use signal_ensemble::domain::errors::EnsembleError;
use signal_ensemble::domain::ml::SoftmaxMetaLearner;
use signal_ensemble::domain::signal::SignalAction;
use signal_ensemble::infrastructure::mock::{signal, split_batch};

/// Test: a profitable BUY rewards BUY voters and penalizes SELL voters
#[test]
fn test_positive_outcome_after_buy() {
    let engine = EnsembleEngine::new(EngineConfig::default());
    let decision = engine
        .aggregate(&split_batch(), AggregationMethod::PerformanceWeighted, None)
        .unwrap();
    assert_eq!(decision.action, SignalAction::Buy);

    let report = engine.record_outcome(0.05).unwrap();

    assert!(report.ensemble_correct);
    assert_eq!(report.category, SignalAction::Buy);
    let perf = WeightPartition::Performance;
    assert!((engine.weight(&perf, "lstm") - 0.55).abs() < 1e-12);
    assert!((engine.weight(&perf, "xgboost") - 0.55).abs() < 1e-12);
    assert!((engine.weight(&perf, "transformer") - 0.45).abs() < 1e-12);
}

#[test]
fn test_weights_stay_within_bounds() {
    let engine = EnsembleEngine::new(EngineConfig::default());

    for _ in 0..40 {
        engine
            .aggregate(&split_batch(), AggregationMethod::PerformanceWeighted, None)
            .unwrap();
        engine.record_outcome(0.05).unwrap();
    }

    let snapshot = engine.weight_snapshot();
    for weight in snapshot.performance.values() {
        assert!((0.1..=1.0).contains(weight), "weight {weight} escaped bounds");
    }
    assert_eq!(snapshot.get(&WeightPartition::Performance, "lstm"), 1.0);
    assert_eq!(snapshot.get(&WeightPartition::Performance, "transformer"), 0.1);
}

#[test]
fn test_bayesian_updates_evidence_partition_only() {
    let engine = EnsembleEngine::new(EngineConfig::default());
    engine
        .aggregate(&split_batch(), AggregationMethod::Bayesian, None)
        .unwrap();

    engine.record_outcome(-0.05).unwrap();

    assert!((engine.weight(&WeightPartition::Bayesian, "transformer") - 0.55).abs() < 1e-12);
    assert!((engine.weight(&WeightPartition::Bayesian, "lstm") - 0.45).abs() < 1e-12);
    assert!(engine.weight_snapshot().performance.is_empty());
}

#[test]
fn test_contextual_update_is_regime_scoped() {
    let engine = EnsembleEngine::new(EngineConfig::default());
    let signals: Vec<_> = split_batch()
        .into_iter()
        .map(|s| s.with_regime("trending"))
        .collect();

    engine
        .aggregate(&signals, AggregationMethod::DynamicContextual, None)
        .unwrap();
    engine.record_outcome(0.05).unwrap();

    let trending = WeightPartition::regime("trending");
    assert!((engine.weight(&trending, "lstm") - 0.525).abs() < 1e-12);
    assert!((engine.weight(&trending, "transformer") - 0.475).abs() < 1e-12);
    assert_eq!(engine.weight(&WeightPartition::regime("ranging"), "lstm"), 0.5);
}

#[test]
fn test_majority_vote_outcome_changes_nothing() {
    let engine = EnsembleEngine::new(EngineConfig::default());
    engine
        .aggregate(&split_batch(), AggregationMethod::MajorityVote, None)
        .unwrap();

    let report = engine.record_outcome(0.05).unwrap();

    assert!(report.weight_changes.is_empty());
    assert_eq!(engine.weight_snapshot().version, 0);
}

#[test]
fn test_stacking_learns_from_outcomes() {
    let engine = EnsembleEngine::new(EngineConfig::default());
    engine.set_meta_learner(Box::new(SoftmaxMetaLearner::new(32)));

    let signals = vec![
        signal("a", SignalAction::Sell, 0.8),
        signal("b", SignalAction::Sell, 0.7),
    ];

    let mut losses = Vec::new();
    for _ in 0..10 {
        engine
            .aggregate(&signals, AggregationMethod::Stacking, None)
            .unwrap();
        let report = engine.record_outcome(-0.04).unwrap();
        losses.push(report.meta_loss.unwrap());
    }

    assert!(losses.last().unwrap() < losses.first().unwrap());
    assert_eq!(engine.meta_learner_version(), Some(11));

    let decision = engine
        .aggregate(&signals, AggregationMethod::Stacking, None)
        .unwrap();
    assert_eq!(decision.action, SignalAction::Sell);
}

#[test]
fn test_outcome_for_older_decision() {
    let engine = EnsembleEngine::new(EngineConfig::default());
    engine
        .aggregate(&split_batch(), AggregationMethod::PerformanceWeighted, None)
        .unwrap();
    engine
        .aggregate(&split_batch(), AggregationMethod::MajorityVote, None)
        .unwrap();

    let first = engine.decision_records()[0].sequence;
    let report = engine.record_outcome_for(first, 0.05).unwrap();

    assert_eq!(report.method, AggregationMethod::PerformanceWeighted);
    assert_eq!(engine.decision_records()[1].outcome, None);
}

#[test]
fn test_outcome_errors() {
    let engine = EnsembleEngine::new(EngineConfig::default());
    assert!(matches!(
        engine.record_outcome(0.05),
        Err(EnsembleError::InvalidInput { .. })
    ));

    engine
        .aggregate(&split_batch(), AggregationMethod::PerformanceWeighted, None)
        .unwrap();
    assert!(matches!(
        engine.record_outcome(f64::NAN),
        Err(EnsembleError::InvalidInput { .. })
    ));
    assert!(matches!(
        engine.record_outcome_for(999, 0.05),
        Err(EnsembleError::InvalidInput { .. })
    ));
    // rejected calls leave the decision open
    assert!(engine.record_outcome(0.05).is_ok());
}

#[test]
fn test_history_is_bounded() {
    let mut config = EngineConfig::default();
    config.history.capacity = 3;
    let engine = EnsembleEngine::new(config);

    for _ in 0..5 {
        engine
            .aggregate(&split_batch(), AggregationMethod::MajorityVote, None)
            .unwrap();
    }

    let records = engine.decision_records();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].sequence, 2);
    assert!(matches!(
        engine.record_outcome_for(0, 0.01),
        Err(EnsembleError::InvalidInput { .. })
    ));
}
