use signal_ensemble::application::EnsembleEngine;
use signal_ensemble::config::EngineConfig;
use signal_ensemble::domain::ensemble::AggregationMethod;
use signal_ensemble::domain::errors::EnsembleError;
use signal_ensemble::domain::ml::SoftmaxMetaLearner;
use signal_ensemble::domain::signal::{ModelSignal, RiskLevel, SignalAction};
use signal_ensemble::infrastructure::mock::signal;

fn scenario_signals() -> Vec<ModelSignal> {
    vec![
        signal("m1", SignalAction::Buy, 0.9).with_accuracy(0.8),
        signal("m2", SignalAction::Buy, 0.8).with_accuracy(0.7),
        signal("m3", SignalAction::Sell, 0.6).with_accuracy(0.5),
    ]
}

fn engine_with_learner() -> EnsembleEngine {
    let engine = EnsembleEngine::new(EngineConfig::default());
    engine.set_meta_learner(Box::new(SoftmaxMetaLearner::with_vote_prior(32, 2.0)));
    engine
}

#[test]
fn test_majority_vote_two_of_three() {
    let engine = EnsembleEngine::new(EngineConfig::default());

    let result = engine
        .aggregate(&scenario_signals(), AggregationMethod::MajorityVote, None)
        .unwrap();

    assert_eq!(result.action, SignalAction::Buy);
    assert!((result.consensus_level - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(result.method, AggregationMethod::MajorityVote);
}

#[test]
fn test_performance_weighting_raises_consensus() {
    let engine = EnsembleEngine::new(EngineConfig::default());
    let signals = scenario_signals();

    let majority = engine
        .aggregate(&signals, AggregationMethod::MajorityVote, None)
        .unwrap();
    let weighted = engine
        .aggregate(&signals, AggregationMethod::PerformanceWeighted, None)
        .unwrap();

    assert_eq!(weighted.action, SignalAction::Buy);
    assert!(weighted.consensus_level > majority.consensus_level);
    assert!(weighted.consensus_level > 2.0 / 3.0);
}

#[test]
fn test_empty_batch_rejected_for_every_method() {
    let engine = engine_with_learner();

    for method in AggregationMethod::ALL {
        let err = engine.aggregate(&[], method, None).unwrap_err();
        assert!(
            matches!(err, EnsembleError::InvalidInput { .. }),
            "{method} accepted an empty batch"
        );
    }
    assert!(engine.history().is_empty());
}

#[test]
fn test_distribution_sums_to_one_for_every_method() {
    let engine = engine_with_learner();
    let signals = vec![
        signal("a", SignalAction::Buy, 0.7).with_regime("trending"),
        signal("b", SignalAction::Sell, 0.4).with_regime("trending"),
        signal("c", SignalAction::Hold, 0.9).with_regime("ranging"),
        signal("d", SignalAction::Buy, 0.2).with_regime("trending"),
    ];

    for method in AggregationMethod::ALL {
        let result = engine.aggregate(&signals, method, None).unwrap();
        let dist = result.probability_distribution;
        assert!((dist.sum() - 1.0).abs() < 1e-9, "{method}: {dist:?}");
        assert!((0.0..=1.0).contains(&result.confidence));
        assert!((0.0..=1.0).contains(&result.uncertainty));
        assert!((0.0..=1.0).contains(&result.diversity_score));
    }
}

#[test]
fn test_identical_batches_give_identical_decisions() {
    let engine = engine_with_learner();
    let signals = scenario_signals();

    for method in AggregationMethod::ALL {
        let first = engine.aggregate(&signals, method, None).unwrap();
        let second = engine.aggregate(&signals, method, None).unwrap();
        assert_eq!(first, second, "{method} is not idempotent");
    }
}

#[test]
fn test_unanimous_and_evenly_split_batches() {
    let engine = EnsembleEngine::new(EngineConfig::default());

    let unanimous = vec![
        signal("a", SignalAction::Sell, 0.8),
        signal("b", SignalAction::Sell, 0.7),
        signal("c", SignalAction::Sell, 0.9),
    ];
    let result = engine
        .aggregate(&unanimous, AggregationMethod::MajorityVote, None)
        .unwrap();
    assert_eq!(result.consensus_level, 1.0);
    assert_eq!(result.diversity_score, 0.0);
    assert_eq!(engine.latest_diversity().entropy, 0.0);

    let split = vec![
        signal("a", SignalAction::Buy, 0.8),
        signal("b", SignalAction::Sell, 0.8),
        signal("c", SignalAction::Hold, 0.8),
    ];
    let result = engine
        .aggregate(&split, AggregationMethod::MajorityVote, None)
        .unwrap();
    assert!((engine.latest_diversity().entropy - 3f64.log2()).abs() < 1e-9);
    assert!((result.diversity_score - 1.0).abs() < 1e-9);
    // tie resolves to BUY, low consensus widens uncertainty and raises risk
    assert_eq!(result.action, SignalAction::Buy);
    assert!(result.uncertainty >= 2.0 / 3.0);
    assert!(result.risk_assessment.level >= RiskLevel::Medium);
}

#[test]
fn test_low_confidence_batch_is_high_risk() {
    let engine = EnsembleEngine::new(EngineConfig::default());
    let signals = vec![
        signal("a", SignalAction::Buy, 0.2),
        signal("b", SignalAction::Buy, 0.3),
    ];

    let result = engine
        .aggregate(&signals, AggregationMethod::Bayesian, None)
        .unwrap();

    assert_eq!(result.risk_assessment.level, RiskLevel::High);
    assert!(
        result
            .risk_assessment
            .mitigations
            .contains(&"await stronger signal".to_string())
    );
}

#[test]
fn test_method_names_resolve() {
    let engine = EnsembleEngine::new(EngineConfig::default());
    let signals = scenario_signals();

    let result = engine
        .aggregate_by_name(&signals, "majority", None)
        .unwrap();
    assert_eq!(result.method, AggregationMethod::MajorityVote);

    let err = engine
        .aggregate_by_name(&signals, "quantum", None)
        .unwrap_err();
    assert!(matches!(err, EnsembleError::UnknownStrategy { .. }));
}

#[test]
fn test_contextual_uses_dominant_regime() {
    let engine = EnsembleEngine::new(EngineConfig::default());
    let signals = vec![
        signal("a", SignalAction::Buy, 0.7).with_regime("Trending"),
        signal("b", SignalAction::Buy, 0.6).with_regime("trending"),
        signal("c", SignalAction::Sell, 0.9).with_regime("ranging"),
    ];

    let result = engine
        .aggregate(&signals, AggregationMethod::DynamicContextual, None)
        .unwrap();

    assert_eq!(result.regime.as_deref(), Some("trending"));
    assert_eq!(engine.decision_records()[0].regime.as_deref(), Some("trending"));
}

#[test]
fn test_json_batch_with_out_of_range_scores_rejected() {
    let engine = EnsembleEngine::new(EngineConfig::default());
    let json = r#"[
        {"model_id": "a", "model_name": "a", "action": "BUY",
         "confidence": 2.0, "strength": 0.5, "probability": -1.0},
        {"model_id": "b", "model_name": "b", "action": "BUY",
         "confidence": 0.0, "strength": 0.0, "probability": 0.0}
    ]"#;
    let signals: Vec<ModelSignal> = serde_json::from_str(json).unwrap();

    for method in AggregationMethod::ALL {
        let err = engine.aggregate(&signals, method, None).unwrap_err();
        assert!(matches!(err, EnsembleError::InvalidInput { .. }), "{method}");
    }
    assert!(engine.history().is_empty());

    let valid = r#"[
        {"model_id": "a", "model_name": "a", "action": "SELL",
         "confidence": 0.9, "strength": 0.7, "probability": 0.8},
        {"model_id": "b", "model_name": "b", "action": "SELL",
         "confidence": 0.6, "strength": 0.5, "probability": 0.6}
    ]"#;
    let signals: Vec<ModelSignal> = serde_json::from_str(valid).unwrap();
    let result = engine
        .aggregate(&signals, AggregationMethod::MajorityVote, None)
        .unwrap();
    assert_eq!(result.action, SignalAction::Sell);
}

#[test]
fn test_cached_diversity_matches_deciding_signals() {
    let engine = EnsembleEngine::new(EngineConfig::default());
    let signals = vec![
        signal("a", SignalAction::Buy, 0.7).with_regime("trending"),
        signal("b", SignalAction::Sell, 0.6).with_regime("trending"),
        signal("c", SignalAction::Hold, 0.5).with_regime("trending"),
        signal("d", SignalAction::Buy, 0.4).with_regime("trending"),
    ];

    // three of four models are selected, one per action
    let result = engine
        .aggregate(&signals, AggregationMethod::DynamicContextual, None)
        .unwrap();
    let cached = engine.latest_diversity();
    assert!((cached.entropy - 3f64.log2()).abs() < 1e-9);
    assert!((result.diversity_score * 3f64.log2() - cached.entropy).abs() < 1e-9);

    // a width-8 learner only sees the first two signals
    engine.set_meta_learner(Box::new(SoftmaxMetaLearner::with_vote_prior(8, 2.0)));
    let stacked = vec![
        signal("a", SignalAction::Sell, 0.9),
        signal("b", SignalAction::Sell, 0.8),
        signal("c", SignalAction::Buy, 0.6),
    ];
    let result = engine
        .aggregate(&stacked, AggregationMethod::Stacking, None)
        .unwrap();
    assert_eq!(result.diversity_score, 0.0);
    assert_eq!(engine.latest_diversity().entropy, 0.0);
}
