//! End-to-end scenarios for the importance engine.

use std::collections::BTreeMap;
use std::time::Duration;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use salience_mda::{
    AnalysisConfig, AnalysisError, Analyzer, CancellationToken, FeatureMatrix, FeatureMetadata,
    TargetError, TargetState, TargetVariable, TrainTestSplit, ValidationError,
};

// ---------------------------------------------------------------------------
// Helpers: deterministic survey-like datasets
// ---------------------------------------------------------------------------

/// `n` respondents; column 0 is the binary signal, the rest uniform noise.
fn signal_plus_noise(n: usize, n_features: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let signal: Vec<f64> = (0..n).map(|i| (i % 2) as f64).collect();
    let rows = signal
        .iter()
        .map(|&s| {
            let mut row = vec![s];
            row.extend((1..n_features).map(|_| rng.r#gen::<f64>() * 5.0));
            row
        })
        .collect();
    (rows, signal)
}

fn names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("f{i}")).collect()
}

fn config() -> AnalysisConfig {
    AnalysisConfig::new().with_n_estimators(50).with_seed(7)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn nine_samples_rejected_before_training() {
    let (rows, target) = signal_plus_noise(9, 3, 1);
    let err = Analyzer::new(config())
        .analyze(
            FeatureMatrix::new(rows),
            FeatureMetadata::new(names(3)),
            vec![TargetVariable::numeric("buy", target)],
        )
        .unwrap_err();

    let AnalysisError::Validation(inner) = &err else {
        panic!("expected a validation error, got {err}");
    };
    assert!(matches!(
        inner,
        ValidationError::TooFewSamples {
            n_samples: 9,
            min: 10
        }
    ));
    assert!(err.to_string().contains("10"));
}

#[test]
fn short_target_rejected_by_name() {
    let (rows, target) = signal_plus_noise(10, 3, 1);
    let err = Analyzer::new(config())
        .analyze(
            FeatureMatrix::new(rows),
            FeatureMetadata::new(names(3)),
            vec![
                TargetVariable::numeric("buy", target),
                TargetVariable::numeric("recommend", vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0]),
            ],
        )
        .unwrap_err();
    assert!(err.to_string().contains("\"recommend\""), "{err}");
    assert!(matches!(
        err,
        AnalysisError::Validation(ValidationError::TargetLengthMismatch { got: 8, .. })
    ));
}

#[test]
fn invalid_option_rejected() {
    let (rows, target) = signal_plus_noise(20, 3, 1);
    let err = Analyzer::new(config().with_mda_repetitions(1))
        .analyze(
            FeatureMatrix::new(rows),
            FeatureMetadata::new(names(3)),
            vec![TargetVariable::numeric("buy", target)],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::Validation(ValidationError::InvalidOption {
            name: "mdaRepetitions",
            ..
        })
    ));
}

// ---------------------------------------------------------------------------
// Importance
// ---------------------------------------------------------------------------

#[test]
fn perfect_predictor_ranks_first_and_noise_is_capped() {
    let (rows, target) = signal_plus_noise(30, 5, 11);
    let report = Analyzer::new(config())
        .analyze(
            FeatureMatrix::new(rows),
            FeatureMetadata::new(names(5)),
            vec![TargetVariable::numeric("buy", target)],
        )
        .unwrap();

    assert_eq!(report.summary.total_samples, 30);
    assert_eq!(report.summary.train_samples, 20);
    assert_eq!(report.summary.test_samples, 10);

    let result = report.targets["buy"].result().unwrap();
    let reported = &result.reported;
    assert_eq!(result.total_features, 5);
    assert_eq!(reported.total.len(), 5);
    assert_eq!(reported.significant[0].feature, "f0");
    assert_eq!(reported.total[0].rank, 1);
    assert!(reported.total[0].ci_lower > 0.1, "ci_lower {}", reported.total[0].ci_lower);
    assert!(reported.non_significant.len() <= 2);
    assert!(reported.significant.len() + reported.non_significant.len() <= 5);
}

#[test]
fn noise_feature_rarely_significant() {
    let mut flagged = 0;
    for seed in 0..5 {
        let (rows, target) = signal_plus_noise(60, 2, 100 + seed);
        let report = Analyzer::new(config().with_seed(seed))
            .analyze(
                FeatureMatrix::new(rows),
                FeatureMetadata::new(names(2)),
                vec![TargetVariable::numeric("buy", target)],
            )
            .unwrap();
        let noise = &report.targets["buy"].result().unwrap().reported.total[1];
        assert!(noise.mean_importance.abs() < 0.15, "noise mean {}", noise.mean_importance);
        if noise.significant {
            flagged += 1;
        }
    }
    assert!(flagged <= 1, "noise flagged significant in {flagged}/5 runs");
}

#[test]
fn regression_target_uses_r2() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let rows: Vec<Vec<f64>> = (0..60)
        .map(|_| vec![rng.r#gen::<f64>() * 10.0, rng.r#gen::<f64>()])
        .collect();
    let spend: Vec<f64> = rows.iter().map(|r| 3.0 * r[0] + 0.5).collect();

    let report = Analyzer::new(config())
        .analyze(
            FeatureMatrix::new(rows),
            FeatureMetadata::new(vec!["income".to_string(), "noise".to_string()]),
            vec![TargetVariable::numeric("spend", spend)],
        )
        .unwrap();

    let result = report.targets["spend"].result().unwrap();
    assert_eq!(result.performance.metric, "r2");
    assert_eq!(result.reported.significant[0].feature, "income");
}

#[test]
fn same_seed_is_reproducible() {
    let run = || {
        let (rows, target) = signal_plus_noise(30, 4, 3);
        Analyzer::new(config())
            .analyze(
                FeatureMatrix::new(rows),
                FeatureMetadata::new(names(4)),
                vec![TargetVariable::numeric("buy", target)],
            )
            .unwrap()
    };
    let a = run();
    let b = run();
    assert_eq!(
        a.targets["buy"].result().unwrap().reported.total,
        b.targets["buy"].result().unwrap().reported.total
    );
}

// ---------------------------------------------------------------------------
// Categories and cross-target synthesis
// ---------------------------------------------------------------------------

#[test]
fn category_sums_equal_member_means() {
    let (rows, target) = signal_plus_noise(40, 4, 21);
    let categories = BTreeMap::from([
        ("f0".to_string(), "pain".to_string()),
        ("f1".to_string(), "pain".to_string()),
        ("f2".to_string(), "pleasure".to_string()),
    ]);
    let report = Analyzer::new(config())
        .analyze(
            FeatureMatrix::new(rows),
            FeatureMetadata::new(names(4)).with_categories(categories),
            vec![TargetVariable::numeric("buy", target)],
        )
        .unwrap();

    let result = report.targets["buy"].result().unwrap();
    let mean = |name: &str| {
        result
            .reported
            .total
            .iter()
            .find(|r| r.feature == name)
            .unwrap()
            .mean_importance
    };
    let pain = &result.categories.categories[0];
    let pleasure = &result.categories.categories[1];
    assert_eq!(pain.category, "pain");
    assert!((pain.importance_sum - (mean("f0") + mean("f1"))).abs() < 1e-12);
    assert!((pleasure.importance_sum - mean("f2")).abs() < 1e-12);
    assert_eq!(result.categories.unclassified.features, ["f3"]);
    assert!((result.categories.unclassified.importance_sum - mean("f3")).abs() < 1e-12);
}

#[test]
fn universal_predictors_invariant_to_target_order() {
    let (rows, buy) = signal_plus_noise(40, 4, 8);
    let recommend: Vec<f64> = buy.iter().map(|v| 1.0 - v).collect();
    let targets = vec![
        TargetVariable::numeric("buy", buy),
        TargetVariable::numeric("recommend", recommend),
    ];
    let mut reversed = targets.clone();
    reversed.reverse();

    let run = |targets: Vec<TargetVariable>| {
        Analyzer::new(config())
            .analyze(
                FeatureMatrix::new(rows.clone()),
                FeatureMetadata::new(names(4)),
                targets,
            )
            .unwrap()
            .universal_predictors
    };

    let forward = run(targets);
    let backward = run(reversed);
    assert_eq!(forward, backward);
    assert_eq!(forward[0].feature, "f0");
    assert_eq!(forward[0].targets, ["buy", "recommend"]);
    assert_eq!(forward[0].target_count, 2);
}

// ---------------------------------------------------------------------------
// Per-target failure and request-wide aborts
// ---------------------------------------------------------------------------

#[test]
fn unmodellable_target_fails_alone() {
    let (rows, buy) = signal_plus_noise(30, 3, 4);
    let cfg = config();
    let split = TrainTestSplit::new(30, cfg.train_ratio(), cfg.seed()).unwrap();
    let loner = split.test()[0];
    // Class "2" appears once, in the test split.
    let tier: Vec<f64> = (0..30)
        .map(|i| if i == loner { 2.0 } else { (i % 2) as f64 })
        .collect();

    let report = Analyzer::new(cfg)
        .analyze(
            FeatureMatrix::new(rows),
            FeatureMetadata::new(names(3)),
            vec![
                TargetVariable::numeric("buy", buy),
                TargetVariable::numeric("tier", tier),
            ],
        )
        .unwrap();

    assert_eq!(report.summary.successful_targets, 1);
    assert_eq!(report.summary.failed_targets, 1);
    assert_eq!(report.targets["buy"].state(), TargetState::Aggregated);
    let tier = &report.targets["tier"];
    assert_eq!(tier.state(), TargetState::Failed);
    let salience_mda::TargetOutcome::Failed { note, error } = tier else {
        panic!("expected failure");
    };
    assert!(note.contains("tier"));
    assert!(matches!(error, TargetError::InsufficientData(e) if e.n_test == 10));
}

#[test]
fn cancelled_token_aborts_request() {
    let (rows, target) = signal_plus_noise(20, 3, 2);
    let token = CancellationToken::new();
    token.cancel();
    let err = Analyzer::new(config())
        .with_cancellation(token)
        .analyze(
            FeatureMatrix::new(rows),
            FeatureMetadata::new(names(3)),
            vec![TargetVariable::numeric("buy", target)],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::Cancelled {
            completed_targets: 0,
            total_targets: 1
        }
    ));
}

#[test]
fn elapsed_time_limit_is_resource_exhausted() {
    let (rows, target) = signal_plus_noise(20, 3, 2);
    let err = Analyzer::new(config().with_time_limit(Some(Duration::from_nanos(1))))
        .analyze(
            FeatureMatrix::new(rows),
            FeatureMetadata::new(names(3)),
            vec![TargetVariable::numeric("buy", target)],
        )
        .unwrap_err();
    assert!(matches!(err, AnalysisError::ResourceExhausted { .. }), "{err}");
}
