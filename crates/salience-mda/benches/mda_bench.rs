//! Criterion benchmarks for salience-mda: permutation and full analysis.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use salience_forest::{ForestConfig, Outcome};
use salience_mda::{
    AnalysisConfig, Analyzer, Budget, FeatureMatrix, FeatureMetadata, TargetVariable,
    permutation_samples,
};

fn make_survey(n_samples: usize, n_features: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<usize>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let labels: Vec<usize> = (0..n_samples).map(|i| i % 2).collect();
    let rows = labels
        .iter()
        .map(|&l| {
            (0..n_features)
                .map(|f| {
                    let base = if f < 2 { l as f64 * 2.0 } else { 0.0 };
                    base + rng.r#gen::<f64>()
                })
                .collect()
        })
        .collect();
    (rows, labels)
}

fn bench_permutation(c: &mut Criterion) {
    let (rows, labels) = make_survey(200, 20, 42);
    let names: Vec<String> = (0..20).map(|f| format!("q{f}")).collect();
    let outcome = Outcome::Classes {
        labels: &labels,
        n_classes: 2,
    };
    let forest = ForestConfig::new(50)
        .unwrap()
        .with_max_depth(Some(10))
        .fit(&rows, outcome, &names)
        .unwrap();
    let budget = Budget::unbounded();

    c.bench_function("permutation_200x20_10reps_50trees", |b| {
        b.iter(|| permutation_samples(&forest, &rows, outcome, 10, 7, &budget).unwrap());
    });
}

fn bench_analysis(c: &mut Criterion) {
    let (rows, labels) = make_survey(150, 12, 7);
    let names: Vec<String> = (0..12).map(|f| format!("q{f}")).collect();
    let buy: Vec<f64> = labels.iter().map(|&l| l as f64).collect();
    let recommend: Vec<f64> = labels.iter().map(|&l| 1.0 - l as f64).collect();
    let analyzer = Analyzer::new(AnalysisConfig::new().with_n_estimators(30));

    c.bench_function("analysis_150x12_2targets_30trees", |b| {
        b.iter(|| {
            analyzer
                .analyze(
                    FeatureMatrix::new(rows.clone()),
                    FeatureMetadata::new(names.clone()),
                    vec![
                        TargetVariable::numeric("buy", buy.clone()),
                        TargetVariable::numeric("recommend", recommend.clone()),
                    ],
                )
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_permutation, bench_analysis);
criterion_main!(benches);
