use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use salience_forest::{ForestConfig, Outcome};

/// Likert-style answers (1..=5); the first three columns drive the label.
fn survey(n_rows: usize, n_columns: usize, n_classes: usize) -> (Vec<Vec<f64>>, Vec<usize>) {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut rows = Vec::with_capacity(n_rows);
    let mut labels = Vec::with_capacity(n_rows);
    for _ in 0..n_rows {
        let row: Vec<f64> = (0..n_columns)
            .map(|_| f64::from(rng.gen_range(1u8..=5)))
            .collect();
        let signal: f64 = row[..3].iter().sum::<f64>() - 3.0;
        labels.push(((signal / 12.0) * n_classes as f64).min(n_classes as f64 - 1.0) as usize);
        rows.push(row);
    }
    (rows, labels)
}

fn names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("q{i}")).collect()
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit");
    for n_rows in [200, 800] {
        let (rows, labels) = survey(n_rows, 25, 3);
        let outcome = Outcome::Classes {
            labels: &labels,
            n_classes: 3,
        };
        let config = ForestConfig::new(100).unwrap();
        let names = names(25);
        group.bench_with_input(BenchmarkId::from_parameter(n_rows), &n_rows, |b, _| {
            b.iter(|| config.fit(&rows, outcome, &names).unwrap());
        });
    }
    group.finish();
}

fn bench_score_held_out(c: &mut Criterion) {
    let (rows, labels) = survey(600, 25, 3);
    let (train, test) = rows.split_at(450);
    let (train_y, test_y) = labels.split_at(450);
    let forest = ForestConfig::new(100)
        .unwrap()
        .fit(
            train,
            Outcome::Classes {
                labels: train_y,
                n_classes: 3,
            },
            &names(25),
        )
        .unwrap();
    let test_outcome = Outcome::Classes {
        labels: test_y,
        n_classes: 3,
    };

    c.bench_function("score_150_rows", |b| {
        b.iter(|| forest.score(test, test_outcome).unwrap());
    });
}

criterion_group!(benches, bench_fit, bench_score_held_out);
criterion_main!(benches);
