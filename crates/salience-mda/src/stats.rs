//! Mean, spread, confidence interval and rank per feature.

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::error::ValidationError;
use crate::permutation::ImportanceSample;

/// Aggregated importance of one feature for one target.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureImportanceRecord {
    /// Declared feature name.
    pub feature: String,
    /// Declared column position.
    pub feature_index: usize,
    /// Arithmetic mean of the samples.
    pub mean_importance: f64,
    /// Sample standard deviation (n - 1 denominator).
    pub std_dev: f64,
    /// Lower confidence bound.
    pub ci_lower: f64,
    /// Upper confidence bound.
    pub ci_upper: f64,
    /// 1-based rank by mean importance.
    pub rank: usize,
    /// `ci_lower > 0`.
    pub significant: bool,
    /// Raw per-repetition deltas.
    pub samples: Vec<f64>,
}

/// Two-sided Student-t critical value for `repetitions` samples at level `alpha`.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidOption`] for fewer than 2 repetitions or
/// an `alpha` outside `(0, 1)`.
pub fn t_critical(alpha: f64, repetitions: usize) -> Result<f64, ValidationError> {
    if repetitions < 2 {
        return Err(ValidationError::InvalidOption {
            name: "mdaRepetitions",
            value: repetitions.to_string(),
            reason: "must be at least 2 for a confidence interval",
        });
    }
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(ValidationError::InvalidOption {
            name: "significanceThreshold",
            value: alpha.to_string(),
            reason: "must be in (0, 1)",
        });
    }
    let dist = StudentsT::new(0.0, 1.0, (repetitions - 1) as f64).map_err(|_| {
        ValidationError::InvalidOption {
            name: "mdaRepetitions",
            value: repetitions.to_string(),
            reason: "does not yield a valid t distribution",
        }
    })?;
    Ok(dist.inverse_cdf(1.0 - alpha / 2.0))
}

fn mean_and_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var.sqrt())
}

/// Turn per-feature samples into ranked records.
///
/// `samples[i]` belongs to `feature_names[i]`. The returned records are in
/// declaration order; `rank` orders them by mean importance descending, ties
/// kept in declaration order.
///
/// # Errors
///
/// Returns the errors of [`t_critical`].
pub fn aggregate(
    feature_names: &[String],
    samples: &[Vec<ImportanceSample>],
    alpha: f64,
) -> Result<Vec<FeatureImportanceRecord>, ValidationError> {
    let repetitions = samples.first().map_or(0, Vec::len);
    let t = t_critical(alpha, repetitions)?;

    let mut records: Vec<FeatureImportanceRecord> = feature_names
        .iter()
        .zip(samples)
        .enumerate()
        .map(|(feature_index, (name, feature_samples))| {
            let deltas: Vec<f64> = feature_samples.iter().map(|s| s.delta).collect();
            let (mean, std_dev) = mean_and_std(&deltas);
            let half_width = t * std_dev / (deltas.len() as f64).sqrt();
            let ci_lower = mean - half_width;
            FeatureImportanceRecord {
                feature: name.clone(),
                feature_index,
                mean_importance: mean,
                std_dev,
                ci_lower,
                ci_upper: mean + half_width,
                rank: 0,
                significant: ci_lower > 0.0,
                samples: deltas,
            }
        })
        .collect();

    for (position, index) in rank_order(&records).into_iter().enumerate() {
        records[index].rank = position + 1;
    }
    Ok(records)
}

/// Indices of `records` sorted by mean importance descending, stable.
#[must_use]
pub fn rank_order(records: &[FeatureImportanceRecord]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by(|&a, &b| {
        records[b]
            .mean_importance
            .total_cmp(&records[a].mean_importance)
    });
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(feature_index: usize, deltas: &[f64]) -> Vec<ImportanceSample> {
        deltas
            .iter()
            .enumerate()
            .map(|(repetition, &delta)| ImportanceSample {
                feature_index,
                repetition,
                delta,
            })
            .collect()
    }

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{i}")).collect()
    }

    #[test]
    fn t_critical_matches_tables() {
        // t(0.995, 9) = 3.2498, t(0.975, 4) = 2.7764
        assert!((t_critical(0.01, 10).unwrap() - 3.2498).abs() < 1e-3);
        assert!((t_critical(0.05, 5).unwrap() - 2.7764).abs() < 1e-3);
    }

    #[test]
    fn t_critical_rejects_single_repetition() {
        assert!(t_critical(0.01, 1).is_err());
        assert!(t_critical(1.5, 10).is_err());
    }

    #[test]
    fn sample_std_uses_n_minus_one() {
        let (mean, std) = mean_and_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((mean - 5.0).abs() < 1e-12);
        assert!((std - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn consistent_positive_importance_is_significant() {
        let records = aggregate(
            &names(2),
            &[
                samples(0, &[0.30, 0.32, 0.28, 0.31, 0.29]),
                samples(1, &[0.05, -0.04, 0.0, 0.02, -0.03]),
            ],
            0.01,
        )
        .unwrap();
        assert!(records[0].significant);
        assert!(records[0].ci_lower > 0.0);
        assert!(!records[1].significant);
        assert!(records[1].ci_lower < 0.0 && records[1].ci_upper > 0.0);
        assert_eq!(records[0].rank, 1);
        assert_eq!(records[1].rank, 2);
    }

    #[test]
    fn zero_variance_positive_mean_is_significant() {
        let records = aggregate(&names(2), &[samples(0, &[0.1; 4]), samples(1, &[0.0; 4])], 0.01)
            .unwrap();
        assert!(records[0].significant);
        assert!(!records[1].significant);
        assert_eq!(records[0].std_dev, 0.0);
    }

    #[test]
    fn ties_keep_declaration_order() {
        let records = aggregate(
            &names(3),
            &[
                samples(0, &[0.0, 0.0]),
                samples(1, &[0.2, 0.2]),
                samples(2, &[0.0, 0.0]),
            ],
            0.01,
        )
        .unwrap();
        let ranks: Vec<usize> = records.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, [2, 1, 3]);
    }
}
