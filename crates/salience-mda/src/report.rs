//! Reporting caps on the features surfaced per target.

use serde::Serialize;

use crate::stats::{FeatureImportanceRecord, rank_order};

/// The capped view of one target's records, plus the full audit list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedFeatures {
    /// Top significant records in rank order.
    pub significant: Vec<FeatureImportanceRecord>,
    /// Top non-significant records in rank order.
    pub non_significant: Vec<FeatureImportanceRecord>,
    /// Every record, in declaration order.
    pub total: Vec<FeatureImportanceRecord>,
}

impl ReportedFeatures {
    /// Apply the caps to `records` (in declaration order).
    #[must_use]
    pub fn new(
        records: Vec<FeatureImportanceRecord>,
        max_significant: usize,
        max_non_significant: usize,
    ) -> Self {
        let ranked: Vec<&FeatureImportanceRecord> =
            rank_order(&records).into_iter().map(|i| &records[i]).collect();

        let significant = ranked
            .iter()
            .filter(|r| r.significant)
            .take(max_significant)
            .map(|&r| r.clone())
            .collect();
        let non_significant = ranked
            .iter()
            .filter(|r| !r.significant)
            .take(max_non_significant)
            .map(|&r| r.clone())
            .collect();

        Self {
            significant,
            non_significant,
            total: records,
        }
    }

    /// Every significant record, uncapped, in rank order.
    pub fn all_significant(&self) -> impl Iterator<Item = &FeatureImportanceRecord> {
        let mut ranked: Vec<&FeatureImportanceRecord> =
            self.total.iter().filter(|r| r.significant).collect();
        ranked.sort_by_key(|r| r.rank);
        ranked.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: usize, mean: f64, significant: bool, rank: usize) -> FeatureImportanceRecord {
        FeatureImportanceRecord {
            feature: format!("f{index}"),
            feature_index: index,
            mean_importance: mean,
            std_dev: 0.0,
            ci_lower: if significant { mean } else { -1.0 },
            ci_upper: mean,
            rank,
            significant,
            samples: vec![mean],
        }
    }

    #[test]
    fn caps_apply_per_partition() {
        let records = vec![
            record(0, 0.01, false, 5),
            record(1, 0.40, true, 1),
            record(2, 0.02, false, 4),
            record(3, 0.30, true, 2),
            record(4, 0.03, false, 3),
            record(5, -0.01, false, 6),
        ];
        let reported = ReportedFeatures::new(records, 1, 2);

        let sig: Vec<&str> = reported.significant.iter().map(|r| r.feature.as_str()).collect();
        let non: Vec<&str> = reported
            .non_significant
            .iter()
            .map(|r| r.feature.as_str())
            .collect();
        assert_eq!(sig, ["f1"]);
        assert_eq!(non, ["f4", "f2"]);
        assert_eq!(reported.total.len(), 6);
        assert_eq!(reported.total[0].feature, "f0");

        let uncapped: Vec<&str> = reported.all_significant().map(|r| r.feature.as_str()).collect();
        assert_eq!(uncapped, ["f1", "f3"]);
    }
}
