//! Universal predictors: features significant for more than one target.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::stats::FeatureImportanceRecord;

/// A feature flagged significant for several targets.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossTargetInsight {
    /// Feature name.
    pub feature: String,
    /// Declared column position.
    pub feature_index: usize,
    /// Targets in which it is significant, sorted by name.
    pub targets: Vec<String>,
    /// `targets.len()`.
    pub target_count: usize,
    /// Mean of its mean importance across those targets.
    pub mean_importance: f64,
}

/// Rank features significant in more than one target.
///
/// `per_target` maps each successfully aggregated target to its full
/// (uncapped) significant records. Ranking is by target count descending,
/// then mean importance descending, then declaration order, so the result is
/// independent of the order targets were supplied in.
#[must_use]
pub fn universal_predictors<'a>(
    per_target: &BTreeMap<&'a str, Vec<&'a FeatureImportanceRecord>>,
) -> Vec<CrossTargetInsight> {
    // feature_index -> (name, targets, summed importance)
    let mut by_feature: BTreeMap<usize, (&str, Vec<String>, f64)> = BTreeMap::new();
    for (&target, records) in per_target {
        for record in records {
            let entry = by_feature
                .entry(record.feature_index)
                .or_insert_with(|| (record.feature.as_str(), Vec::new(), 0.0));
            entry.1.push(target.to_string());
            entry.2 += record.mean_importance;
        }
    }

    let mut insights: Vec<CrossTargetInsight> = by_feature
        .into_iter()
        .filter(|(_, (_, targets, _))| targets.len() > 1)
        .map(|(feature_index, (feature, targets, sum))| CrossTargetInsight {
            feature: feature.to_string(),
            feature_index,
            target_count: targets.len(),
            mean_importance: sum / targets.len() as f64,
            targets,
        })
        .collect();

    insights.sort_by(|a, b| {
        b.target_count
            .cmp(&a.target_count)
            .then(b.mean_importance.total_cmp(&a.mean_importance))
            .then(a.feature_index.cmp(&b.feature_index))
    });
    insights
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: usize, mean: f64) -> FeatureImportanceRecord {
        FeatureImportanceRecord {
            feature: format!("f{index}"),
            feature_index: index,
            mean_importance: mean,
            std_dev: 0.0,
            ci_lower: mean,
            ci_upper: mean,
            rank: 1,
            significant: true,
            samples: vec![mean],
        }
    }

    #[test]
    fn ranks_by_breadth_then_mean() {
        let a = [record(0, 0.1), record(1, 0.3), record(2, 0.2)];
        let b = [record(0, 0.1), record(1, 0.3), record(3, 0.5)];
        let c = [record(0, 0.1), record(3, 0.6)];
        let per_target: BTreeMap<&str, Vec<&FeatureImportanceRecord>> = BTreeMap::from([
            ("a", a.iter().collect()),
            ("b", b.iter().collect()),
            ("c", c.iter().collect()),
        ]);

        let insights = universal_predictors(&per_target);
        let order: Vec<&str> = insights.iter().map(|i| i.feature.as_str()).collect();
        assert_eq!(order, ["f0", "f3", "f1"]);
        assert_eq!(insights[0].targets, ["a", "b", "c"]);
        assert!((insights[1].mean_importance - 0.55).abs() < 1e-12);
        assert!(insights.iter().all(|i| i.feature != "f2"));
    }

    #[test]
    fn single_target_yields_nothing() {
        let a = [record(0, 0.4)];
        let per_target: BTreeMap<&str, Vec<&FeatureImportanceRecord>> =
            BTreeMap::from([("a", a.iter().collect())]);
        assert!(universal_predictors(&per_target).is_empty());
    }
}
