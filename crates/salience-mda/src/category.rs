//! Category-level importance shares.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::dataset::FeatureMetadata;
use crate::stats::FeatureImportanceRecord;

/// Summed importance of one category for one target.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryImportance {
    /// Category label.
    pub category: String,
    /// Sum of member features' mean importance.
    pub importance_sum: f64,
    /// Fraction of the summed importance of all categorized features.
    pub share: f64,
    /// `share * 100`.
    pub percentage: f64,
    /// Number of member features.
    pub feature_count: usize,
    /// Member feature names, in declaration order.
    pub features: Vec<String>,
}

/// Features with no category; excluded from shares.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnclassifiedImportance {
    /// Sum of their mean importance.
    pub importance_sum: f64,
    /// Their names, in declaration order.
    pub features: Vec<String>,
}

/// Category breakdown for one target.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    /// One entry per category present in the map, sorted by name.
    pub categories: Vec<CategoryImportance>,
    /// The implicit bucket for unmapped features.
    pub unclassified: UnclassifiedImportance,
}

/// Sum mean importance within each category.
///
/// Shares are taken over categorized features only; when their total is not
/// positive every share is zero.
#[must_use]
pub fn aggregate_categories(
    records: &[FeatureImportanceRecord],
    metadata: &FeatureMetadata,
) -> CategoryBreakdown {
    let mut sums: BTreeMap<&str, (f64, Vec<String>)> = BTreeMap::new();
    let mut unclassified = UnclassifiedImportance::default();

    for record in records {
        match metadata.category_of(&record.feature) {
            Some(category) => {
                let entry = sums.entry(category).or_default();
                entry.0 += record.mean_importance;
                entry.1.push(record.feature.clone());
            }
            None => {
                unclassified.importance_sum += record.mean_importance;
                unclassified.features.push(record.feature.clone());
            }
        }
    }

    let denominator: f64 = sums.values().map(|(sum, _)| sum).sum();
    let categories = sums
        .into_iter()
        .map(|(category, (importance_sum, features))| {
            let share = if denominator > 0.0 {
                importance_sum / denominator
            } else {
                0.0
            };
            CategoryImportance {
                category: category.to_string(),
                importance_sum,
                share,
                percentage: share * 100.0,
                feature_count: features.len(),
                features,
            }
        })
        .collect();

    CategoryBreakdown {
        categories,
        unclassified,
    }
}
