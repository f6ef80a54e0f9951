//! Validated input: feature matrix, feature metadata and target variables.

use std::collections::{BTreeMap, BTreeSet};

use salience_forest::Outcome;

use crate::error::ValidationError;

/// Minimum number of samples an analysis accepts.
pub const MIN_SAMPLES: usize = 10;
/// Minimum number of feature columns an analysis accepts.
pub const MIN_FEATURES: usize = 2;
/// Integral numeric targets with at most this many levels are treated as classes.
pub const MAX_NUMERIC_CLASSES: usize = 20;

/// Row-major matrix of respondent features: `rows[sample][feature]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Wrap rows without checking them; [`Dataset::new`] validates.
    #[must_use]
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        Self { rows }
    }

    /// Return the rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Return the number of samples.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.rows.len()
    }

    /// Return the number of features (the first row's length).
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Copy out the rows at `indices`, in that order.
    #[must_use]
    pub fn select(&self, indices: &[usize]) -> Vec<Vec<f64>> {
        indices.iter().map(|&i| self.rows[i].clone()).collect()
    }
}

/// Column names plus the optional feature → category map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMetadata {
    feature_names: Vec<String>,
    categories: BTreeMap<String, String>,
}

impl FeatureMetadata {
    /// Create metadata with no category map.
    #[must_use]
    pub fn new(feature_names: Vec<String>) -> Self {
        Self {
            feature_names,
            categories: BTreeMap::new(),
        }
    }

    /// Attach a feature → category map.
    #[must_use]
    pub fn with_categories(mut self, categories: BTreeMap<String, String>) -> Self {
        self.categories = categories;
        self
    }

    /// Return the feature names in declaration order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the feature → category map.
    #[must_use]
    pub fn categories(&self) -> &BTreeMap<String, String> {
        &self.categories
    }

    /// Return the category of `feature`, if mapped.
    #[must_use]
    pub fn category_of(&self, feature: &str) -> Option<&str> {
        self.categories.get(feature).map(String::as_str)
    }
}

/// Raw values of one target, as supplied.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetValues {
    /// Numeric responses (ratings, flags, amounts).
    Numeric(Vec<f64>),
    /// Categorical responses.
    Categorical(Vec<String>),
}

impl TargetValues {
    /// Return the number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            TargetValues::Numeric(v) => v.len(),
            TargetValues::Categorical(v) => v.len(),
        }
    }

    /// Return `true` if there are no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named business outcome to explain.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetVariable {
    /// Target name, unique within a request.
    pub name: String,
    /// One value per sample.
    pub values: TargetValues,
}

impl TargetVariable {
    /// Create a numeric target.
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values: TargetValues::Numeric(values),
        }
    }

    /// Create a categorical target.
    pub fn categorical(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values: TargetValues::Categorical(values),
        }
    }
}

/// A target encoded for the forest.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedTarget {
    /// Zero-based labels; `class_names[label]` is the original value.
    Classes {
        /// Label per sample.
        labels: Vec<usize>,
        /// Original values in sorted order.
        class_names: Vec<String>,
    },
    /// Real-valued responses.
    Continuous(Vec<f64>),
}

impl EncodedTarget {
    /// Borrow as a forest outcome.
    #[must_use]
    pub fn as_outcome(&self) -> Outcome<'_> {
        match self {
            EncodedTarget::Classes {
                labels,
                class_names,
            } => Outcome::Classes {
                labels,
                n_classes: class_names.len(),
            },
            EncodedTarget::Continuous(values) => Outcome::Continuous(values),
        }
    }

    /// Copy out the entries at `indices`, keeping the full class list.
    #[must_use]
    pub fn select(&self, indices: &[usize]) -> EncodedTarget {
        match self {
            EncodedTarget::Classes {
                labels,
                class_names,
            } => EncodedTarget::Classes {
                labels: indices.iter().map(|&i| labels[i]).collect(),
                class_names: class_names.clone(),
            },
            EncodedTarget::Continuous(values) => {
                EncodedTarget::Continuous(indices.iter().map(|&i| values[i]).collect())
            }
        }
    }

    /// Return `true` for a classification target.
    #[must_use]
    pub fn is_classification(&self) -> bool {
        matches!(self, EncodedTarget::Classes { .. })
    }
}

/// A validated target with its encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTarget {
    /// Target name.
    pub name: String,
    /// Encoded values.
    pub encoded: EncodedTarget,
}

/// A matrix, its metadata and its targets, checked against each other.
///
/// Targets are held sorted by name so that every downstream computation is
/// independent of the order the caller declared them in.
#[derive(Debug, Clone)]
pub struct Dataset {
    matrix: FeatureMatrix,
    metadata: FeatureMetadata,
    targets: Vec<PreparedTarget>,
}

impl Dataset {
    /// Validate the inputs and encode each target.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ValidationError::TooFewSamples`] | fewer than 10 rows |
    /// | [`ValidationError::RaggedRow`] | a row's length differs from the first row's |
    /// | [`ValidationError::TooFewFeatures`] | fewer than 2 columns |
    /// | [`ValidationError::NonFiniteValue`] | a NaN or infinite matrix value |
    /// | [`ValidationError::FeatureNameCountMismatch`] | names and columns disagree |
    /// | [`ValidationError::EmptyFeatureName`] / [`ValidationError::DuplicateFeatureName`] | bad names |
    /// | [`ValidationError::UnknownCategoryFeature`] | category map names an undeclared feature |
    /// | [`ValidationError::NoTargets`] | no targets |
    /// | [`ValidationError::DuplicateTargetName`] | two targets share a name |
    /// | [`ValidationError::TargetLengthMismatch`] | a target's length differs from the sample count |
    /// | [`ValidationError::NonFiniteTarget`] | a numeric target holds NaN or infinity |
    /// | [`ValidationError::TargetTooHomogeneous`] | a target has fewer than 2 distinct values |
    pub fn new(
        matrix: FeatureMatrix,
        metadata: FeatureMetadata,
        targets: Vec<TargetVariable>,
    ) -> Result<Self, ValidationError> {
        validate_matrix(&matrix)?;
        validate_metadata(&metadata, matrix.n_features())?;

        if targets.is_empty() {
            return Err(ValidationError::NoTargets);
        }
        let mut seen = BTreeSet::new();
        let mut prepared = Vec::with_capacity(targets.len());
        for target in targets {
            if !seen.insert(target.name.clone()) {
                return Err(ValidationError::DuplicateTargetName { name: target.name });
            }
            prepared.push(prepare_target(target, matrix.n_samples())?);
        }
        prepared.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Self {
            matrix,
            metadata,
            targets: prepared,
        })
    }

    /// Return the feature matrix.
    #[must_use]
    pub fn matrix(&self) -> &FeatureMatrix {
        &self.matrix
    }

    /// Return the feature metadata.
    #[must_use]
    pub fn metadata(&self) -> &FeatureMetadata {
        &self.metadata
    }

    /// Return the feature names in declaration order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        self.metadata.feature_names()
    }

    /// Return the targets, sorted by name.
    #[must_use]
    pub fn targets(&self) -> &[PreparedTarget] {
        &self.targets
    }

    /// Return the number of samples.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.matrix.n_samples()
    }

    /// Return the number of features.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.matrix.n_features()
    }
}

fn validate_matrix(matrix: &FeatureMatrix) -> Result<(), ValidationError> {
    let n_samples = matrix.n_samples();
    if n_samples < MIN_SAMPLES {
        return Err(ValidationError::TooFewSamples {
            n_samples,
            min: MIN_SAMPLES,
        });
    }
    let expected = matrix.n_features();
    for (sample_index, row) in matrix.rows().iter().enumerate() {
        if row.len() != expected {
            return Err(ValidationError::RaggedRow {
                sample_index,
                expected,
                got: row.len(),
            });
        }
    }
    if expected < MIN_FEATURES {
        return Err(ValidationError::TooFewFeatures {
            n_features: expected,
            min: MIN_FEATURES,
        });
    }
    for (sample_index, row) in matrix.rows().iter().enumerate() {
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(ValidationError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }
    Ok(())
}

fn validate_metadata(metadata: &FeatureMetadata, columns: usize) -> Result<(), ValidationError> {
    let names = metadata.feature_names();
    if names.len() != columns {
        return Err(ValidationError::FeatureNameCountMismatch {
            names: names.len(),
            columns,
        });
    }
    let mut seen = BTreeSet::new();
    for (feature_index, name) in names.iter().enumerate() {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyFeatureName { feature_index });
        }
        if !seen.insert(name.as_str()) {
            return Err(ValidationError::DuplicateFeatureName { name: name.clone() });
        }
    }
    if let Some(feature) = metadata
        .categories()
        .keys()
        .find(|k| !seen.contains(k.as_str()))
    {
        return Err(ValidationError::UnknownCategoryFeature {
            feature: feature.clone(),
        });
    }
    Ok(())
}

fn prepare_target(target: TargetVariable, n_samples: usize) -> Result<PreparedTarget, ValidationError> {
    let TargetVariable { name, values } = target;
    if values.len() != n_samples {
        return Err(ValidationError::TargetLengthMismatch {
            target: name,
            expected: n_samples,
            got: values.len(),
        });
    }

    let encoded = match values {
        TargetValues::Categorical(values) => {
            let levels: BTreeSet<&str> = values.iter().map(String::as_str).collect();
            check_distinct(&name, levels.len())?;
            let class_names: Vec<String> = levels.into_iter().map(str::to_owned).collect();
            let labels = values
                .iter()
                .map(|v| class_names.binary_search(v).unwrap_or_default())
                .collect();
            EncodedTarget::Classes {
                labels,
                class_names,
            }
        }
        TargetValues::Numeric(values) => {
            if let Some(sample_index) = values.iter().position(|v| !v.is_finite()) {
                return Err(ValidationError::NonFiniteTarget {
                    target: name,
                    sample_index,
                });
            }
            // Adding 0.0 folds -0.0 into 0.0 before dedup.
            let mut levels: Vec<f64> = values.iter().map(|v| v + 0.0).collect();
            levels.sort_by(f64::total_cmp);
            levels.dedup();
            check_distinct(&name, levels.len())?;

            let integral = values.iter().all(|v| v.fract() == 0.0);
            if integral && levels.len() <= MAX_NUMERIC_CLASSES {
                let labels = values
                    .iter()
                    .map(|v| {
                        levels
                            .binary_search_by(|probe| probe.total_cmp(&(v + 0.0)))
                            .unwrap_or_default()
                    })
                    .collect();
                EncodedTarget::Classes {
                    labels,
                    class_names: levels.iter().map(|v| v.to_string()).collect(),
                }
            } else {
                EncodedTarget::Continuous(values)
            }
        }
    };

    Ok(PreparedTarget { name, encoded })
}

fn check_distinct(target: &str, distinct: usize) -> Result<(), ValidationError> {
    if distinct < 2 {
        return Err(ValidationError::TargetTooHomogeneous {
            target: target.to_string(),
            distinct,
        });
    }
    Ok(())
}
