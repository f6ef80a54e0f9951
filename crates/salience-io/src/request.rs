//! The analysis request as it arrives on the wire.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use salience_mda::{
    AnalysisConfig, DEFAULT_TRAIN_RATIO, FeatureMatrix, FeatureMetadata, SplitCriterion,
    TargetVariable, ValidationError,
};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::IoError;

/// One cell of a target array: a number, a label or a flag.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TargetValue {
    /// Numeric response.
    Number(f64),
    /// Yes/no response.
    Flag(bool),
    /// Categorical response.
    Text(String),
}

impl TargetValue {
    fn render(&self) -> String {
        match self {
            TargetValue::Number(v) => v.to_string(),
            TargetValue::Flag(b) => b.to_string(),
            TargetValue::Text(s) => s.clone(),
        }
    }
}

/// Feature → category, in either of the two shapes callers send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CategoryMap {
    /// `{ "price": "pain", "taste": "pleasure" }`
    ByFeature(BTreeMap<String, String>),
    /// `{ "pain": ["price"], "pleasure": ["taste"] }`
    ByCategory(BTreeMap<String, Vec<String>>),
}

impl CategoryMap {
    /// Flatten to feature → category.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::ConflictingCategory`] if a feature is listed under
    /// two categories.
    pub fn into_feature_map(self) -> Result<BTreeMap<String, String>, IoError> {
        match self {
            CategoryMap::ByFeature(map) => Ok(map),
            CategoryMap::ByCategory(groups) => {
                let mut map: BTreeMap<String, String> = BTreeMap::new();
                for (category, features) in groups {
                    for feature in features {
                        if let Some(first) = map.get(&feature)
                            && *first != category
                        {
                            return Err(IoError::ConflictingCategory {
                                feature,
                                first: first.clone(),
                                second: category,
                            });
                        }
                        map.insert(feature, category.clone());
                    }
                }
                Ok(map)
            }
        }
    }
}

/// Column names and the optional category map.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMetadata {
    /// One name per matrix column.
    pub feature_names: Vec<String>,
    /// Optional feature categories.
    #[serde(default)]
    pub pain_pleasure_categories: Option<CategoryMap>,
}

/// Tuning options; every field falls back to its default when absent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestOptions {
    /// Fraction of samples used for training.
    pub train_ratio: f64,
    /// Trees per target model.
    pub n_estimators: usize,
    /// Maximum tree depth.
    pub max_depth: usize,
    /// `"gini"` or `"entropy"`, for classification targets.
    pub split_criterion: SplitCriterion,
    /// Shuffles per feature.
    pub mda_repetitions: usize,
    /// Two-sided significance level.
    pub significance_threshold: f64,
    /// Cap on reported significant features.
    pub max_features_significant: usize,
    /// Cap on reported non-significant features.
    pub max_features_non_significant: usize,
    /// Seed for the split, forests and shuffles.
    pub seed: Option<u64>,
    /// Wall-clock limit in seconds.
    pub time_limit_secs: Option<f64>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        let config = AnalysisConfig::new();
        Self {
            train_ratio: DEFAULT_TRAIN_RATIO,
            n_estimators: config.n_estimators(),
            max_depth: config.max_depth(),
            split_criterion: config.split_criterion(),
            mda_repetitions: config.mda_repetitions(),
            significance_threshold: config.significance_threshold(),
            max_features_significant: config.max_features_significant(),
            max_features_non_significant: config.max_features_non_significant(),
            seed: None,
            time_limit_secs: None,
        }
    }
}

impl RequestOptions {
    /// Build the engine configuration.
    ///
    /// Range checks on the numeric options happen in the engine; only the
    /// time limit is converted here.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidOption`] for a `timeLimitSecs` that
    /// is not a positive number of seconds representable as a [`Duration`].
    pub fn to_config(&self) -> Result<AnalysisConfig, ValidationError> {
        let mut config = AnalysisConfig::new()
            .with_train_ratio(self.train_ratio)
            .with_n_estimators(self.n_estimators)
            .with_max_depth(self.max_depth)
            .with_split_criterion(self.split_criterion)
            .with_mda_repetitions(self.mda_repetitions)
            .with_significance_threshold(self.significance_threshold)
            .with_max_features_significant(self.max_features_significant)
            .with_max_features_non_significant(self.max_features_non_significant)
            .with_time_limit(self.time_limit()?);
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        Ok(config)
    }

    fn time_limit(&self) -> Result<Option<Duration>, ValidationError> {
        let Some(secs) = self.time_limit_secs else {
            return Ok(None);
        };
        let rejected = || ValidationError::InvalidOption {
            name: "timeLimitSecs",
            value: secs.to_string(),
            reason: "must be a positive, finite number of seconds",
        };
        if secs.is_nan() || secs <= 0.0 {
            return Err(rejected());
        }
        Duration::try_from_secs_f64(secs)
            .map(Some)
            .map_err(|_| rejected())
    }
}

/// A full analysis request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    /// Samples × features.
    pub feature_matrix: Vec<Vec<f64>>,
    /// Target name → one value per sample.
    pub target_variables: BTreeMap<String, Vec<TargetValue>>,
    /// Feature names and categories.
    pub metadata: RequestMetadata,
    /// Tuning options.
    #[serde(default)]
    pub options: RequestOptions,
}

/// Engine inputs unpacked from a request.
#[derive(Debug, Clone)]
pub struct AnalysisInputs {
    /// The feature matrix.
    pub matrix: FeatureMatrix,
    /// Names and categories.
    pub metadata: FeatureMetadata,
    /// The targets.
    pub targets: Vec<TargetVariable>,
    /// Engine configuration.
    pub config: AnalysisConfig,
}

impl AnalysisRequest {
    /// Parse a request from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::ParseRequest`] when the JSON is malformed or does
    /// not match the request shape.
    pub fn from_json_str(json: &str) -> Result<Self, IoError> {
        serde_json::from_str(json).map_err(|source| IoError::ParseRequest { source })
    }

    /// Read and parse a request file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::ReadFile`] | the file cannot be read |
    /// | [`IoError::ParseRequest`] | the contents are not a valid request |
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn from_path(path: &Path) -> Result<Self, IoError> {
        let json = fs::read_to_string(path).map_err(|source| IoError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let request = Self::from_json_str(&json)?;
        debug!(
            n_samples = request.feature_matrix.len(),
            n_targets = request.target_variables.len(),
            "request parsed"
        );
        Ok(request)
    }

    /// Convert into engine inputs.
    ///
    /// A target whose values are all numbers stays numeric; any other target
    /// is treated as categorical, with numbers and flags rendered as text.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::InvalidOptions`] | an option cannot be converted |
    /// | [`IoError::ConflictingCategory`] | the category map assigns a feature twice |
    pub fn into_inputs(self) -> Result<AnalysisInputs, IoError> {
        let config = self.options.to_config()?;

        let mut metadata = FeatureMetadata::new(self.metadata.feature_names);
        if let Some(categories) = self.metadata.pain_pleasure_categories {
            metadata = metadata.with_categories(categories.into_feature_map()?);
        }

        let targets = self
            .target_variables
            .into_iter()
            .map(|(name, values)| {
                let numeric: Option<Vec<f64>> = values
                    .iter()
                    .map(|v| match v {
                        TargetValue::Number(n) => Some(*n),
                        _ => None,
                    })
                    .collect();
                match numeric {
                    Some(numbers) => TargetVariable::numeric(name, numbers),
                    None => TargetVariable::categorical(
                        name,
                        values.iter().map(TargetValue::render).collect(),
                    ),
                }
            })
            .collect();

        Ok(AnalysisInputs {
            matrix: FeatureMatrix::new(self.feature_matrix),
            metadata,
            targets,
            config,
        })
    }
}
