//! The analysis response as it leaves on the wire.

use std::collections::BTreeMap;

use salience_mda::{
    AnalysisReport, AnalysisSummary, CategoryBreakdown, CrossTargetInsight, Dataset,
    EncodedTarget, ModelPerformance, ReportedFeatures, TargetError, TargetOutcome,
    ValidationError,
};
use serde::Serialize;

/// Importance block of one target.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureImportance {
    /// Capped significant / non-significant lists and the full list.
    pub reported: ReportedFeatures,
    /// Number of features scored.
    pub total_features: usize,
}

/// One target's slot in the response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetResponse {
    /// `"ok"` or `"failed"`.
    pub status: &'static str,
    /// Fit quality; absent on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_performance: Option<ModelPerformance>,
    /// Feature records; absent on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_importance: Option<FeatureImportance>,
    /// Category sums and shares; absent on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_importance: Option<CategoryBreakdown>,
    /// Why the target failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Structured failure detail; absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TargetFailure>,
}

/// Machine-readable cause of a failed target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetFailure {
    /// `"insufficientData"` or `"model"`.
    pub kind: &'static str,
    /// Offending target.
    pub target: String,
    /// What went wrong.
    pub reason: String,
    /// Train-split size, when the split was the problem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_train: Option<usize>,
    /// Test-split size, when the split was the problem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_test: Option<usize>,
}

impl From<&TargetError> for TargetFailure {
    fn from(error: &TargetError) -> Self {
        match error {
            TargetError::InsufficientData(e) => Self {
                kind: "insufficientData",
                target: e.target.clone(),
                reason: e.reason.clone(),
                n_train: Some(e.n_train),
                n_test: Some(e.n_test),
            },
            TargetError::Model { target, source } => Self {
                kind: "model",
                target: target.clone(),
                reason: source.to_string(),
                n_train: None,
                n_test: None,
            },
        }
    }
}

/// Request-wide counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    /// Targets in the request.
    pub total_targets: usize,
    /// Targets that completed.
    pub successful_targets: usize,
    /// Targets that failed.
    pub failed_targets: usize,
    /// Feature columns.
    pub total_features: usize,
    /// Matrix rows.
    pub total_samples: usize,
    /// Rows used for training.
    pub train_samples: usize,
    /// Rows held out.
    pub test_samples: usize,
}

impl From<AnalysisSummary> for SummaryResponse {
    fn from(s: AnalysisSummary) -> Self {
        Self {
            total_targets: s.total_targets,
            successful_targets: s.successful_targets,
            failed_targets: s.failed_targets,
            total_features: s.total_features,
            total_samples: s.total_samples,
            train_samples: s.train_samples,
            test_samples: s.test_samples,
        }
    }
}

/// Cross-target block.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossTargetInsights {
    /// Features significant for more than one target, ranked.
    pub universal_predictors: Vec<CrossTargetInsight>,
}

/// The full response document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    /// Target name → result.
    pub targets: BTreeMap<String, TargetResponse>,
    /// Request-wide counts.
    pub summary: SummaryResponse,
    /// Universal predictors.
    pub cross_target_insights: CrossTargetInsights,
}

impl From<AnalysisReport> for AnalysisResponse {
    fn from(report: AnalysisReport) -> Self {
        let targets = report
            .targets
            .into_iter()
            .map(|(name, outcome)| {
                let slot = match outcome {
                    TargetOutcome::Aggregated(result) => {
                        let result = *result;
                        TargetResponse {
                            status: "ok",
                            model_performance: Some(result.performance),
                            feature_importance: Some(FeatureImportance {
                                reported: result.reported,
                                total_features: result.total_features,
                            }),
                            category_importance: Some(result.categories),
                            note: None,
                            error: None,
                        }
                    }
                    TargetOutcome::Failed { note, error } => TargetResponse {
                        status: "failed",
                        model_performance: None,
                        feature_importance: None,
                        category_importance: None,
                        note: Some(note),
                        error: Some(TargetFailure::from(&error)),
                    },
                };
                (name, slot)
            })
            .collect();

        Self {
            targets,
            summary: report.summary.into(),
            cross_target_insights: CrossTargetInsights {
                universal_predictors: report.universal_predictors,
            },
        }
    }
}

/// How one target will be modelled.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSummary {
    /// Target name.
    pub name: String,
    /// `"classification"` or `"regression"`.
    pub task: &'static str,
    /// Class values, for classification targets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<String>>,
}

/// Outcome of validating a request without running it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationVerdict {
    /// Whether the request would be accepted.
    pub valid: bool,
    /// Matrix rows, when valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_samples: Option<usize>,
    /// Matrix columns, when valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_features: Option<usize>,
    /// Per-target modelling plan, when valid.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<TargetSummary>,
    /// Why the request was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationVerdict {
    /// Describe an accepted dataset.
    #[must_use]
    pub fn accepted(dataset: &Dataset) -> Self {
        let targets = dataset
            .targets()
            .iter()
            .map(|t| match &t.encoded {
                EncodedTarget::Classes { class_names, .. } => TargetSummary {
                    name: t.name.clone(),
                    task: "classification",
                    classes: Some(class_names.clone()),
                },
                EncodedTarget::Continuous(_) => TargetSummary {
                    name: t.name.clone(),
                    task: "regression",
                    classes: None,
                },
            })
            .collect();
        Self {
            valid: true,
            n_samples: Some(dataset.n_samples()),
            n_features: Some(dataset.n_features()),
            targets,
            error: None,
        }
    }

    /// Describe a rejection.
    #[must_use]
    pub fn rejected(error: &ValidationError) -> Self {
        Self {
            valid: false,
            n_samples: None,
            n_features: None,
            targets: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}
