//! Request parsing, response shaping and result storage for salience.

mod domain;
mod error;
mod request;
mod response;
mod store;

pub use domain::ExperimentName;
pub use error::IoError;
pub use request::{
    AnalysisInputs, AnalysisRequest, CategoryMap, RequestMetadata, RequestOptions, TargetValue,
};
pub use response::{
    AnalysisResponse, CrossTargetInsights, FeatureImportance, SummaryResponse, TargetFailure,
    TargetResponse, TargetSummary, ValidationVerdict,
};
pub use store::{InMemoryStore, JsonFileStore, ResultStore};
