//! I/O error types for salience-io.

use std::path::PathBuf;

/// Errors from request reading, request conversion and result storage.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the request file does not exist or is unreadable.
    #[error("cannot read request file {path}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the request body is not a valid request document.
    #[error("malformed request JSON")]
    ParseRequest {
        /// Underlying JSON error (carries line and column).
        source: serde_json::Error,
    },

    /// Returned when a request option cannot become an engine setting.
    #[error("invalid request options: {source}")]
    InvalidOptions {
        /// The rejected option.
        #[from]
        source: salience_mda::ValidationError,
    },

    /// Returned when the category map puts one feature in two categories.
    #[error("feature \"{feature}\" is assigned to both \"{first}\" and \"{second}\"")]
    ConflictingCategory {
        /// The feature name.
        feature: String,
        /// Category seen first.
        first: String,
        /// Category seen second.
        second: String,
    },

    /// Returned when the experiment name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid experiment name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a response cannot be serialized.
    #[error("cannot serialize analysis response")]
    Serialize {
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}
