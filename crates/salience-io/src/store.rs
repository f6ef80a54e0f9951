//! Injected storage for analysis responses.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info, instrument};

use crate::domain::ExperimentName;
use crate::response::AnalysisResponse;
use crate::IoError;

/// Somewhere to put finished responses.
pub trait ResultStore {
    /// Persist `response` under `experiment`, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// Returns the store's I/O or serialization error.
    fn save(&self, experiment: &ExperimentName, response: &AnalysisResponse)
    -> Result<(), IoError>;
}

/// Writes each response to `{output_dir}/{experiment}_analysis.json`.
///
/// Creates the output directory on construction if it does not exist.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    output_dir: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display()))]
    pub fn new(output_dir: &Path) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    /// Return the file a response for `experiment` is written to.
    #[must_use]
    pub fn path_for(&self, experiment: &ExperimentName) -> PathBuf {
        self.output_dir
            .join(format!("{}_analysis.json", experiment.as_str()))
    }
}

impl ResultStore for JsonFileStore {
    #[instrument(skip_all, fields(experiment = %experiment))]
    fn save(
        &self,
        experiment: &ExperimentName,
        response: &AnalysisResponse,
    ) -> Result<(), IoError> {
        let path = self.path_for(experiment);
        let json = serde_json::to_string_pretty(response)
            .map_err(|source| IoError::Serialize { source })?;
        fs::write(&path, json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        info!(path = %path.display(), "wrote analysis result");
        Ok(())
    }
}

/// Keeps responses in memory, keyed by experiment.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    results: Mutex<BTreeMap<ExperimentName, AnalysisResponse>>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy of the response saved under `experiment`.
    #[must_use]
    pub fn get(&self, experiment: &ExperimentName) -> Option<AnalysisResponse> {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(experiment)
            .cloned()
    }

    /// Return the number of stored responses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Return `true` if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultStore for InMemoryStore {
    fn save(
        &self,
        experiment: &ExperimentName,
        response: &AnalysisResponse,
    ) -> Result<(), IoError> {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(experiment.clone(), response.clone());
        debug!(experiment = %experiment, "stored analysis result in memory");
        Ok(())
    }
}
