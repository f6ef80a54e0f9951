//! Names that end up in file paths.

use std::str::FromStr;

use crate::IoError;

/// Label of one analysis run; the stored file is `{name}_analysis.json`.
///
/// Restricted to `[a-zA-Z0-9_-]+` so it can never escape the output directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: impl Into<String>) -> Result<Self, IoError> {
        let name = name.into();
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ExperimentName {
    type Err = IoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_safe_names() {
        assert_eq!(ExperimentName::new("wave-3_q2").unwrap().as_str(), "wave-3_q2");
    }

    #[test]
    fn parses_from_str() {
        let name: ExperimentName = "wave_4".parse().unwrap();
        assert_eq!(name.to_string(), "wave_4");
    }

    #[test]
    fn rejects_path_like_names() {
        for bad in ["", "../x", "a b", "résumé"] {
            assert!(matches!(
                ExperimentName::new(bad),
                Err(IoError::InvalidExperimentName { .. })
            ));
        }
    }
}
