use std::path::PathBuf;

use thiserror::Error;

/// Errors the tracker reports back to the shell. None of them are fatal: the timer keeps its
/// previous state and the user may retry.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Project \"{0}\" already exists")]
    DuplicateProject(String),

    #[error("Project \"{0}\" doesn't exist")]
    UnknownProject(String),

    #[error("No project selected. Load a project first")]
    NoProjectSelected,

    #[error("Project name can't be empty")]
    InvalidProjectName,

    #[error("Failed to save projects into {path:?}: {source}")]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl TrackerError {
    pub fn persistence(path: impl Into<PathBuf>, source: impl Into<anyhow::Error>) -> Self {
        Self::PersistenceFailure {
            path: path.into(),
            source: source.into(),
        }
    }
}
