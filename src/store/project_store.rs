use std::{
    future::Future,
    io::ErrorKind,
    ops::Deref,
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

use crate::{error::TrackerError, fs::operations::write_atomically};

use super::projects::Projects;

/// Interface for abstracting persistence of projects.
pub trait ProjectStore {
    /// Reads persisted projects. This never fails: a missing or broken file means there is
    /// nothing to recover, so an empty mapping is returned.
    fn load(&self) -> impl Future<Output = Projects>;

    /// Rewrites the whole persisted state with `projects`.
    fn save(&self, projects: &Projects) -> impl Future<Output = Result<(), TrackerError>>;
}

impl<T: Deref> ProjectStore for T
where
    T::Target: ProjectStore,
{
    fn load(&self) -> impl Future<Output = Projects> {
        self.deref().load()
    }

    fn save(&self, projects: &Projects) -> impl Future<Output = Result<(), TrackerError>> {
        self.deref().save(projects)
    }
}

/// The main realization of [ProjectStore]. Keeps projects in a single pretty printed json file.
pub struct JsonProjectStore {
    path: PathBuf,
}

impl JsonProjectStore {
    pub const DEFAULT_FILE_NAME: &'static str = "projects.json";

    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(Self::DEFAULT_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProjectStore for JsonProjectStore {
    async fn load(&self) -> Projects {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No project file at {:?}, starting empty", self.path);
                return Projects::new();
            }
            Err(e) => {
                warn!("Couldn't read {:?}, starting empty: {e}", self.path);
                return Projects::new();
            }
        };

        match serde_json::from_str::<Projects>(&text) {
            Ok(mut projects) => {
                for name in projects.repair() {
                    // Only a hand edit can produce these. Other projects are still good.
                    warn!("{name} in {:?} had negative or broken hours, reset to 0", self.path);
                }
                info!("Loaded {} projects from {:?}", projects.len(), self.path);
                projects
            }
            Err(e) => {
                // Might happen if the file was edited by hand.
                warn!("{:?} is not a valid project file, starting empty: {e}", self.path);
                Projects::new()
            }
        }
    }

    async fn save(&self, projects: &Projects) -> Result<(), TrackerError> {
        let mut buffer = serde_json::to_vec_pretty(projects)
            .map_err(|e| TrackerError::persistence(&self.path, e))?;
        buffer.push(b'\n');

        write_atomically(&self.path, &buffer)
            .await
            .map_err(|e| TrackerError::persistence(&self.path, e))?;
        debug!("Saved {} projects into {:?}", projects.len(), self.path);
        Ok(())
    }
}
