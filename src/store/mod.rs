//! Durable state of the tracker. Organized through [project_store::JsonProjectStore].
//! The basic idea is:
//!  - There is a single json file mapping project names to accumulated hours.
//!  - The file is loaded once at startup and rewritten in full on every change.
//!  - A broken or missing file is treated as an empty store.

pub mod project_store;
pub mod projects;

use project_store::ProjectStore;
use projects::{validate_name, Projects};
use tracing::{info, warn};

use crate::error::TrackerError;

/// Adds a new project with no hours and persists it right away. On any failure `projects` stays
/// exactly as it was.
pub async fn create_project(
    store: &impl ProjectStore,
    projects: &mut Projects,
    name: &str,
) -> Result<(), TrackerError> {
    let name = validate_name(name)?;
    projects.insert_new(name)?;

    if let Err(e) = store.save(projects).await {
        warn!("Rolling back creation of {name}: {e}");
        projects.remove(name);
        return Err(e);
    }
    info!("Created project {name}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use crate::{
        error::TrackerError,
        store::{
            create_project,
            project_store::{JsonProjectStore, ProjectStore},
            projects::Projects,
        },
        utils::logging::TEST_LOGGING,
    };

    #[tokio::test]
    async fn test_create_persists() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let store = JsonProjectStore::in_dir(dir.path());
        let mut projects = store.load().await;

        create_project(&store, &mut projects, "Thesis").await?;

        let expected: Projects = [("Thesis", 0.)].into_iter().collect();
        assert_eq!(projects, expected);
        assert_eq!(store.load().await, expected);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_duplicate() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let store = JsonProjectStore::in_dir(dir.path());
        let mut projects = Projects::new();
        create_project(&store, &mut projects, "A").await?;
        store.save(&[("A", 3.)].into_iter().collect()).await?;
        let mut projects = store.load().await;

        let result = create_project(&store, &mut projects, "A").await;

        assert!(matches!(result, Err(TrackerError::DuplicateProject(_))));
        assert_eq!(projects.hours("A"), Some(3.));
        assert_eq!(store.load().await, projects);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_rolls_back_on_failure() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "")?;
        let store = JsonProjectStore::in_dir(&blocker);
        let mut projects: Projects = [("Existing", 1.)].into_iter().collect();

        let result = create_project(&store, &mut projects, "New").await;

        assert!(matches!(result, Err(TrackerError::PersistenceFailure { .. })));
        assert!(!projects.contains("New"));
        assert_eq!(projects.len(), 1);
        Ok(())
    }
}
