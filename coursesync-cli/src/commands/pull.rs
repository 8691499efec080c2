//! Fetches a course from the server into a fresh working copy.

use clap::Args;
use coursesync_core::{CourseApi, CourseTree, EditSession, FailurePolicy};

use super::{connect, runtime, CommandError};
use crate::config::Config;
use crate::storage::{WorkingCopy, WorkingCopyStorage};

/// Download a course into the local working copy
#[derive(Debug, Args)]
pub struct PullCommand {
    /// Course to pull
    pub course_id: u64,

    /// Overwrite local edits that were never pushed
    #[arg(long)]
    pub force: bool,
}

impl PullCommand {
    pub fn run(&self, config: &Config) -> Result<(), CommandError> {
        let api = connect(config)?;
        let storage = WorkingCopyStorage::new(config.data_dir.value.clone());

        let tree = runtime()?.block_on(pull(&api, &storage, self.course_id, self.force))?;

        println!(
            "Pulled course {}: {} section(s), {} entities",
            tree.course_id,
            tree.sections.len(),
            tree.entity_count()
        );
        println!(
            "Edit {} and run 'course push {}'.",
            storage.working_path(self.course_id).display(),
            self.course_id
        );
        Ok(())
    }
}

/// Loads `course_id` and stores it as both snapshot and working tree.
pub async fn pull<A>(
    api: &A,
    storage: &WorkingCopyStorage,
    course_id: u64,
    force: bool,
) -> Result<CourseTree, CommandError>
where
    A: CourseApi + ?Sized,
{
    if !force {
        if let Some(copy) = storage.load(course_id)? {
            let local = EditSession::from_parts(copy.snapshot, copy.working, FailurePolicy::default());
            if local.has_unsaved_changes()? {
                return Err(CommandError::UnsavedChanges(course_id));
            }
        }
    }

    let session = EditSession::load(api, course_id, FailurePolicy::default()).await?;
    let (snapshot, working) = session.into_parts();
    storage.save(&WorkingCopy {
        snapshot,
        working: working.clone(),
    })?;

    tracing::info!(course_id, "Stored working copy");
    Ok(working)
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursesync_core::{EntityId, MemoryCourseApi, Section};
    use tempfile::TempDir;

    fn backend() -> MemoryCourseApi {
        let api = MemoryCourseApi::new();
        api.seed(&CourseTree::new(4).with_sections(vec![
            Section::new(EntityId::Server(2), 4, "Second"),
            Section::new(EntityId::Server(1), 4, "First"),
        ]));
        api
    }

    #[tokio::test]
    async fn test_pull_writes_both_files() {
        let temp_dir = TempDir::new().unwrap();
        let storage = WorkingCopyStorage::new(temp_dir.path().to_path_buf());
        let api = backend();

        let tree = pull(&api, &storage, 4, false).await.unwrap();
        assert_eq!(tree.sections[0].name, "First");

        let copy = storage.load(4).unwrap().unwrap();
        assert_eq!(copy.snapshot, copy.working);
        assert_eq!(copy.working, tree);
    }

    #[tokio::test]
    async fn test_pull_refuses_to_discard_edits() {
        let temp_dir = TempDir::new().unwrap();
        let storage = WorkingCopyStorage::new(temp_dir.path().to_path_buf());
        let api = backend();
        pull(&api, &storage, 4, false).await.unwrap();

        let mut copy = storage.load(4).unwrap().unwrap();
        copy.working.sections[0].persisted = false;
        storage.save(&copy).unwrap();

        let err = pull(&api, &storage, 4, false).await.unwrap_err();
        assert!(matches!(err, CommandError::UnsavedChanges(4)));

        let tree = pull(&api, &storage, 4, true).await.unwrap();
        assert!(tree.sections[0].persisted);
    }
}
