//! Sends local edits to the server.

use clap::Args;
use coursesync_core::{CourseApi, EditSession, FailurePolicy, SessionError, SyncError, SyncReport};

use super::{connect, runtime, CommandError};
use crate::config::Config;
use crate::storage::{WorkingCopy, WorkingCopyStorage};

/// Push local edits of a course to the server
#[derive(Debug, Args)]
pub struct PushCommand {
    /// Course to push
    pub course_id: u64,

    /// Override the configured failure policy (abort or best-effort)
    #[arg(long)]
    pub policy: Option<FailurePolicy>,
}

impl PushCommand {
    pub fn run(&self, config: &Config) -> Result<(), CommandError> {
        let api = connect(config)?;
        let storage = WorkingCopyStorage::new(config.data_dir.value.clone());
        let policy = self.policy.unwrap_or(config.failure_policy.value);

        let result = runtime()?.block_on(push(&api, &storage, self.course_id, policy));
        match &result {
            Ok(report) if report.calls.is_empty() => println!("Nothing to push."),
            Ok(report) => println!("Pushed course {}: {}", self.course_id, report),
            Err(CommandError::Session(SessionError::Sync(SyncError::Incomplete(report)))) => {
                println!("Push incomplete: {}", report);
                for failure in &report.failures {
                    println!("  ✗ {}", failure);
                }
                println!();
                println!(
                    "Completed calls were saved; run 'course push {}' again to retry the rest.",
                    self.course_id
                );
            }
            Err(_) => {}
        }
        result.map(|_| ())
    }
}

/// Saves the stored working copy and writes back whatever the server confirmed.
///
/// Both files are rewritten after a partial failure too, so a retry only
/// sends the remaining calls.
pub async fn push<A>(
    api: &A,
    storage: &WorkingCopyStorage,
    course_id: u64,
    policy: FailurePolicy,
) -> Result<SyncReport, CommandError>
where
    A: CourseApi + ?Sized,
{
    let copy = storage
        .load(course_id)?
        .ok_or(CommandError::NotPulled(course_id))?;
    let mut session = EditSession::from_parts(copy.snapshot, copy.working, policy);

    let result = session.save(api).await;

    let (snapshot, working) = session.into_parts();
    storage.save(&WorkingCopy { snapshot, working })?;

    Ok(result?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursesync_core::memory::Fault;
    use coursesync_core::{CourseTree, EntityId, EntityKind, Lesson, MemoryCourseApi, Section};
    use tempfile::TempDir;

    use crate::commands::pull::pull;

    async fn pulled(api: &MemoryCourseApi, dir: &TempDir) -> WorkingCopyStorage {
        api.seed(&CourseTree::new(4).with_sections(vec![Section::new(
            EntityId::Server(1),
            4,
            "Basics",
        )]));
        let storage = WorkingCopyStorage::new(dir.path().to_path_buf());
        pull(api, &storage, 4, false).await.unwrap();
        storage
    }

    fn add_lessons(storage: &WorkingCopyStorage, titles: &[&str]) {
        let mut copy = storage.load(4).unwrap().unwrap();
        for (n, title) in titles.iter().enumerate() {
            copy.working.sections[0].lessons.push(Lesson::new(
                EntityId::Temporary(n as u64 + 1),
                EntityId::Server(1),
                *title,
            ));
        }
        storage.save(&copy).unwrap();
    }

    #[tokio::test]
    async fn test_push_promotes_ids_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let api = MemoryCourseApi::new();
        let storage = pulled(&api, &temp_dir).await;
        add_lessons(&storage, &["New"]);

        let report = push(&api, &storage, 4, FailurePolicy::Abort).await.unwrap();
        assert_eq!(report.calls.len(), 1);

        let copy = storage.load(4).unwrap().unwrap();
        assert_eq!(copy.snapshot, copy.working);
        assert_eq!(copy.working.sections[0].lessons[0].id, EntityId::Server(2));
        assert_eq!(api.count(EntityKind::Lesson), 1);
    }

    #[tokio::test]
    async fn test_partial_push_is_saved_and_retried() {
        let temp_dir = TempDir::new().unwrap();
        let api = MemoryCourseApi::recording();
        let storage = pulled(&api, &temp_dir).await;
        add_lessons(&storage, &["Good", "Bad", "Later"]);
        api.inject(Fault::Create(EntityKind::Lesson, "Bad".to_string()));

        let err = push(&api, &storage, 4, FailurePolicy::BestEffort)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CommandError::Session(SessionError::Sync(SyncError::Incomplete(_)))
        ));
        assert_eq!(api.count(EntityKind::Lesson), 2);

        api.clear_faults();
        api.clear_calls();
        let report = push(&api, &storage, 4, FailurePolicy::Abort).await.unwrap();
        assert_eq!(report.calls.len(), 1);
        assert_eq!(api.writes().len(), 1);
        assert_eq!(api.count(EntityKind::Lesson), 3);
    }

    #[tokio::test]
    async fn test_push_without_pull() {
        let temp_dir = TempDir::new().unwrap();
        let storage = WorkingCopyStorage::new(temp_dir.path().to_path_buf());
        let api = MemoryCourseApi::new();

        let err = push(&api, &storage, 4, FailurePolicy::Abort).await.unwrap_err();
        assert!(matches!(err, CommandError::NotPulled(4)));
    }
}
