//! Shows what a push would send.

use clap::Args;
use coursesync_core::{EditSession, SyncPlan};

use super::CommandError;
use crate::config::Config;
use crate::storage::WorkingCopyStorage;

/// Show the calls the next push would make
#[derive(Debug, Args)]
pub struct PlanCommand {
    /// Course to inspect
    pub course_id: u64,
}

impl PlanCommand {
    pub fn run(&self, config: &Config) -> Result<(), CommandError> {
        let storage = WorkingCopyStorage::new(config.data_dir.value.clone());
        let plan = pending_plan(&storage, self.course_id, config)?;
        print!("{}", plan);
        Ok(())
    }
}

/// Diffs the stored working tree against the stored snapshot.
pub fn pending_plan(
    storage: &WorkingCopyStorage,
    course_id: u64,
    config: &Config,
) -> Result<SyncPlan, CommandError> {
    let copy = storage
        .load(course_id)?
        .ok_or(CommandError::NotPulled(course_id))?;
    let session = EditSession::from_parts(copy.snapshot, copy.working, config.failure_policy.value);
    Ok(session.plan()?)
}
