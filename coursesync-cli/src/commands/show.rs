use clap::Args;

use super::CommandError;
use crate::config::Config;
use crate::storage::WorkingCopyStorage;

/// Print the outline of a pulled course
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Course to show
    pub course_id: u64,

    /// Show the last-synced snapshot instead of the working tree
    #[arg(long)]
    pub snapshot: bool,
}

impl ShowCommand {
    pub fn run(&self, config: &Config) -> Result<(), CommandError> {
        let storage = WorkingCopyStorage::new(config.data_dir.value.clone());
        let copy = storage
            .load(self.course_id)?
            .ok_or(CommandError::NotPulled(self.course_id))?;

        if self.snapshot {
            print!("{}", copy.snapshot);
        } else {
            print!("{}", copy.working);
            println!();
            println!("* = not yet confirmed by the server");
        }
        Ok(())
    }
}
