mod config_cmd;
mod plan;
mod pull;
mod push;
mod show;

pub use config_cmd::ConfigCommand;
pub use plan::PlanCommand;
pub use pull::PullCommand;
pub use push::PushCommand;
pub use show::ShowCommand;

use coursesync_core::{ApiError, HttpCourseApi, SessionError};

use crate::config::Config;
use crate::storage::StorageError;

/// Builds the REST client from the configured server settings.
fn connect(config: &Config) -> Result<HttpCourseApi, CommandError> {
    let url = config
        .server
        .url
        .clone()
        .ok_or(CommandError::NotConfigured)?;
    let api = HttpCourseApi::with_timeout(
        url,
        config.server.api_token.clone(),
        config.server.timeout(),
    )?;
    Ok(api)
}

fn runtime() -> Result<tokio::runtime::Runtime, CommandError> {
    tokio::runtime::Runtime::new().map_err(|e| CommandError::RuntimeError(e.to_string()))
}

/// Errors from course commands
#[derive(Debug)]
pub enum CommandError {
    /// No server URL in config or environment.
    NotConfigured,
    /// The course has no working copy yet.
    NotPulled(u64),
    /// Pulling would discard local edits.
    UnsavedChanges(u64),
    Api(ApiError),
    Session(SessionError),
    Storage(StorageError),
    RuntimeError(String),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::NotConfigured => write!(
                f,
                "No server configured (set server.url in the config file or COURSE_SERVER_URL)"
            ),
            CommandError::NotPulled(id) => write!(
                f,
                "Course {} has no working copy; run 'course pull {}' first",
                id, id
            ),
            CommandError::UnsavedChanges(id) => write!(
                f,
                "Course {} has unsaved changes; push them or pull with --force",
                id
            ),
            CommandError::Api(e) => write!(f, "{}", e),
            CommandError::Session(e) => write!(f, "{}", e),
            CommandError::Storage(e) => write!(f, "{}", e),
            CommandError::RuntimeError(e) => write!(f, "Runtime error: {}", e),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Api(e) => Some(e),
            CommandError::Session(e) => Some(e),
            CommandError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ApiError> for CommandError {
    fn from(e: ApiError) -> Self {
        CommandError::Api(e)
    }
}

impl From<SessionError> for CommandError {
    fn from(e: SessionError) -> Self {
        CommandError::Session(e)
    }
}

impl From<StorageError> for CommandError {
    fn from(e: StorageError) -> Self {
        CommandError::Storage(e)
    }
}
