//! Error types for loading and synchronizing course trees.

use std::fmt;
use thiserror::Error;

use crate::entity_id::EntityId;
use crate::executor::SyncReport;
use crate::planner::Action;
use crate::schema::{EntityKind, NodePath};

/// Failure of a single remote call.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Server returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// HTTP status of the failed response, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// The old and new trees cannot be reconciled.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PlanError {
    #[error("Trees belong to different courses ({old} and {new})")]
    CourseMismatch { old: u64, new: u64 },

    #[error("{kind} {id} under {parent} is not known to the server snapshot")]
    UnknownServerId {
        kind: EntityKind,
        id: EntityId,
        parent: EntityId,
    },

    #[error("{kind} {id} appears more than once under {parent}")]
    DuplicateId {
        kind: EntityKind,
        id: EntityId,
        parent: EntityId,
    },
}

/// Parent whose children were being listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRef {
    Course(u64),
    Entity { kind: EntityKind, id: u64 },
}

impl fmt::Display for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentRef::Course(id) => write!(f, "course {}", id),
            ParentRef::Entity { kind, id } => write!(f, "{} {}", kind, id),
        }
    }
}

/// The persisted tree could not be retrieved.
#[derive(Debug)]
pub struct LoadError {
    pub parent: ParentRef,
    pub source: ApiError,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to load children of {}: {}",
            self.parent, self.source
        )
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// A create, update or delete call that did not succeed.
#[derive(Debug)]
pub struct OperationFailure {
    pub kind: EntityKind,
    pub action: Action,
    pub id: EntityId,
    /// Position in the new tree; `None` for deletions.
    pub path: Option<NodePath>,
    pub error: ApiError,
}

impl fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to {} {} {}: {}",
            self.action, self.kind, self.id, self.error
        )
    }
}

impl std::error::Error for OperationFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Errors that can occur while synchronizing an edited tree.
#[derive(Debug)]
pub enum SyncError {
    /// Nothing was sent: the trees could not be diffed.
    Plan(PlanError),
    /// Some calls failed. The report says exactly which ones round-tripped.
    Incomplete(Box<SyncReport>),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Plan(e) => write!(f, "Cannot plan sync: {}", e),
            SyncError::Incomplete(report) => {
                write!(
                    f,
                    "Sync incomplete: {} call(s) failed, {} skipped",
                    report.failures.len(),
                    report.skipped
                )?;
                if let Some(first) = report.failures.first() {
                    write!(f, " (first: {})", first)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Plan(e) => Some(e),
            SyncError::Incomplete(report) => report
                .failures
                .first()
                .map(|f| f as &(dyn std::error::Error + 'static)),
        }
    }
}

impl From<PlanError> for SyncError {
    fn from(e: PlanError) -> Self {
        SyncError::Plan(e)
    }
}

/// Errors returned by [`crate::session::EditSession`].
#[derive(Debug)]
pub enum SessionError {
    /// The addressed entity is not in the working tree.
    NotFound(String),
    Load(LoadError),
    Sync(SyncError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotFound(what) => write!(f, "Not found: {}", what),
            SessionError::Load(e) => write!(f, "{}", e),
            SessionError::Sync(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::NotFound(_) => None,
            SessionError::Load(e) => Some(e),
            SessionError::Sync(e) => Some(e),
        }
    }
}

impl From<LoadError> for SessionError {
    fn from(e: LoadError) -> Self {
        SessionError::Load(e)
    }
}

impl From<SyncError> for SessionError {
    fn from(e: SyncError) -> Self {
        SessionError::Sync(e)
    }
}

impl From<PlanError> for SessionError {
    fn from(e: PlanError) -> Self {
        SessionError::Sync(SyncError::Plan(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_status() {
        let err = ApiError::Status {
            status: 404,
            body: "not found".to_string(),
        };
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "Server returned status 404: not found");
        assert_eq!(ApiError::Transport("refused".to_string()).status(), None);
    }

    #[test]
    fn test_load_error_names_parent() {
        let err = LoadError {
            parent: ParentRef::Entity {
                kind: EntityKind::Lesson,
                id: 7,
            },
            source: ApiError::Transport("connection reset".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Failed to load children of lesson 7: Transport error: connection reset"
        );
    }

    #[test]
    fn test_operation_failure_display() {
        let failure = OperationFailure {
            kind: EntityKind::Question,
            action: Action::Create,
            id: EntityId::Temporary(2),
            path: None,
            error: ApiError::Status {
                status: 500,
                body: String::new(),
            },
        };
        assert_eq!(
            failure.to_string(),
            "Failed to create question new#2: Server returned status 500: "
        );
    }
}
