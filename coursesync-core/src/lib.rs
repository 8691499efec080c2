//! Course Sync Core Library
//!
//! Curriculum models (sections, lessons, questions, answers) and the engine
//! that reconciles a locally edited course with the backend: load the
//! persisted tree, diff it against the edited one, send the minimal set of
//! create/update/delete calls in dependency order, and fold the server's
//! identities back into the tree.

pub mod api;
pub mod entity_id;
pub mod error;
pub mod executor;
pub mod loader;
pub mod memory;
pub mod models;
pub mod planner;
pub mod remap;
pub mod schema;
pub mod session;
pub mod temp_ids;

pub use api::{ApiResult, CourseApi, HttpCourseApi};
pub use entity_id::{EntityId, EntityIdError};
pub use error::{
    ApiError, LoadError, OperationFailure, ParentRef, PlanError, SessionError, SyncError,
};
pub use executor::{synchronize, CallRecord, Executor, FailurePolicy, SyncReport};
pub use loader::{load_tree, LoadedTree};
pub use memory::MemoryCourseApi;
pub use models::{Answer, CourseTree, Lesson, Question, Section};
pub use planner::{plan, Action, SyncPlan};
pub use remap::IdentityRemap;
pub use schema::{Entity, EntityKind, NodePath};
pub use session::EditSession;
pub use temp_ids::{ParentKey, TempIdAllocator};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
