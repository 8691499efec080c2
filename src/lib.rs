//! Course Sync development backend.
//!
//! Serves the course CRUD contract over HTTP from an in-memory store, so the
//! `course` CLI and the sync engine can be exercised without the production
//! service.

pub mod config;
pub mod server;
