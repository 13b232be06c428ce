//! Repository layer
//!
//! Row-level persistence for projects, working-copy files, branches and
//! deployments. All functions take a `&Connection`, so callers can pass a
//! `Transaction` (which derefs to one) to group writes atomically.

mod branch;
mod deployment;
mod file;
mod project;

/// SQLite repository for vibestack records
pub struct SqliteRepo;
