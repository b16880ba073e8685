//! Database module: pool, scoped transactions, row models and repositories.
//!
//! Layout:
//! - `pool.rs`: bounded connection pool with retrying acquisition
//! - `transaction.rs`: commit-or-rollback unit of work over one lease
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `projects.rs`, `documents.rs`: per-table repositories

pub mod documents;
pub mod models;
pub mod pool;
pub mod projects;
pub mod schema;
pub mod transaction;

pub use documents::DocumentRepo;
pub use models::{Document, DocumentId, Project, ProjectId};
pub use pool::{ConnectionPool, Lease};
pub use projects::ProjectRepo;
pub use schema::SQLITE_INIT;
