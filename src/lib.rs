pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod remote;
pub mod router;
pub mod service;
pub mod types;

pub use error::AutodocError;
pub use service::Orchestrator;
