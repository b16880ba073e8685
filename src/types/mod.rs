//! Inbound payloads for the orchestrated operations.
//!
//! Each payload validates itself before any I/O is attempted.

pub mod document;
pub mod project;

pub use document::{DocumentChanges, FilePayload, FileUpload, NewDocument};
pub use project::{NewProject, ProjectChanges};

use crate::error::AutodocError;

pub(crate) fn require_name(field: &str, value: &str) -> Result<(), AutodocError> {
    if value.trim().is_empty() {
        return Err(AutodocError::Validation(format!("`{field}` is required")));
    }
    Ok(())
}
