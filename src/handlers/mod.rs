//! Request parsing and response shaping; all work is delegated to the
//! orchestrator.

pub mod documents;
pub mod projects;
