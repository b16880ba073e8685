use serde::{Deserialize, Serialize};

use super::require_name;
use crate::error::AutodocError;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl NewProject {
    pub fn validate(&self) -> Result<(), AutodocError> {
        require_name("name", &self.name)
    }
}

/// Rename/redescribe a project; the remote folder follows the new name.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectChanges {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl ProjectChanges {
    pub fn validate(&self) -> Result<(), AutodocError> {
        require_name("name", &self.name)
    }
}
