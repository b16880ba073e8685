use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub type ProjectId = i64;
pub type DocumentId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: String,
    pub remote_url: Option<String>,
    pub remote_folder_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Document {
    pub id: DocumentId,
    pub project_id: ProjectId,
    pub name: String,
    pub description: String,
    pub url: Option<String>,
    pub remote_file_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
