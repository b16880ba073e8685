//! Project repository.
//!
//! Pure database access on a borrowed connection; callers decide the
//! transaction scope and the ordering against the remote store.

use sqlx::SqliteConnection;

use crate::db::models::{Project, ProjectId};
use crate::error::AutodocError;

const PROJECT_COLUMNS: &str = "id, name, description, remote_url, remote_folder_id";

pub struct ProjectRepo<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ProjectRepo<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Insert a project already linked to its remote folder.
    pub async fn insert(
        &mut self,
        name: &str,
        description: &str,
        remote_url: &str,
        remote_folder_id: &str,
    ) -> Result<Project, AutodocError> {
        let project = sqlx::query_as::<_, Project>(&format!(
            "INSERT INTO projects (name, description, remote_url, remote_folder_id)
             VALUES (?, ?, ?, ?) RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(name)
        .bind(description)
        .bind(remote_url)
        .bind(remote_folder_id)
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(project)
    }

    pub async fn get(&mut self, id: ProjectId) -> Result<Option<Project>, AutodocError> {
        let project = sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;
        Ok(project)
    }

    /// All projects, or those whose name contains `name_filter` (ASCII
    /// case-insensitive).
    pub async fn list(&mut self, name_filter: Option<&str>) -> Result<Vec<Project>, AutodocError> {
        let projects = match name_filter {
            Some(filter) => {
                sqlx::query_as::<_, Project>(&format!(
                    "SELECT {PROJECT_COLUMNS} FROM projects
                     WHERE name LIKE ? ESCAPE '\\' ORDER BY id"
                ))
                .bind(format!("%{}%", escape_like(filter)))
                .fetch_all(&mut *self.conn)
                .await?
            }
            None => {
                sqlx::query_as::<_, Project>(&format!(
                    "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY id"
                ))
                .fetch_all(&mut *self.conn)
                .await?
            }
        };
        Ok(projects)
    }

    /// The remote folder backing a project.
    ///
    /// `NotFound` both when the row is missing and when it was never linked.
    pub async fn remote_folder_id(&mut self, id: ProjectId) -> Result<String, AutodocError> {
        let linkage: Option<(Option<String>,)> =
            sqlx::query_as("SELECT remote_folder_id FROM projects WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *self.conn)
                .await?;
        match linkage {
            Some((Some(folder_id),)) if !folder_id.is_empty() => Ok(folder_id),
            _ => Err(AutodocError::not_found("project remote folder", id)),
        }
    }

    /// Returns the number of rows touched (0 when the project is gone).
    pub async fn update(
        &mut self,
        id: ProjectId,
        name: &str,
        description: &str,
        remote_url: &str,
    ) -> Result<u64, AutodocError> {
        let result = sqlx::query(
            "UPDATE projects SET name = ?, description = ?, remote_url = ? WHERE id = ?",
        )
        .bind(name)
        .bind(description)
        .bind(remote_url)
        .bind(id)
        .execute(&mut *self.conn)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&mut self, id: ProjectId) -> Result<u64, AutodocError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected())
    }
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
