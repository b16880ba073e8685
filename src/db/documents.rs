//! Document repository.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::db::models::{Document, DocumentId, ProjectId};
use crate::error::AutodocError;

const DOCUMENT_COLUMNS: &str =
    "id, project_id, name, description, url, remote_file_id, created_at";

pub struct DocumentRepo<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> DocumentRepo<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    pub async fn insert(
        &mut self,
        project_id: ProjectId,
        name: &str,
        description: &str,
        url: &str,
        remote_file_id: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Document, AutodocError> {
        let document = sqlx::query_as::<_, Document>(&format!(
            "INSERT INTO documents (project_id, name, description, url, remote_file_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?) RETURNING {DOCUMENT_COLUMNS}"
        ))
        .bind(project_id)
        .bind(name)
        .bind(description)
        .bind(url)
        .bind(remote_file_id)
        .bind(created_at)
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(document)
    }

    pub async fn get(&mut self, id: DocumentId) -> Result<Option<Document>, AutodocError> {
        let document = sqlx::query_as::<_, Document>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;
        Ok(document)
    }

    pub async fn list_by_project(
        &mut self,
        project_id: ProjectId,
    ) -> Result<Vec<Document>, AutodocError> {
        let documents = sqlx::query_as::<_, Document>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE project_id = ? ORDER BY id"
        ))
        .bind(project_id)
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(documents)
    }

    /// The remote file backing a document; `NotFound` when the row is
    /// missing or was never linked.
    pub async fn remote_file_id(&mut self, id: DocumentId) -> Result<String, AutodocError> {
        let linkage: Option<(Option<String>,)> =
            sqlx::query_as("SELECT remote_file_id FROM documents WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *self.conn)
                .await?;
        match linkage {
            Some((Some(file_id),)) if !file_id.is_empty() => Ok(file_id),
            _ => Err(AutodocError::not_found("document remote file", id)),
        }
    }

    /// Update name and description, and the url only when one is given.
    /// Returns the number of rows touched.
    pub async fn update(
        &mut self,
        id: DocumentId,
        name: &str,
        description: &str,
        url: Option<&str>,
    ) -> Result<u64, AutodocError> {
        let result = match url {
            Some(url) => {
                sqlx::query(
                    "UPDATE documents SET name = ?, description = ?, url = ? WHERE id = ?",
                )
                .bind(name)
                .bind(description)
                .bind(url)
                .bind(id)
                .execute(&mut *self.conn)
                .await?
            }
            None => {
                sqlx::query("UPDATE documents SET name = ?, description = ? WHERE id = ?")
                    .bind(name)
                    .bind(description)
                    .bind(id)
                    .execute(&mut *self.conn)
                    .await?
            }
        };
        Ok(result.rows_affected())
    }

    pub async fn delete(&mut self, id: DocumentId) -> Result<u64, AutodocError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::pool::ConnectionPool;
    use crate::db::projects::ProjectRepo;
    use tempfile::TempDir;

    async fn pool(dir: &TempDir) -> ConnectionPool {
        let pool = ConnectionPool::new(DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("documents.db").display()),
            min_connections: 0,
            ..DatabaseConfig::default()
        });
        pool.init_schema().await.unwrap();
        pool
    }

    #[tokio::test]
    async fn insert_list_and_lookup_remote_file() {
        let dir = TempDir::new().unwrap();
        let pool = pool(&dir).await;
        let mut lease = pool.acquire().await.unwrap();

        let project = ProjectRepo::new(&mut lease)
            .insert("Alpha", "", "u1", "F1")
            .await
            .unwrap();
        let mut docs = DocumentRepo::new(&mut lease);
        let now = Utc::now();
        let doc = docs
            .insert(project.id, "spec.pdf", "first", "du1", "D1", now)
            .await
            .unwrap();

        assert_eq!(doc.project_id, project.id);
        assert_eq!(doc.remote_file_id.as_deref(), Some("D1"));
        assert_eq!(doc.created_at.timestamp(), now.timestamp());
        assert_eq!(docs.list_by_project(project.id).await.unwrap(), vec![doc.clone()]);
        assert_eq!(docs.remote_file_id(doc.id).await.unwrap(), "D1");
        assert!(docs.remote_file_id(doc.id + 1).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn update_without_url_keeps_existing_url() {
        let dir = TempDir::new().unwrap();
        let pool = pool(&dir).await;
        let mut lease = pool.acquire().await.unwrap();

        let project = ProjectRepo::new(&mut lease)
            .insert("Alpha", "", "u1", "F1")
            .await
            .unwrap();
        let mut docs = DocumentRepo::new(&mut lease);
        let doc = docs
            .insert(project.id, "a", "", "du1", "D1", Utc::now())
            .await
            .unwrap();

        assert_eq!(docs.update(doc.id, "b", "renamed", None).await.unwrap(), 1);
        let after = docs.get(doc.id).await.unwrap().unwrap();
        assert_eq!(after.name, "b");
        assert_eq!(after.url.as_deref(), Some("du1"));

        assert_eq!(docs.update(doc.id, "c", "", Some("du2")).await.unwrap(), 1);
        let after = docs.get(doc.id).await.unwrap().unwrap();
        assert_eq!(after.url.as_deref(), Some("du2"));
    }

    #[tokio::test]
    async fn deleting_project_cascades_to_documents() {
        let dir = TempDir::new().unwrap();
        let pool = pool(&dir).await;
        let mut lease = pool.acquire().await.unwrap();

        let project = ProjectRepo::new(&mut lease)
            .insert("Alpha", "", "u1", "F1")
            .await
            .unwrap();
        let doc = DocumentRepo::new(&mut lease)
            .insert(project.id, "a", "", "du1", "D1", Utc::now())
            .await
            .unwrap();

        assert_eq!(ProjectRepo::new(&mut lease).delete(project.id).await.unwrap(), 1);
        let mut docs = DocumentRepo::new(&mut lease);
        assert!(docs.get(doc.id).await.unwrap().is_none());
        assert_eq!(docs.delete(doc.id).await.unwrap(), 0);
    }
}
