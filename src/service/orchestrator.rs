use crate::config::SMALL_FILE_LIMIT;
use crate::db::{ConnectionPool, Document, DocumentId, DocumentRepo, Project, ProjectId, ProjectRepo};
use crate::error::AutodocError;
use crate::remote::{AccessToken, RemoteStore, TokenProvider};
use crate::types::{DocumentChanges, NewDocument, NewProject, ProjectChanges};

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Remote store plus the credential source it needs; cheap to clone into
/// transaction blocks.
#[derive(Clone)]
struct RemoteSide {
    store: Arc<dyn RemoteStore>,
    tokens: Arc<dyn TokenProvider>,
}

impl RemoteSide {
    /// A fresh credential for one orchestrated operation. A token that is
    /// already stale on arrival is refused before any remote write.
    async fn credential(&self) -> Result<AccessToken, AutodocError> {
        let token = self.tokens.access_token().await?;
        if token.is_expired() {
            warn!(expires_at = ?token.expires_at(), "Identity endpoint issued an expired credential");
            return Err(AutodocError::Auth(
                "identity endpoint issued an expired token".to_string(),
            ));
        }
        debug!(expires_at = ?token.expires_at(), "Remote credential fetched");
        Ok(token)
    }
}

/// Keeps projects and documents consistent between the database and the
/// remote store.
///
/// Creates and deletes go to the remote store first, so a row never points
/// at a remote object that was not confirmed. Deletes run their lookup,
/// remote call and row removal inside one write transaction; updates look
/// the linkage up, call the remote store outside any transaction, then
/// write the row in a short one. Every block that writes takes the database
/// write lock up front, so concurrent operations queue instead of failing
/// after their remote side already changed.
pub struct Orchestrator {
    pool: ConnectionPool,
    remote: RemoteSide,
    upload_limit: usize,
}

impl Orchestrator {
    pub fn new(
        pool: ConnectionPool,
        store: Arc<dyn RemoteStore>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            pool,
            remote: RemoteSide { store, tokens },
            upload_limit: SMALL_FILE_LIMIT,
        }
    }

    pub fn with_upload_limit(mut self, upload_limit: usize) -> Self {
        self.upload_limit = upload_limit;
        self
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    // ---- projects ----

    pub async fn list_projects(
        &self,
        name_filter: Option<String>,
    ) -> Result<Vec<Project>, AutodocError> {
        self.pool
            .transaction(move |conn| {
                Box::pin(async move { ProjectRepo::new(conn).list(name_filter.as_deref()).await })
            })
            .await
    }

    pub async fn get_project(&self, id: ProjectId) -> Result<Project, AutodocError> {
        self.pool
            .transaction(move |conn| Box::pin(async move { ProjectRepo::new(conn).get(id).await }))
            .await?
            .ok_or_else(|| AutodocError::not_found("project", id))
    }

    /// Remote folder first, then the row that records it.
    pub async fn create_project(&self, new: NewProject) -> Result<Project, AutodocError> {
        new.validate()?;

        let token = self.remote.credential().await?;
        let folder = self.remote.store.create_folder(&token, &new.name).await?;

        let NewProject { name, description } = new;
        let linked = folder.clone();
        let inserted = self
            .pool
            .write_transaction(move |conn| {
                Box::pin(async move {
                    ProjectRepo::new(conn)
                        .insert(&name, &description, &linked.url, &linked.id)
                        .await
                })
            })
            .await;

        match inserted {
            Ok(project) => {
                info!(project_id = project.id, folder_id = %folder.id, "Project created");
                Ok(project)
            }
            Err(err) => {
                error!(folder_id = %folder.id, error = %err, "Project insert failed after remote folder was created");
                self.discard_orphan(&token, &folder.id, Orphan::Folder).await;
                Err(err)
            }
        }
    }

    /// Rename the remote folder, then record the new name and URL.
    pub async fn update_project(
        &self,
        id: ProjectId,
        changes: ProjectChanges,
    ) -> Result<Project, AutodocError> {
        changes.validate()?;

        let folder_id = self
            .pool
            .transaction(move |conn| {
                Box::pin(async move { ProjectRepo::new(conn).remote_folder_id(id).await })
            })
            .await?;

        let token = self.remote.credential().await?;
        let url = self
            .remote
            .store
            .rename_folder(&token, &folder_id, &changes.name)
            .await?;

        let ProjectChanges { name, description } = changes;
        self.pool
            .write_transaction(move |conn| {
                Box::pin(async move {
                    let mut repo = ProjectRepo::new(conn);
                    if repo.update(id, &name, &description, &url).await? == 0 {
                        warn!(
                            project_id = id,
                            folder_id = %folder_id,
                            "Remote folder renamed but project row is gone"
                        );
                        return Err(AutodocError::not_found("project", id));
                    }
                    info!(project_id = id, "Project updated");
                    repo.get(id)
                        .await?
                        .ok_or_else(|| AutodocError::not_found("project", id))
                })
            })
            .await
    }

    /// Remove the remote folder, then the row. A project that was never
    /// linked to a folder is reported as not found and left untouched.
    pub async fn delete_project(&self, id: ProjectId) -> Result<(), AutodocError> {
        let remote = self.remote.clone();
        self.pool
            .write_transaction(move |conn| {
                Box::pin(async move {
                    let folder_id = ProjectRepo::new(&mut *conn).remote_folder_id(id).await?;
                    let token = remote.credential().await?;
                    remote.store.delete_folder(&token, &folder_id).await?;

                    if ProjectRepo::new(conn).delete(id).await? == 0 {
                        return Err(AutodocError::not_found("project", id));
                    }
                    info!(project_id = id, folder_id = %folder_id, "Project deleted");
                    Ok(())
                })
            })
            .await
    }

    // ---- documents ----

    pub async fn list_documents(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<Document>, AutodocError> {
        self.pool
            .transaction(move |conn| {
                Box::pin(async move { DocumentRepo::new(conn).list_by_project(project_id).await })
            })
            .await
    }

    pub async fn get_document(&self, id: DocumentId) -> Result<Document, AutodocError> {
        self.pool
            .transaction(move |conn| Box::pin(async move { DocumentRepo::new(conn).get(id).await }))
            .await?
            .ok_or_else(|| AutodocError::not_found("document", id))
    }

    /// Upload into the project's folder, then insert the row.
    pub async fn create_document(
        &self,
        project_id: ProjectId,
        new: NewDocument,
    ) -> Result<Document, AutodocError> {
        new.validate(self.upload_limit)?;

        let folder_id = self
            .pool
            .transaction(move |conn| {
                Box::pin(async move { ProjectRepo::new(conn).remote_folder_id(project_id).await })
            })
            .await?;

        let token = self.remote.credential().await?;
        let NewDocument {
            name,
            description,
            file,
        } = new;
        let item = self
            .remote
            .store
            .upload_file(&token, &folder_id, &file.filename, file.content)
            .await?;

        let linked = item.clone();
        let inserted = self
            .pool
            .write_transaction(move |conn| {
                Box::pin(async move {
                    DocumentRepo::new(conn)
                        .insert(
                            project_id,
                            &name,
                            &description,
                            &linked.url,
                            &linked.id,
                            Utc::now(),
                        )
                        .await
                })
            })
            .await;

        match inserted {
            Ok(document) => {
                info!(document_id = document.id, project_id, file_id = %item.id, "Document created");
                Ok(document)
            }
            Err(err) => {
                error!(file_id = %item.id, error = %err, "Document insert failed after upload");
                self.discard_orphan(&token, &item.id, Orphan::File).await;
                Err(err)
            }
        }
    }

    /// Metadata-only changes never reach the remote store; new content
    /// replaces the remote file and refreshes the stored URL.
    pub async fn update_document(
        &self,
        id: DocumentId,
        changes: DocumentChanges,
    ) -> Result<Document, AutodocError> {
        changes.validate(self.upload_limit)?;

        let DocumentChanges {
            name,
            description,
            file,
        } = changes;

        let url = match file {
            Some(file) => {
                let file_id = self
                    .pool
                    .transaction(move |conn| {
                        Box::pin(async move { DocumentRepo::new(conn).remote_file_id(id).await })
                    })
                    .await?;
                let token = self.remote.credential().await?;
                let url = self
                    .remote
                    .store
                    .replace_file_content(&token, &file_id, file.content)
                    .await?;
                Some(url)
            }
            None => None,
        };

        self.pool
            .write_transaction(move |conn| {
                Box::pin(async move {
                    let mut repo = DocumentRepo::new(conn);
                    if repo.update(id, &name, &description, url.as_deref()).await? == 0 {
                        return Err(AutodocError::not_found("document", id));
                    }
                    info!(document_id = id, content_replaced = url.is_some(), "Document updated");
                    repo.get(id)
                        .await?
                        .ok_or_else(|| AutodocError::not_found("document", id))
                })
            })
            .await
    }

    /// Remove the remote file when one is linked, then the row. Unlike
    /// projects, a missing linkage does not block the row deletion.
    pub async fn delete_document(&self, id: DocumentId) -> Result<(), AutodocError> {
        let remote = self.remote.clone();
        self.pool
            .write_transaction(move |conn| {
                Box::pin(async move {
                    let file_id = match DocumentRepo::new(&mut *conn).remote_file_id(id).await {
                        Ok(file_id) => Some(file_id),
                        Err(err) if err.is_not_found() => {
                            info!(document_id = id, "No remote file linked; deleting row only");
                            None
                        }
                        Err(err) => return Err(err),
                    };

                    if let Some(file_id) = &file_id {
                        let token = remote.credential().await?;
                        remote.store.delete_file(&token, file_id).await?;
                    }

                    if DocumentRepo::new(conn).delete(id).await? == 0 {
                        return Err(AutodocError::not_found("document", id));
                    }
                    info!(document_id = id, file_id = ?file_id, "Document deleted");
                    Ok(())
                })
            })
            .await
    }

    /// Best-effort removal of a remote object whose row could not be written.
    async fn discard_orphan(&self, token: &AccessToken, remote_id: &str, kind: Orphan) {
        let outcome = match kind {
            Orphan::Folder => self.remote.store.delete_folder(token, remote_id).await,
            Orphan::File => self.remote.store.delete_file(token, remote_id).await,
        };
        match outcome {
            Ok(()) => info!(remote_id, ?kind, "Orphaned remote object removed"),
            Err(e) => error!(remote_id, ?kind, error = %e, "Orphaned remote object left behind"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Orphan {
    Folder,
    File,
}
