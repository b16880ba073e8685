use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::AutodocError;
use crate::db::{Document, DocumentId, ProjectId};
use crate::router::AutodocState;
use crate::types::{DocumentChanges, FilePayload, FileUpload, NewDocument};

#[derive(Debug, Deserialize)]
pub struct CreateDocumentBody {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub file: FileUpload,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDocumentBody {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub file: Option<FileUpload>,
}

/// GET /projects/{id}/documents
pub async fn list_documents(
    State(state): State<AutodocState>,
    Path(project_id): Path<ProjectId>,
) -> Result<Json<Vec<Document>>, AutodocError> {
    Ok(Json(state.orchestrator.list_documents(project_id).await?))
}

/// POST /projects/{id}/documents
pub async fn create_document(
    State(state): State<AutodocState>,
    Path(project_id): Path<ProjectId>,
    Json(body): Json<CreateDocumentBody>,
) -> Result<(StatusCode, Json<Document>), AutodocError> {
    let new = NewDocument {
        name: body.name,
        description: body.description,
        file: FilePayload::try_from(body.file)?,
    };
    let document = state.orchestrator.create_document(project_id, new).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// GET /documents/{id}
pub async fn get_document(
    State(state): State<AutodocState>,
    Path(id): Path<DocumentId>,
) -> Result<Json<Document>, AutodocError> {
    Ok(Json(state.orchestrator.get_document(id).await?))
}

/// PUT /documents/{id}
pub async fn update_document(
    State(state): State<AutodocState>,
    Path(id): Path<DocumentId>,
    Json(body): Json<UpdateDocumentBody>,
) -> Result<Json<Document>, AutodocError> {
    let changes = DocumentChanges {
        name: body.name,
        description: body.description,
        file: body.file.map(FilePayload::try_from).transpose()?,
    };
    Ok(Json(state.orchestrator.update_document(id, changes).await?))
}

/// DELETE /documents/{id}
pub async fn delete_document(
    State(state): State<AutodocState>,
    Path(id): Path<DocumentId>,
) -> Result<StatusCode, AutodocError> {
    state.orchestrator.delete_document(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
