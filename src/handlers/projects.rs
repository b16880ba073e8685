use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::AutodocError;
use crate::db::{Project, ProjectId};
use crate::router::AutodocState;
use crate::types::{NewProject, ProjectChanges};

#[derive(Debug, Deserialize)]
pub struct ProjectQuery {
    /// Case-insensitive substring match on the project name.
    pub name: Option<String>,
}

/// GET /projects[?name=...]
pub async fn list_projects(
    State(state): State<AutodocState>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<Vec<Project>>, AutodocError> {
    let filter = query.name.filter(|n| !n.trim().is_empty());
    Ok(Json(state.orchestrator.list_projects(filter).await?))
}

/// GET /projects/{id}
pub async fn get_project(
    State(state): State<AutodocState>,
    Path(id): Path<ProjectId>,
) -> Result<Json<Project>, AutodocError> {
    Ok(Json(state.orchestrator.get_project(id).await?))
}

/// POST /projects
pub async fn create_project(
    State(state): State<AutodocState>,
    Json(body): Json<NewProject>,
) -> Result<(StatusCode, Json<Project>), AutodocError> {
    let project = state.orchestrator.create_project(body).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// PUT /projects/{id}
pub async fn update_project(
    State(state): State<AutodocState>,
    Path(id): Path<ProjectId>,
    Json(body): Json<ProjectChanges>,
) -> Result<Json<Project>, AutodocError> {
    Ok(Json(state.orchestrator.update_project(id, body).await?))
}

/// DELETE /projects/{id}
pub async fn delete_project(
    State(state): State<AutodocState>,
    Path(id): Path<ProjectId>,
) -> Result<StatusCode, AutodocError> {
    state.orchestrator.delete_project(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
