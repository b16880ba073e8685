use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    routing::get,
};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::handlers::{documents, projects};
use crate::service::Orchestrator;

/// Base64 inflates uploads by a third; leave room for the small-file limit.
pub const BODY_LIMIT: usize = 8 * 1024 * 1024;

#[derive(Clone)]
pub struct AutodocState {
    pub orchestrator: Arc<Orchestrator>,
}

impl AutodocState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

pub fn autodoc_router(state: AutodocState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/projects/{id}",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        .route(
            "/projects/{id}/documents",
            get(documents::list_documents).post(documents::create_document),
        )
        .route(
            "/documents/{id}",
            get(documents::get_document)
                .put(documents::update_document)
                .delete(documents::delete_document),
        )
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
