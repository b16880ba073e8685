use axum::{Json, http::StatusCode, response::IntoResponse};
use oauth2::basic::BasicErrorResponseType;
use oauth2::reqwest::Error as ReqwestClientError;
use oauth2::{HttpClientError, RequestTokenError, StandardErrorResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum AutodocError {
    #[error("database pool exhausted after {attempts} attempts")]
    PoolExhausted { attempts: u32 },

    #[error("remote {operation} failed with status {status}: {body}")]
    RemoteWrite {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("credential acquisition failed: {0}")]
    Auth(String),

    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl AutodocError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl
    From<
        RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    > for AutodocError
{
    fn from(
        e: RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    ) -> Self {
        match e {
            RequestTokenError::ServerResponse(err) => {
                AutodocError::Auth(format!("identity endpoint rejected request: {}", err.error()))
            }
            RequestTokenError::Request(req_e) => {
                AutodocError::Auth(format!("request failed: {}", req_e))
            }
            RequestTokenError::Parse(parse_err, _body) => {
                AutodocError::Auth(format!("malformed token response: {}", parse_err))
            }
            RequestTokenError::Other(s) => AutodocError::Auth(s),
        }
    }
}

impl IntoResponse for AutodocError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            AutodocError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody {
                    code: "VALIDATION_ERROR".to_string(),
                    message: msg,
                },
            ),
            AutodocError::NotFound { resource, id } => (
                StatusCode::NOT_FOUND,
                ApiErrorBody {
                    code: "NOT_FOUND".to_string(),
                    message: format!("{resource} {id} not found"),
                },
            ),
            AutodocError::PoolExhausted { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiErrorBody {
                    code: "POOL_EXHAUSTED".to_string(),
                    message: "No database connection available.".to_string(),
                },
            ),
            AutodocError::RemoteWrite {
                operation, status, ..
            } => (
                StatusCode::BAD_GATEWAY,
                ApiErrorBody {
                    code: "REMOTE_WRITE_ERROR".to_string(),
                    message: format!("Remote store {operation} failed with status {status}."),
                },
            ),
            AutodocError::Auth(_) => (
                StatusCode::BAD_GATEWAY,
                ApiErrorBody {
                    code: "REMOTE_AUTH_ERROR".to_string(),
                    message: "Could not obtain a remote store credential.".to_string(),
                },
            ),
            AutodocError::Reqwest(_) => (
                StatusCode::BAD_GATEWAY,
                ApiErrorBody {
                    code: "BAD_GATEWAY".to_string(),
                    message: "Remote store is unavailable.".to_string(),
                },
            ),
            AutodocError::Database(_) | AutodocError::UrlParse(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred.".to_string(),
                },
            ),
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
