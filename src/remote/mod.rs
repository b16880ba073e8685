//! Remote document store: bearer credentials and folder/file operations.
//!
//! The orchestrator only sees the [`TokenProvider`] and [`RemoteStore`]
//! traits; [`graph`] and [`token`] are the HTTP implementations.

pub mod graph;
pub mod token;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AutodocError;

pub use graph::GraphStore;
pub use token::ClientCredentialsProvider;

/// Identifier and canonical URL of a remote folder or file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    pub id: String,
    #[serde(rename = "webUrl")]
    pub url: String,
}

/// Short-lived bearer credential. Never persisted.
#[derive(Clone)]
pub struct AccessToken {
    secret: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Tokens without an advertised lifetime are treated as live.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Produces a fresh credential for the remote store.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Fails with [`AutodocError::Auth`] when the identity endpoint refuses.
    async fn access_token(&self) -> Result<AccessToken, AutodocError>;
}

/// Folder and file operations against the remote store.
///
/// Every call can fail on its own, independently of the database. Deletes
/// treat an already-absent object as success.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn create_folder(
        &self,
        token: &AccessToken,
        name: &str,
    ) -> Result<RemoteItem, AutodocError>;

    /// Returns the folder's new URL.
    async fn rename_folder(
        &self,
        token: &AccessToken,
        folder_id: &str,
        new_name: &str,
    ) -> Result<String, AutodocError>;

    async fn delete_folder(&self, token: &AccessToken, folder_id: &str)
    -> Result<(), AutodocError>;

    async fn upload_file(
        &self,
        token: &AccessToken,
        folder_id: &str,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<RemoteItem, AutodocError>;

    /// Returns the file's URL after the write.
    async fn replace_file_content(
        &self,
        token: &AccessToken,
        file_id: &str,
        content: Vec<u8>,
    ) -> Result<String, AutodocError>;

    async fn delete_file(&self, token: &AccessToken, file_id: &str) -> Result<(), AutodocError>;
}
