use crate::config::RemoteConfig;
use crate::error::AutodocError;
use crate::remote::{AccessToken, RemoteItem, RemoteStore};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{error, info};
use url::Url;

/// Drive-backed remote store reached over the Graph REST API.
///
/// Folders live directly under the configured drive's root; files are
/// uploaded with the simple (single request) upload endpoint.
pub struct GraphStore {
    http: reqwest::Client,
    base_url: Url,
    site_id: String,
    drive_id: String,
}

#[derive(Deserialize)]
struct WebUrl {
    #[serde(rename = "webUrl")]
    web_url: String,
}

impl GraphStore {
    pub fn new(cfg: &RemoteConfig) -> Result<Self, AutodocError> {
        let http = reqwest::Client::builder()
            .user_agent("autodoc/1.0")
            .connect_timeout(Duration::from_secs(5))
            .timeout(cfg.request_timeout())
            .build()?;
        Self::with_client(http, cfg)
    }

    pub fn with_client(http: reqwest::Client, cfg: &RemoteConfig) -> Result<Self, AutodocError> {
        let base_url = Url::parse(&cfg.graph_base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase.into());
        }
        Ok(Self {
            http,
            base_url,
            site_id: cfg.site_id.clone(),
            drive_id: cfg.drive_id.clone(),
        })
    }

    fn endpoint<I>(&self, segments: I) -> Result<Url, AutodocError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn item_url(&self, item_id: &str) -> Result<Url, AutodocError> {
        self.endpoint(["drives", self.drive_id.as_str(), "items", item_id])
    }

    async fn delete_item(
        &self,
        token: &AccessToken,
        item_id: &str,
        operation: &'static str,
    ) -> Result<(), AutodocError> {
        let resp = self
            .http
            .delete(self.item_url(item_id)?)
            .bearer_auth(token.secret())
            .send()
            .await?;
        match resp.status() {
            StatusCode::NO_CONTENT => {
                info!(item_id, "Remote {operation} succeeded");
                Ok(())
            }
            StatusCode::NOT_FOUND => {
                info!(item_id, "Remote {operation}: item already absent");
                Ok(())
            }
            _ => Err(rejected(resp, operation).await),
        }
    }
}

#[async_trait]
impl RemoteStore for GraphStore {
    async fn create_folder(
        &self,
        token: &AccessToken,
        name: &str,
    ) -> Result<RemoteItem, AutodocError> {
        let url = self.endpoint([
            "sites",
            self.site_id.as_str(),
            "drives",
            self.drive_id.as_str(),
            "root",
            "children",
        ])?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(token.secret())
            .json(&json!({
                "name": name,
                "folder": {},
                "@microsoft.graph.conflictBehavior": "rename"
            }))
            .send()
            .await?;
        let item: RemoteItem = accepted(resp, "create folder").await?.json().await?;
        info!(folder_id = %item.id, name, "Remote folder created");
        Ok(item)
    }

    async fn rename_folder(
        &self,
        token: &AccessToken,
        folder_id: &str,
        new_name: &str,
    ) -> Result<String, AutodocError> {
        let resp = self
            .http
            .patch(self.item_url(folder_id)?)
            .bearer_auth(token.secret())
            .json(&json!({ "name": new_name }))
            .send()
            .await?;
        let renamed: WebUrl = accepted(resp, "rename folder").await?.json().await?;
        info!(folder_id, new_name, "Remote folder renamed");
        Ok(renamed.web_url)
    }

    async fn delete_folder(
        &self,
        token: &AccessToken,
        folder_id: &str,
    ) -> Result<(), AutodocError> {
        self.delete_item(token, folder_id, "delete folder").await
    }

    async fn upload_file(
        &self,
        token: &AccessToken,
        folder_id: &str,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<RemoteItem, AutodocError> {
        // items/{parent}:/{filename}:/content addresses a child by path
        let url = self.endpoint([
            "drives".to_string(),
            self.drive_id.clone(),
            "items".to_string(),
            format!("{folder_id}:"),
            format!("{filename}:"),
            "content".to_string(),
        ])?;
        let size = content.len();
        let resp = self
            .http
            .put(url)
            .bearer_auth(token.secret())
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(content)
            .send()
            .await?;
        let item: RemoteItem = accepted(resp, "upload file").await?.json().await?;
        info!(file_id = %item.id, folder_id, filename, size, "Remote file uploaded");
        Ok(item)
    }

    async fn replace_file_content(
        &self,
        token: &AccessToken,
        file_id: &str,
        content: Vec<u8>,
    ) -> Result<String, AutodocError> {
        let url = self.endpoint(["drives", self.drive_id.as_str(), "items", file_id, "content"])?;
        let size = content.len();
        let resp = self
            .http
            .put(url)
            .bearer_auth(token.secret())
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(content)
            .send()
            .await?;
        let replaced: WebUrl = accepted(resp, "replace file").await?.json().await?;
        info!(file_id, size, "Remote file content replaced");
        Ok(replaced.web_url)
    }

    async fn delete_file(&self, token: &AccessToken, file_id: &str) -> Result<(), AutodocError> {
        self.delete_item(token, file_id, "delete file").await
    }
}

async fn accepted(resp: Response, operation: &'static str) -> Result<Response, AutodocError> {
    if resp.status().is_success() {
        Ok(resp)
    } else {
        Err(rejected(resp, operation).await)
    }
}

async fn rejected(resp: Response, operation: &'static str) -> AutodocError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    error!(operation, status, body = %body, "Remote store rejected request");
    AutodocError::RemoteWrite {
        operation,
        status,
        body,
    }
}
