use crate::config::RemoteConfig;
use crate::error::AutodocError;
use crate::remote::{AccessToken, TokenProvider};

use async_trait::async_trait;
use chrono::Utc;
use oauth2::{
    ClientId, ClientSecret, EndpointNotSet, EndpointSet, Scope, TokenResponse, TokenUrl,
    basic::BasicClient,
};
use std::time::Duration;
use tracing::{error, info};

pub(super) type GraphOauth2Client =
    BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Client-credentials grant against the identity endpoint.
///
/// Every call performs a new token request; nothing is cached.
pub struct ClientCredentialsProvider {
    client: GraphOauth2Client,
    http: reqwest::Client,
    scope: String,
}

impl ClientCredentialsProvider {
    pub fn new(cfg: &RemoteConfig) -> Result<Self, AutodocError> {
        let http = reqwest::Client::builder()
            .user_agent("autodoc-oauth/1.0")
            .connect_timeout(Duration::from_secs(5))
            .timeout(cfg.request_timeout())
            // token responses must not be followed through redirects
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            client: build_oauth2_client(cfg)?,
            http,
            scope: cfg.scope.clone(),
        })
    }
}

#[async_trait]
impl TokenProvider for ClientCredentialsProvider {
    async fn access_token(&self) -> Result<AccessToken, AutodocError> {
        let response = self
            .client
            .exchange_client_credentials()
            .add_scope(Scope::new(self.scope.clone()))
            .request_async(&self.http)
            .await
            .map_err(|e| {
                let err = AutodocError::from(e);
                error!(error = %err, "Access token request failed");
                err
            })?;

        // lifetimes past the representable range are treated as open-ended
        let expires_at = response
            .expires_in()
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));
        info!(
            expires_in = ?response.expires_in(),
            "Access token acquired successfully"
        );
        Ok(AccessToken::new(
            response.access_token().secret().clone(),
            expires_at,
        ))
    }
}

fn build_oauth2_client(cfg: &RemoteConfig) -> Result<GraphOauth2Client, AutodocError> {
    let client = BasicClient::new(ClientId::new(cfg.client_id.clone()))
        .set_client_secret(ClientSecret::new(cfg.client_secret.clone()))
        .set_token_uri(TokenUrl::new(cfg.token_endpoint())?);
    Ok(client)
}
