//! Tollgate HTTP clients
//!
//! [`PublicClient`] talks to endpoints that need no credentials (login,
//! registration, token refresh). [`AuthenticatedClient`] wraps it with the
//! stored session and handles access-token expiry.

mod authenticated;
mod endpoints;
mod request;

pub use authenticated::AuthenticatedClient;
pub use request::ApiRequest;

use crate::config::ApiConfig;
use crate::error::{ClientError, Result};
use crate::navigation::Navigator;
use crate::session::SessionManager;
use reqwest::{Client, ClientBuilder};
use std::sync::Arc;
use std::time::Duration;

/// Client for endpoints that don't require authentication
#[derive(Clone)]
pub struct PublicClient {
    client: Client,
    base_url: String,
}

impl PublicClient {
    /// Create a new public client with default settings
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        TollgateClientBuilder::new().base_url(base_url).build_public()
    }

    /// Create a client builder
    pub fn builder() -> TollgateClientBuilder {
        TollgateClientBuilder::new()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a request without credentials
    pub async fn send(&self, request: &ApiRequest) -> Result<reqwest::Response> {
        debug!("{} {}", request.method(), request.path());
        Ok(request
            .to_builder(&self.client, &self.base_url)
            .send()
            .await?)
    }

    /// Issue a request and decode a successful JSON body
    pub async fn execute<T: serde::de::DeserializeOwned>(&self, request: &ApiRequest) -> Result<T> {
        let response = self.send(request).await?;
        decode(response).await
    }

    /// Bind the client to a session to get an authenticated client
    pub fn authenticate(
        self,
        session: SessionManager,
        navigator: Arc<dyn Navigator>,
    ) -> AuthenticatedClient {
        AuthenticatedClient::new(self, session, navigator)
    }
}

/// Decode a 2xx JSON body, or turn any other status into an error
pub(crate) async fn decode<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T> {
    if response.status().is_success() {
        Ok(response.json().await?)
    } else {
        Err(ClientError::from_response(response).await)
    }
}

/// Builder for the Tollgate clients
#[derive(Debug, Default)]
pub struct TollgateClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl TollgateClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pre-filled from configuration
    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            base_url: Some(config.base_url.clone()),
            timeout: config.timeout(),
            user_agent: Some(config.user_agent.clone()),
        }
    }

    /// Set the base URL
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build a public client
    pub fn build_public(self) -> Result<PublicClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        url::Url::parse(&base_url)
            .map_err(|e| ClientError::Configuration(format!("invalid base_url: {e}")))?;

        // Endpoint paths are joined with a single slash
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut builder = ClientBuilder::new().user_agent(
            self.user_agent
                .unwrap_or_else(|| format!("tollgate-client/{}", env!("CARGO_PKG_VERSION"))),
        );
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(PublicClient {
            client: builder.build()?,
            base_url,
        })
    }

    /// Build an authenticated client bound to `session`
    pub fn build_authenticated(
        self,
        session: SessionManager,
        navigator: Arc<dyn Navigator>,
    ) -> Result<AuthenticatedClient> {
        Ok(self.build_public()?.authenticate(session, navigator))
    }
}
