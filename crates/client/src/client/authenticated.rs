//! Bearer-token client with one-shot refresh

use super::{ApiRequest, PublicClient, decode};
use crate::error::{ClientError, Result, TerminationReason};
use crate::navigation::{Navigator, Route};
use crate::session::SessionManager;
use crate::types::{RefreshRequest, RefreshResponse};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use std::sync::Arc;
use tokio::sync::Mutex;

const REFRESH_PATH: &str = "refresh/";

/// Client for endpoints that require the signed-in user's access token.
///
/// A 401 triggers at most one refresh followed by at most one retry per
/// request. Refreshes are serialized: callers that hit a 401 while another
/// refresh is running wait for it and reuse its token. If the refresh is
/// refused the session is cleared and the navigator is sent to the login
/// route; the call then yields [`ClientError::SessionTerminated`].
///
/// Clones share the session, the navigator and the refresh gate.
#[derive(Clone)]
pub struct AuthenticatedClient {
    public: PublicClient,
    session: SessionManager,
    navigator: Arc<dyn Navigator>,
    refresh_gate: Arc<Mutex<()>>,
}

impl AuthenticatedClient {
    pub fn new(public: PublicClient, session: SessionManager, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            public,
            session,
            navigator,
            refresh_gate: Arc::new(Mutex::new(())),
        }
    }

    pub const fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn navigator(&self) -> &dyn Navigator {
        self.navigator.as_ref()
    }

    /// The underlying client for unauthenticated endpoints
    pub const fn public(&self) -> &PublicClient {
        &self.public
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.public.base_url()
    }

    /// Issue `request` with the stored access token.
    ///
    /// Any response other than 401 is returned untouched, error statuses
    /// included. After a successful refresh the retry's response is returned
    /// whatever its status.
    ///
    /// # Errors
    ///
    /// [`ClientError::SessionTerminated`] when there is no readable session
    /// or the refresh fails; transport and storage errors otherwise.
    pub async fn send(&self, request: &ApiRequest) -> Result<reqwest::Response> {
        // An unreadable store holds no usable session
        let stored = self.session.access_token().unwrap_or_else(|e| {
            warn!("Failed to read stored access token: {e}");
            None
        });
        let Some(token) = stored else {
            return Err(self.terminate_session(TerminationReason::MissingAccessToken));
        };

        let response = self.dispatch(request, &token).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!(
            "{} {} answered 401, refreshing access token",
            request.method(),
            request.path()
        );
        let fresh = self.refresh_after(&token).await?;
        self.dispatch(request, &fresh).await
    }

    /// Issue `request` and decode a successful JSON body
    ///
    /// # Errors
    ///
    /// As [`send`](Self::send), plus a status-derived error for non-2xx
    /// responses
    pub async fn execute<T: serde::de::DeserializeOwned>(&self, request: &ApiRequest) -> Result<T> {
        let response = self.send(request).await?;
        decode(response).await
    }

    /// Clear both tokens and send the user to the login route.
    ///
    /// Returns the error callers should propagate in place of a result.
    pub fn terminate_session(&self, reason: TerminationReason) -> ClientError {
        warn!("Terminating session: {reason}");
        if let Err(e) = self.session.clear() {
            error!("Failed to clear stored session: {e}");
        }
        self.navigator.navigate(Route::Login);
        ClientError::SessionTerminated(reason)
    }

    async fn dispatch(&self, request: &ApiRequest, token: &str) -> Result<reqwest::Response> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            ClientError::Storage("stored access token is not a valid header value".into())
        })?;
        value.set_sensitive(true);

        self.public
            .send(&request.clone().header(AUTHORIZATION, value))
            .await
    }

    /// Obtain a usable access token after `stale` was refused.
    ///
    /// Holding the gate for the whole refresh means a concurrent caller
    /// resumes only once the outcome is stored: either a different access
    /// token (reuse it) or no token at all (the session is gone).
    async fn refresh_after(&self, stale: &str) -> Result<String> {
        let _gate = self.refresh_gate.lock().await;

        match self.session.access_token()? {
            Some(current) if current != stale => {
                debug!("Access token already refreshed by a concurrent request");
                return Ok(current);
            }
            Some(_) => {}
            None => return Err(ClientError::SessionTerminated(TerminationReason::MissingAccessToken)),
        }

        let Some(refresh_token) = self.session.refresh_token()? else {
            return Err(self.terminate_session(TerminationReason::MissingRefreshToken));
        };

        let request = ApiRequest::post(REFRESH_PATH).json(&RefreshRequest {
            refresh: &refresh_token,
        })?;
        let response = self.public.send(&request).await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Refresh token rejected with status {status}");
            return Err(self.terminate_session(TerminationReason::RefreshRejected(status.as_u16())));
        }

        let body: RefreshResponse = response.json().await.unwrap_or_default();
        let Some(access) = body.access else {
            return Err(self.terminate_session(TerminationReason::RefreshIncomplete));
        };

        self.session.set_access_token(&access)?;
        if let Some(rotated) = body.refresh {
            self.session.set_refresh_token(&rotated)?;
        }
        info!("Access token refreshed");
        Ok(access)
    }
}

impl std::fmt::Debug for AuthenticatedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedClient")
            .field("base_url", &self.public.base_url())
            .finish_non_exhaustive()
    }
}
