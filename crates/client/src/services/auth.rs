//! Sign-in, registration and plan selection

use crate::client::{ApiRequest, AuthenticatedClient};
use crate::error::{ClientError, Result, TerminationReason, error_message};
use crate::navigation::Route;
use crate::types::{LoginRequest, PLAN_CATALOG, Plan, PlanInfo, RegisterRequest, RegisterResponse, TokenPair};

/// Message shown when registration fails without a reason from the backend
pub const REGISTRATION_FALLBACK_MESSAGE: &str = "Registration failed.";

/// How a successful registration continued
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Tokens were issued and the user was sent on to checkout
    SignedIn,
    /// The account exists but no tokens were issued; the user was sent to login
    LoginRequired,
}

/// Account entry flows
#[derive(Clone, Debug)]
pub struct AuthService {
    client: AuthenticatedClient,
}

impl AuthService {
    pub const fn new(client: AuthenticatedClient) -> Self {
        Self { client }
    }

    /// Tiers offered on the landing page
    pub const fn plans(&self) -> &'static [PlanInfo] {
        PLAN_CATALOG
    }

    /// Pick a plan on the landing page and continue to registration
    pub fn select_plan(&self, plan: Plan) {
        self.client.navigator().navigate(Route::Register { plan });
    }

    /// Exchange credentials for a session and continue to the dashboard.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidCredentials`] for any refusal; the backend's
    /// reason is not passed on. Transport and storage errors as-is.
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let request = ApiRequest::post("login/").json(&LoginRequest { email, password })?;
        let response = self.client.public().send(&request).await?;

        let status = response.status();
        if !status.is_success() {
            debug!("Login refused with status {status}");
            return Err(ClientError::InvalidCredentials);
        }

        let tokens: TokenPair = response
            .json()
            .await
            .map_err(|_| ClientError::InvalidCredentials)?;
        self.client.session().begin(&tokens)?;
        info!("Signed in as {email}");

        self.client.navigator().navigate(Route::Dashboard);
        Ok(())
    }

    /// Create an account and continue to checkout for `plan`.
    ///
    /// # Errors
    ///
    /// [`ClientError::Rejected`] carrying the backend's `error` text verbatim,
    /// or [`REGISTRATION_FALLBACK_MESSAGE`] when it gives none
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        plan: Plan,
    ) -> Result<RegistrationOutcome> {
        let request = ApiRequest::post("register/").json(&RegisterRequest {
            username,
            email,
            password,
        })?;
        let response = self.client.public().send(&request).await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message =
                error_message(&body).unwrap_or_else(|| REGISTRATION_FALLBACK_MESSAGE.to_string());
            warn!("Registration refused with status {status}: {message}");
            return Err(ClientError::Rejected(message));
        }

        let parsed: RegisterResponse = serde_json::from_str(&body).unwrap_or_default();
        if let Some(tokens) = parsed.into_tokens() {
            self.client.session().begin(&tokens)?;
            info!("Registered {email} for plan {plan}");
            self.client.navigator().navigate(Route::Checkout { plan });
            Ok(RegistrationOutcome::SignedIn)
        } else {
            info!("Registered {email}; no session issued, continuing to login");
            self.client.navigator().navigate(Route::Login);
            Ok(RegistrationOutcome::LoginRequired)
        }
    }

    /// End the session and return to login
    pub fn logout(&self) -> Result<()> {
        self.client.session().clear()?;
        info!("Session ended: {}", TerminationReason::LoggedOut);
        self.client.navigator().navigate(Route::Login);
        Ok(())
    }
}
