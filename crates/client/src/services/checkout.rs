//! Subscription activation on entering checkout

use crate::client::{ApiRequest, AuthenticatedClient};
use crate::error::{ClientError, Result, error_message};
use crate::navigation::Route;
use crate::types::{Plan, SubscribeRequest, SubscribeResponse};
use url::Url;

/// Message shown when activation fails without a reason from the backend
pub const CHECKOUT_FALLBACK_MESSAGE: &str = "Something went wrong";

/// Where activation left the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Payment has to be completed on a hosted page first
    PaymentRequired(Url),
    /// The plan is active straight away
    Activated { message: Option<String> },
}

/// Checkout flow
#[derive(Clone, Debug)]
pub struct CheckoutService {
    client: AuthenticatedClient,
}

impl CheckoutService {
    pub const fn new(client: AuthenticatedClient) -> Self {
        Self { client }
    }

    /// Activate `plan` for the signed-in user.
    ///
    /// Navigates to the hosted payment page when the server returns one,
    /// otherwise to the dashboard.
    ///
    /// # Errors
    ///
    /// [`ClientError::SessionTerminated`] without a usable session (no
    /// subscribe call is made when nothing is stored);
    /// [`ClientError::Rejected`] with the backend's `error` text or
    /// [`CHECKOUT_FALLBACK_MESSAGE`] when the server refuses.
    pub async fn activate(&self, plan: &Plan) -> Result<CheckoutOutcome> {
        let request = ApiRequest::post("subscribe/").json(&SubscribeRequest { plan })?;
        let response = self.client.send(&request).await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message =
                error_message(&body).unwrap_or_else(|| CHECKOUT_FALLBACK_MESSAGE.to_string());
            warn!("Activation of plan {plan} refused with status {status}: {message}");
            return Err(ClientError::Rejected(message));
        }

        let parsed: SubscribeResponse = serde_json::from_str(&body).unwrap_or_default();
        match parsed.checkout_url.filter(|url| !url.is_empty()) {
            Some(checkout_url) => {
                let url = Url::parse(&checkout_url).map_err(|e| {
                    ClientError::Rejected(format!("invalid checkout URL {checkout_url:?}: {e}"))
                })?;
                info!("Plan {plan} requires payment, redirecting to checkout page");
                self.client.navigator().navigate(Route::External(url.clone()));
                Ok(CheckoutOutcome::PaymentRequired(url))
            }
            None => {
                info!("Plan {plan} activated");
                self.client.navigator().navigate(Route::Dashboard);
                Ok(CheckoutOutcome::Activated {
                    message: parsed.message,
                })
            }
        }
    }
}
