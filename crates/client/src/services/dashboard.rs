//! Dashboard aggregation and subscription management

use crate::client::{ApiRequest, AuthenticatedClient};
use crate::error::{ClientError, Result, TerminationReason};
use crate::types::{CancelResponse, Profile, SubscriptionStatus, Transaction};
use std::fmt;

/// Message shown when cancellation fails without a reason from the backend
pub const CANCEL_FALLBACK_MESSAGE: &str = "Something went wrong";

/// Independently loaded part of the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Profile,
    Transactions,
    Subscription,
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Profile => "profile",
            Self::Transactions => "transactions",
            Self::Subscription => "subscription",
        };
        f.write_str(name)
    }
}

/// A panel that failed to load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelError {
    pub panel: Panel,
    pub message: String,
}

/// Locally held dashboard view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardState {
    pub profile: Option<Profile>,
    pub transactions: Vec<Transaction>,
    pub subscription: Option<SubscriptionStatus>,
    pub errors: Vec<PanelError>,
}

impl DashboardState {
    /// Failure recorded for `panel`, if any
    pub fn error_for(&self, panel: Panel) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.panel == panel)
            .map(|e| e.message.as_str())
    }
}

/// Dashboard flow
#[derive(Clone, Debug)]
pub struct DashboardService {
    client: AuthenticatedClient,
}

impl DashboardService {
    pub const fn new(client: AuthenticatedClient) -> Self {
        Self { client }
    }

    /// Load profile, transactions and subscription concurrently.
    ///
    /// A panel that fails records its error and leaves the others alone.
    ///
    /// # Errors
    ///
    /// [`ClientError::SessionTerminated`] when there is no readable session
    /// or any of the calls ended it.
    pub async fn load(&self) -> Result<DashboardState> {
        if !self.client.session().has_session().unwrap_or(false) {
            return Err(self
                .client
                .terminate_session(TerminationReason::MissingAccessToken));
        }

        let (profile, transactions, subscription) = futures::join!(
            self.client.profile(),
            self.client.transactions(),
            self.client.subscription_status(),
        );

        let mut errors = Vec::new();
        let profile = settle(profile, Panel::Profile, &mut errors)?;
        let transactions =
            settle(transactions, Panel::Transactions, &mut errors)?.unwrap_or_default();
        let subscription = match subscription {
            // No active subscription is reported as 404
            Err(ClientError::NotFound(_)) => None,
            other => settle(other, Panel::Subscription, &mut errors)?.flatten(),
        };

        Ok(DashboardState {
            profile,
            transactions,
            subscription,
            errors,
        })
    }

    /// Switch to `price_id` and record the resulting plan locally
    ///
    /// # Errors
    ///
    /// As [`AuthenticatedClient::execute`]; `state` is untouched on error
    pub async fn upgrade(&self, state: &mut DashboardState, price_id: &str) -> Result<String> {
        let response = self.client.upgrade(price_id).await?;
        info!("Subscription moved to plan {}", response.plan);

        match state.subscription.as_mut() {
            Some(subscription) => subscription.plan.clone_from(&response.plan),
            None => {
                state.subscription = Some(SubscriptionStatus {
                    plan: response.plan.clone(),
                    is_active: true,
                    subscription_id: None,
                    status: None,
                });
            }
        }
        Ok(response.plan)
    }

    /// Cancel the subscription and forget it locally
    ///
    /// # Errors
    ///
    /// [`ClientError::Rejected`] with the backend's `error` text verbatim, or
    /// [`CANCEL_FALLBACK_MESSAGE`] when the response carries neither `error`
    /// nor `message`; `state` is untouched on error
    pub async fn cancel(&self, state: &mut DashboardState) -> Result<String> {
        let response = self.client.send(&ApiRequest::post("cancel/")).await?;
        let status = response.status();
        let body: CancelResponse = response.json().await.unwrap_or_default();

        if let Some(error) = body.error {
            warn!("Cancellation refused: {error}");
            return Err(ClientError::Rejected(error));
        }

        match body.message {
            Some(message) if status.is_success() => {
                info!("Subscription cancelled");
                state.subscription = None;
                Ok(message)
            }
            _ => {
                warn!("Cancellation answered {status} without a message");
                Err(ClientError::Rejected(CANCEL_FALLBACK_MESSAGE.to_string()))
            }
        }
    }
}

fn settle<T>(result: Result<T>, panel: Panel, errors: &mut Vec<PanelError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_session_terminated() => Err(e),
        Err(e) => {
            warn!("Failed to load {panel}: {e}");
            errors.push(PanelError {
                panel,
                message: e.user_message(),
            });
            Ok(None)
        }
    }
}
