//! Account and ledger endpoints

use super::{ApiRequest, AuthenticatedClient};
use crate::error::{ClientError, Result};
use crate::types::{
    Insights, NewTransaction, Profile, SubscriptionStatus, SubscriptionsPayload, Transaction,
    UpgradeRequest, UpgradeResponse,
};
use chrono::NaiveDate;

impl AuthenticatedClient {
    /// Get the signed-in user's profile
    pub async fn profile(&self) -> Result<Profile> {
        self.execute(&ApiRequest::get("protected/")).await
    }

    /// List the user's transactions
    pub async fn transactions(&self) -> Result<Vec<Transaction>> {
        self.execute(&ApiRequest::get("transactions/")).await
    }

    /// Record a new transaction
    pub async fn create_transaction(&self, transaction: &NewTransaction) -> Result<Transaction> {
        let request = ApiRequest::post("transactions/").json(transaction)?;
        self.execute(&request).await
    }

    /// Monthly totals for `month` (`YYYY-MM`)
    pub async fn insights(&self, month: &str) -> Result<Insights> {
        validate_month(month)?;
        let request = ApiRequest::get("insights/").query("month", month);
        self.execute(&request).await
    }

    /// Current subscription, if the user has any
    pub async fn subscription_status(&self) -> Result<Option<SubscriptionStatus>> {
        let payload: SubscriptionsPayload =
            self.execute(&ApiRequest::get("subscriptions/")).await?;
        Ok(payload.current())
    }

    /// Move the subscription to another price
    pub async fn upgrade(&self, price_id: &str) -> Result<UpgradeResponse> {
        let request = ApiRequest::post("upgrade/").json(&UpgradeRequest { price_id })?;
        self.execute(&request).await
    }
}

fn validate_month(month: &str) -> Result<()> {
    let well_formed = month.len() == 7
        && NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d").is_ok();
    if well_formed {
        Ok(())
    } else {
        Err(ClientError::BadRequest(format!(
            "invalid month {month:?}, expected YYYY-MM"
        )))
    }
}
