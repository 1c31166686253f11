//! Wire types exchanged with the Tollgate API

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Subscription tier identifier.
///
/// Carried through navigation as the `plan` query value and never validated
/// against the catalog on the client side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Plan(String);

impl Plan {
    pub const BASIC: &'static str = "basic";
    pub const PRO: &'static str = "pro";
    pub const ENTERPRISE: &'static str = "enterprise";
    pub const FREE: &'static str = "free";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The plan assumed when none was selected
    pub fn free() -> Self {
        Self::new(Self::FREE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Landing-page description of the plan, if it is a known tier
    pub fn info(&self) -> Option<&'static PlanInfo> {
        PLAN_CATALOG.iter().find(|info| info.id == self.0)
    }
}

impl Default for Plan {
    fn default() -> Self {
        Self::free()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Plan {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A tier as presented on the landing page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub price: &'static str,
    pub billing: &'static str,
    pub features: &'static [&'static str],
}

impl PlanInfo {
    pub fn plan(&self) -> Plan {
        Plan::new(self.id)
    }
}

/// Tiers offered on the landing page
pub const PLAN_CATALOG: &[PlanInfo] = &[
    PlanInfo {
        id: Plan::BASIC,
        name: "Basic",
        price: "£0.00",
        billing: "No monthly fees",
        features: &[
            "Access to basic analytics dashboard",
            "Track up to 10 transactions",
            "Generate simple financial reports",
            "Community support",
        ],
    },
    PlanInfo {
        id: Plan::PRO,
        name: "Pro",
        price: "£9.99",
        billing: "Per month",
        features: &[
            "Unlimited transactions",
            "Generate standard reports",
            "Connect multiple bank accounts",
            "Email notifications for financial insights",
        ],
    },
    PlanInfo {
        id: Plan::ENTERPRISE,
        name: "Enterprise",
        price: "£29.99",
        billing: "Per month",
        features: &[
            "Advanced analytics dashboard",
            "AI-powered financial forecasting",
            "Custom reports & tax preparation",
            "Priority support & dedicated account manager",
        ],
    },
];

/// Login request
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Registration request
#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Token pair issued on login or registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Registration response; tokens are only present when the backend signs
/// the new user in straight away
#[derive(Debug, Default, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl RegisterResponse {
    pub fn into_tokens(self) -> Option<TokenPair> {
        match (self.access, self.refresh) {
            (Some(access), Some(refresh)) => Some(TokenPair { access, refresh }),
            _ => None,
        }
    }
}

/// Token refresh request
#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// Token refresh response. `refresh` is present when the server rotates
/// refresh tokens.
#[derive(Debug, Default, Deserialize)]
pub struct RefreshResponse {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Subscription activation request
#[derive(Debug, Serialize)]
pub struct SubscribeRequest<'a> {
    pub plan: &'a Plan,
}

/// Subscription activation response
#[derive(Debug, Default, Deserialize)]
pub struct SubscribeResponse {
    /// Hosted payment page the user must complete
    #[serde(default)]
    pub checkout_url: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub subscription_id: Option<String>,
}

/// Plan upgrade request
#[derive(Debug, Serialize)]
pub struct UpgradeRequest<'a> {
    pub price_id: &'a str,
}

/// Plan upgrade response
#[derive(Debug, Deserialize)]
pub struct UpgradeResponse {
    pub plan: String,
}

/// Cancellation response; exactly one of the fields is expected
#[derive(Debug, Default, Deserialize)]
pub struct CancelResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Signed-in user as returned by the protected endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Profile {
    /// Best available name for greeting the user
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .or(self.message.as_deref())
            .or(self.email.as_deref())
            .unwrap_or("there")
    }
}

/// Kind of ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Expense,
    Revenue,
    Sale,
    #[serde(other)]
    Other,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Expense => "expense",
            Self::Revenue => "revenue",
            Self::Sale => "sale",
            Self::Other => "other",
        };
        f.write_str(label)
    }
}

/// Ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub id: Option<i64>,
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Decimal,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// New ledger entry; the server assigns id, owner and date
#[derive(Debug, Clone, Serialize)]
pub struct NewTransaction {
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Monthly totals
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Insights {
    pub total_expenses: Decimal,
    pub total_revenue: Decimal,
    pub top_expense_category: String,
    #[serde(default)]
    pub category_breakdown: BTreeMap<String, Decimal>,
}

/// One subscription record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionStatus {
    pub plan: String,
    #[serde(alias = "isActive")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Subscription status payload. Both the list form and the older single
/// record form (`{plan, isActive}`) are accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SubscriptionsPayload {
    List {
        subscriptions: Vec<SubscriptionStatus>,
    },
    Single(SubscriptionStatus),
}

impl SubscriptionsPayload {
    /// The active subscription, else the first one listed
    pub fn current(self) -> Option<SubscriptionStatus> {
        match self {
            Self::List { subscriptions } => {
                let active = subscriptions.iter().position(|s| s.is_active);
                let index = active.unwrap_or(0);
                subscriptions.into_iter().nth(index)
            }
            Self::Single(status) => Some(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn catalog_knows_paid_tiers() {
        assert_eq!(Plan::new("pro").info().map(|i| i.name), Some("Pro"));
        assert!(Plan::free().info().is_none());
        assert_eq!(PLAN_CATALOG.len(), 3);
        assert_eq!(Plan::default().as_str(), "free");
    }

    #[test]
    fn plan_serializes_as_plain_string() {
        let body = serde_json::to_value(SubscribeRequest {
            plan: &Plan::new("pro"),
        })
        .unwrap();
        assert_eq!(body, json!({"plan": "pro"}));
    }

    #[test]
    fn transaction_accepts_string_amounts_and_unknown_kinds() {
        let tx: Transaction = serde_json::from_value(json!({
            "id": 7,
            "user": 1,
            "amount": "12.50",
            "type": "refund",
            "category": "misc",
            "description": null,
            "date": "2025-03-01T10:00:00.123456Z"
        }))
        .unwrap();
        assert_eq!(tx.amount, Decimal::from_str("12.50").unwrap());
        assert_eq!(tx.kind, TransactionKind::Other);
        assert_eq!(tx.id, Some(7));
    }

    #[test]
    fn subscriptions_list_prefers_active_entry() {
        let payload: SubscriptionsPayload = serde_json::from_value(json!({
            "subscriptions": [
                {"plan": "basic", "is_active": false},
                {"plan": "pro", "is_active": true}
            ]
        }))
        .unwrap();
        let current = payload.current().unwrap();
        assert_eq!(current.plan, "pro");
        assert!(current.is_active);
    }

    #[test]
    fn subscriptions_accept_legacy_single_shape() {
        let payload: SubscriptionsPayload =
            serde_json::from_value(json!({"plan": "enterprise", "isActive": true})).unwrap();
        assert_eq!(payload.current().unwrap().plan, "enterprise");

        let empty: SubscriptionsPayload =
            serde_json::from_value(json!({"subscriptions": []})).unwrap();
        assert!(empty.current().is_none());
    }

    #[test]
    fn register_response_needs_both_tokens() {
        let partial = RegisterResponse {
            access: Some("a".into()),
            ..RegisterResponse::default()
        };
        assert!(partial.into_tokens().is_none());
    }
}
