//! Tollgate client library
//!
//! Talks to the Tollgate subscription API on behalf of a signed-in user. Every
//! authenticated call goes through [`AuthenticatedClient`], which attaches the
//! stored bearer token, refreshes it once on a 401 (coalescing concurrent
//! refreshes), and terminates the session when the refresh is refused.

#[macro_use]
extern crate tracing;

pub mod client;
pub mod config;
pub mod error;
pub mod navigation;
pub mod services;
pub mod session;
pub mod types;

pub use client::{ApiRequest, AuthenticatedClient, PublicClient, TollgateClientBuilder};
pub use config::ClientConfig;
pub use error::{ClientError, Result, TerminationReason};
pub use navigation::{Navigator, RecordingNavigator, Route};
pub use services::{
    AuthService, CheckoutOutcome, CheckoutService, DashboardService, DashboardState,
    RegistrationOutcome,
};
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionManager, SessionStore};
pub use types::{PLAN_CATALOG, Plan, PlanInfo};
