//! Page-level flows built on the shared authenticated client

pub mod auth;
pub mod checkout;
pub mod dashboard;

pub use auth::{AuthService, RegistrationOutcome};
pub use checkout::{CheckoutOutcome, CheckoutService};
pub use dashboard::{DashboardService, DashboardState, Panel, PanelError};
