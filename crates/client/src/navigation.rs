//! Client-side routes and the navigator that receives route changes

use crate::types::Plan;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use url::Url;
use url::form_urlencoded::byte_serialize;

/// A place the client can be sent to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Landing page with the plan catalog
    Home,
    /// Unauthenticated entry point
    Login,
    /// Registration, carrying the selected plan
    Register { plan: Plan },
    /// Checkout, carrying the plan to activate
    Checkout { plan: Plan },
    /// Signed-in overview
    Dashboard,
    /// A page outside the application, such as a hosted payment form
    External(Url),
}

impl Route {
    /// Parse a route from an application path (`/checkout?plan=pro`) or an
    /// absolute external URL. Returns `None` for unknown paths.
    pub fn parse(input: &str) -> Option<Self> {
        if let Ok(url) = Url::parse(input) {
            return matches!(url.scheme(), "http" | "https").then_some(Self::External(url));
        }

        let base = Url::parse("http://localhost/").ok()?;
        let url = base.join(input).ok()?;
        let plan = url
            .query_pairs()
            .find(|(key, _)| key == "plan")
            .map(|(_, value)| Plan::new(value.into_owned()));

        match url.path().trim_end_matches('/') {
            "" => Some(Self::Home),
            "/login" => Some(Self::Login),
            "/register" => Some(Self::Register {
                plan: plan.unwrap_or_default(),
            }),
            "/checkout" => Some(Self::Checkout {
                plan: plan.unwrap_or_default(),
            }),
            "/dashboard" => Some(Self::Dashboard),
            _ => None,
        }
    }

    /// Whether this route is served by the application itself
    pub const fn is_internal(&self) -> bool {
        !matches!(self, Self::External(_))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home => write!(f, "/"),
            Self::Login => write!(f, "/login"),
            Self::Register { plan } => write!(f, "/register?plan={}", encode(plan.as_str())),
            Self::Checkout { plan } => write!(f, "/checkout?plan={}", encode(plan.as_str())),
            Self::Dashboard => write!(f, "/dashboard"),
            Self::External(url) => write!(f, "{url}"),
        }
    }
}

fn encode(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}

/// Receives route changes from the flows
pub trait Navigator: Send + Sync {
    /// Move the client to `route`
    fn navigate(&self, route: Route);
}

/// Navigator that remembers every route it was sent to
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    history: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent route, if any navigation happened
    pub fn current(&self) -> Option<Route> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Every route in the order it was visited
    pub fn history(&self) -> Vec<Route> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        debug!("Navigating to {route}");
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(route);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_navigation_surface() {
        assert_eq!(Route::Home.to_string(), "/");
        assert_eq!(Route::Login.to_string(), "/login");
        assert_eq!(Route::Dashboard.to_string(), "/dashboard");
        assert_eq!(
            Route::Register {
                plan: Plan::new("pro")
            }
            .to_string(),
            "/register?plan=pro"
        );
        assert_eq!(
            Route::Checkout {
                plan: Plan::new("team plan")
            }
            .to_string(),
            "/checkout?plan=team+plan"
        );
    }

    #[test]
    fn parses_paths_and_plans() {
        assert_eq!(Route::parse("/"), Some(Route::Home));
        assert_eq!(Route::parse("/login"), Some(Route::Login));
        assert_eq!(Route::parse("/dashboard/"), Some(Route::Dashboard));
        assert_eq!(
            Route::parse("/checkout?plan=enterprise"),
            Some(Route::Checkout {
                plan: Plan::new("enterprise")
            })
        );
        assert_eq!(
            Route::parse("/register?plan=team+plan"),
            Some(Route::Register {
                plan: Plan::new("team plan")
            })
        );
        assert_eq!(Route::parse("/nowhere"), None);
    }

    #[test]
    fn checkout_without_plan_defaults_to_free() {
        assert_eq!(
            Route::parse("/checkout"),
            Some(Route::Checkout { plan: Plan::free() })
        );
    }

    #[test]
    fn absolute_urls_are_external() {
        let route = Route::parse("https://checkout.stripe.com/c/pay/cs_test").unwrap();
        assert!(!route.is_internal());
        assert_eq!(route.to_string(), "https://checkout.stripe.com/c/pay/cs_test");
    }

    #[test]
    fn recording_navigator_tracks_history() {
        let navigator = RecordingNavigator::new();
        assert_eq!(navigator.current(), None);
        navigator.navigate(Route::Login);
        navigator.navigate(Route::Dashboard);
        assert_eq!(navigator.current(), Some(Route::Dashboard));
        assert_eq!(navigator.history(), vec![Route::Login, Route::Dashboard]);
    }
}
