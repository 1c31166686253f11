//! CLI commands

use anyhow::Result;
use clap::{Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tollgate_client::services::Panel;
use tollgate_client::types::{NewTransaction, TransactionKind};
use tollgate_client::{
    AuthService, AuthenticatedClient, CheckoutOutcome, CheckoutService, ClientConfig,
    DashboardService, DashboardState, FileSessionStore, Navigator, Plan, RegistrationOutcome,
    Route, SessionManager, TollgateClientBuilder,
};
use tracing::{debug, info};

use crate::config;

#[derive(Subcommand)]
pub enum Commands {
    /// List the available plans
    Plans,

    /// Choose a plan and continue to registration
    SelectPlan {
        /// Plan identifier (basic, pro, enterprise)
        plan: String,
    },

    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "TOLLGATE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and continue to checkout
    Register {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        #[arg(long, env = "TOLLGATE_PASSWORD", hide_env_values = true)]
        password: String,

        /// Plan chosen on the landing page
        #[arg(long)]
        plan: Option<String>,
    },

    /// Activate a plan for the signed-in user
    Checkout {
        /// Plan to activate (defaults to free)
        #[arg(long)]
        plan: Option<String>,
    },

    /// Show profile, transactions and subscription
    Dashboard,

    /// Move the subscription to another price
    Upgrade {
        #[arg(long)]
        price_id: String,
    },

    /// Cancel the subscription
    Cancel,

    /// Sign out and forget the stored session
    Logout,

    /// Ledger operations
    Transactions {
        #[command(subcommand)]
        command: TransactionCommands,
    },

    /// Monthly totals
    Insights {
        /// Month as YYYY-MM
        #[arg(long)]
        month: String,
    },

    /// Configuration file operations
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum TransactionCommands {
    /// Record a transaction
    Add {
        #[arg(long)]
        amount: Decimal,

        #[arg(long, value_enum)]
        kind: KindArg,

        #[arg(long)]
        category: String,

        #[arg(long)]
        description: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Generate the default configuration file
    Init {
        /// Output file path (defaults to tollgate.toml in the data directory)
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum KindArg {
    Expense,
    Revenue,
    Sale,
}

impl From<KindArg> for TransactionKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Expense => Self::Expense,
            KindArg::Revenue => Self::Revenue,
            KindArg::Sale => Self::Sale,
        }
    }
}

/// Reports navigation on stdout
struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, route: Route) {
        debug!("Navigating to {route}");
        println!("-> {route}");
    }
}

fn build_client(data_dir: &Path, config_file: Option<&Path>) -> Result<AuthenticatedClient> {
    let config: ClientConfig = config::load_client_config(data_dir, config_file)?;
    let session_path = config.session_path(data_dir);
    debug!("Using session file {}", session_path.display());

    let session = SessionManager::new(Arc::new(FileSessionStore::new(session_path)));
    let client = TollgateClientBuilder::from_config(&config.api)
        .build_authenticated(session, Arc::new(ConsoleNavigator))?;
    Ok(client)
}

fn plan_or_free(plan: Option<String>) -> Plan {
    plan.map_or_else(Plan::free, Plan::new)
}

impl Commands {
    pub async fn execute(self, data_dir: PathBuf, config_file: Option<PathBuf>) -> Result<()> {
        let client = || build_client(&data_dir, config_file.as_deref());

        match self {
            Self::Plans => print_plans(),
            Self::Config { command } => command.execute(&data_dir)?,
            Self::SelectPlan { plan } => {
                AuthService::new(client()?).select_plan(Plan::new(plan));
            }
            Self::Login { email, password } => {
                AuthService::new(client()?).login(&email, &password).await?;
                println!("Signed in as {email}");
            }
            Self::Register {
                username,
                email,
                password,
                plan,
            } => {
                let outcome = AuthService::new(client()?)
                    .register(&username, &email, &password, plan_or_free(plan))
                    .await?;
                match outcome {
                    RegistrationOutcome::SignedIn => println!("Account created"),
                    RegistrationOutcome::LoginRequired => {
                        println!("Account created, please sign in");
                    }
                }
            }
            Self::Checkout { plan } => {
                let plan = plan_or_free(plan);
                match CheckoutService::new(client()?).activate(&plan).await? {
                    CheckoutOutcome::PaymentRequired(url) => {
                        println!("Complete payment for plan {plan} at {url}");
                    }
                    CheckoutOutcome::Activated { message } => {
                        println!("{}", message.as_deref().unwrap_or("Plan activated"));
                    }
                }
            }
            Self::Dashboard => {
                let state = DashboardService::new(client()?).load().await?;
                print_dashboard(&state);
            }
            Self::Upgrade { price_id } => {
                let mut state = DashboardState::default();
                let plan = DashboardService::new(client()?)
                    .upgrade(&mut state, &price_id)
                    .await?;
                println!("Subscription moved to plan {plan}");
            }
            Self::Cancel => {
                let mut state = DashboardState::default();
                let message = DashboardService::new(client()?).cancel(&mut state).await?;
                println!("{message}");
            }
            Self::Logout => {
                AuthService::new(client()?).logout()?;
                println!("Signed out");
            }
            Self::Transactions { command } => command.execute(&client()?).await?,
            Self::Insights { month } => {
                let insights = client()?.insights(&month).await?;
                println!("Insights for {month}");
                println!("  Revenue:  {}", insights.total_revenue);
                println!("  Expenses: {}", insights.total_expenses);
                println!("  Top expense category: {}", insights.top_expense_category);
                for (category, amount) in &insights.category_breakdown {
                    println!("    {category:<20} {amount}");
                }
            }
        }
        Ok(())
    }
}

impl TransactionCommands {
    pub async fn execute(self, client: &AuthenticatedClient) -> Result<()> {
        match self {
            Self::Add {
                amount,
                kind,
                category,
                description,
            } => {
                let created = client
                    .create_transaction(&NewTransaction {
                        amount,
                        kind: kind.into(),
                        category,
                        description,
                    })
                    .await?;
                info!("Recorded transaction {:?}", created.id);
                println!(
                    "Recorded {} of {} on {}",
                    created.kind,
                    created.amount,
                    created.date.format("%Y-%m-%d")
                );
                Ok(())
            }
        }
    }
}

impl ConfigCommands {
    pub fn execute(self, data_dir: &Path) -> Result<()> {
        match self {
            Self::Init { output } => {
                let config_path = output.unwrap_or_else(|| config::default_config_path(data_dir));

                // Create parent directory if it doesn't exist
                if let Some(parent) = config_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }

                config::generate_default_config(&config_path)?;
                println!("Generated configuration at: {}", config_path.display());
                Ok(())
            }
        }
    }
}

fn print_plans() {
    for info in tollgate_client::PLAN_CATALOG {
        println!("{} ({}) - {} {}", info.name, info.id, info.price, info.billing);
        for feature in info.features {
            println!("  * {feature}");
        }
    }
}

fn print_dashboard(state: &DashboardState) {
    if let Some(profile) = &state.profile {
        println!("Welcome, {}", profile.display_name());
    }

    match &state.subscription {
        Some(subscription) => {
            let status = if subscription.is_active {
                "active"
            } else {
                "inactive"
            };
            println!("Plan: {} ({status})", subscription.plan);
        }
        None if state.error_for(Panel::Subscription).is_none() => {
            println!("No active subscription");
        }
        None => {}
    }

    if state.error_for(Panel::Transactions).is_none() {
        println!("Transactions: {}", state.transactions.len());
        for tx in &state.transactions {
            println!(
                "  {}  {:<8} {:>12}  {}",
                tx.date.format("%Y-%m-%d"),
                tx.kind,
                tx.amount,
                tx.category.as_deref().unwrap_or("-")
            );
        }
    }

    for failure in &state.errors {
        eprintln!("Could not load {}: {}", failure.panel, failure.message);
    }
}
