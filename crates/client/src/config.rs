//! Client configuration

use crate::error::{ClientError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default API origin and prefix
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/auth/";

/// Name of the optional configuration file inside the data directory
pub const CONFIG_FILE_NAME: &str = "tollgate.toml";

/// Name of the session file inside the data directory
pub const SESSION_FILE_NAME: &str = "session.json";

/// Environment variable overriding the data directory
pub const STATE_DIR_ENV: &str = "TOLLGATE_STATE_DIR";

/// Top-level client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Remote API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Session persistence settings
    #[serde(default)]
    pub session: SessionConfig,
}

/// Remote API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every endpoint path is resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds (0 disables it)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Session persistence settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session file; defaults to `session.json` in the data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("tollgate-client/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl ApiConfig {
    /// Request timeout, if any
    pub const fn timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        }
    }
}

impl ClientConfig {
    /// Load configuration from defaults, an optional file and `TOLLGATE__*`
    /// environment variables, in that order of precedence.
    ///
    /// When `file` is `None`, `tollgate.toml` inside `data_dir` is used if it
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or parsed, or if the
    /// resulting configuration is invalid
    pub fn load(data_dir: &Path, file: Option<&Path>) -> Result<Self> {
        let defaults = Self::default();

        let mut builder = Config::builder()
            .set_default("api.base_url", defaults.api.base_url)?
            .set_default("api.timeout_secs", defaults.api.timeout_secs)?
            .set_default("api.user_agent", defaults.api.user_agent)?;

        match file {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                builder = builder.add_source(File::from(path));
            }
            None => {
                let default_path = data_dir.join(CONFIG_FILE_NAME);
                if default_path.exists() {
                    debug!("Loading configuration from {}", default_path.display());
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("TOLLGATE")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the base URL is an absolute http(s) URL
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] when it is not
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.api.base_url).map_err(|e| {
            ClientError::Configuration(format!("invalid base_url {:?}: {e}", self.api.base_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::Configuration(format!(
                "base_url must use http or https, got {}",
                url.scheme()
            )));
        }
        Ok(())
    }

    /// Where the session file lives
    pub fn session_path(&self, data_dir: &Path) -> PathBuf {
        self.session
            .path
            .clone()
            .unwrap_or_else(|| data_dir.join(SESSION_FILE_NAME))
    }

    /// Render as TOML, for writing a starter configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ClientError::Configuration(e.to_string()))
    }
}

/// Resolve the data directory: `TOLLGATE_STATE_DIR`, else the platform data
/// directory joined with `tollgate`
pub fn default_data_dir() -> PathBuf {
    std::env::var_os(STATE_DIR_ENV).map_or_else(
        || {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("tollgate")
        },
        PathBuf::from,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_backend() {
        let config = ClientConfig::default();
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api.timeout(), Some(Duration::from_secs(30)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_timeout_disables_it() {
        let api = ApiConfig {
            timeout_secs: 0,
            ..ApiConfig::default()
        };
        assert_eq!(api.timeout(), None);
    }

    #[test]
    fn rejects_non_http_base_url() {
        let mut config = ClientConfig::default();
        config.api.base_url = "ftp://example.com/".into();
        assert!(matches!(
            config.validate(),
            Err(ClientError::Configuration(_))
        ));

        config.api.base_url = "not a url".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_file_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[api]\nbase_url = \"https://billing.example.com/api/auth/\"\ntimeout_secs = 5\n",
        )
        .unwrap();

        let config = ClientConfig::load(dir.path(), Some(&path)).unwrap();
        assert_eq!(config.api.base_url, "https://billing.example.com/api/auth/");
        assert_eq!(config.api.timeout_secs, 5);
        assert!(config.api.user_agent.starts_with("tollgate-client/"));
        assert_eq!(
            config.session_path(dir.path()),
            dir.path().join(SESSION_FILE_NAME)
        );
    }

    #[test]
    fn picks_up_config_file_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[session]\npath = \"/tmp/elsewhere.json\"\n",
        )
        .unwrap();

        let config = ClientConfig::load(dir.path(), None).unwrap();
        assert_eq!(
            config.session_path(dir.path()),
            PathBuf::from("/tmp/elsewhere.json")
        );
    }

    #[test]
    fn toml_round_trips_through_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generated.toml");
        std::fs::write(&path, ClientConfig::default().to_toml().unwrap()).unwrap();

        let config = ClientConfig::load(dir.path(), Some(&path)).unwrap();
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
    }
}
