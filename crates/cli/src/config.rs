//! CLI configuration utilities

use anyhow::Result;
use std::path::Path;
use tollgate_client::ClientConfig;
use tollgate_client::config::CONFIG_FILE_NAME;

/// Load client configuration for `data_dir`, honouring an explicit file
pub fn load_client_config(data_dir: &Path, file: Option<&Path>) -> Result<ClientConfig> {
    Ok(ClientConfig::load(data_dir, file)?)
}

/// Write the default configuration as TOML
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    let content = ClientConfig::default().to_toml()?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Default location of the configuration file
pub fn default_config_path(data_dir: &Path) -> std::path::PathBuf {
    data_dir.join(CONFIG_FILE_NAME)
}
