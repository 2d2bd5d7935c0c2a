//! CLI configuration

use marknote_client::{ClientConfig, FileTokenStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings read from the YAML config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Backend connection settings
    #[serde(flatten)]
    pub client: ClientConfig,

    /// Where credentials are kept between runs
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,
}

impl CliConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &Path, cli: &crate::Cli) -> anyhow::Result<Self> {
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        if let Some(base_url) = &cli.base_url {
            config.client.base_url = base_url.clone();
        }

        Ok(config)
    }

    /// Credentials file, falling back to the per-user default
    pub fn credentials_path(&self) -> anyhow::Result<PathBuf> {
        match &self.credentials_path {
            Some(path) => Ok(path.clone()),
            None => Ok(FileTokenStore::default_path()?),
        }
    }
}
