//! Application configuration

pub mod replies;
pub mod site;

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use site::{CompanyInfo, ConfigError, SiteConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub site_config_path: Option<PathBuf>,
    pub lead_webhook_url: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            data_dir: env::var("KAFFERO_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            site_config_path: env::var("KAFFERO_SITE_CONFIG").ok().map(PathBuf::from),
            lead_webhook_url: env::var("LEAD_WEBHOOK_URL").ok(),
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("kaffero.db")
    }

    /// Load the site TOML if one is configured, then apply env overrides
    pub fn load_site(&self) -> Result<SiteConfig, ConfigError> {
        let mut site = match &self.site_config_path {
            Some(path) => SiteConfig::from_file(path)?,
            None => SiteConfig::default(),
        };

        if let Some(url) = &self.lead_webhook_url {
            site.notifications.webhook_url = Some(url.clone());
        }

        Ok(site)
    }
}
