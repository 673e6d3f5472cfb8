//! Site configuration loaded from TOML files
//!
//! Holds the public-facing details the chatbot quotes back to visitors and
//! where lead notifications should go. Every field has a default, so an
//! empty file (or no file at all) gives the stock Kaffero site.
//!
//! # Example
//!
//! ```toml
//! [site]
//! name = "Kaffero"
//!
//! [company]
//! email = "hello@kaffero.in"
//! phone = "+91 98956 63498"
//! whatsapp = "+91 98956 63498"
//!
//! [notifications]
//! webhook_url = "https://hooks.example.com/kaffero-leads"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root site configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub site: SiteInfo,

    /// Contact details quoted by the chatbot
    #[serde(default)]
    pub company: CompanyInfo,

    #[serde(default)]
    pub notifications: NotificationConfig,
}

impl SiteConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: SiteConfig = toml::from_str(content)?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteInfo {
    #[serde(default = "default_site_name")]
    pub name: String,
}

fn default_site_name() -> String {
    "Kaffero".to_string()
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            name: default_site_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInfo {
    #[serde(default = "default_email")]
    pub email: String,

    #[serde(default = "default_phone")]
    pub phone: String,

    #[serde(default = "default_phone")]
    pub whatsapp: String,
}

fn default_email() -> String {
    "hello@kaffero.in".to_string()
}

fn default_phone() -> String {
    "+91 98956 63498".to_string()
}

impl Default for CompanyInfo {
    fn default() -> Self {
        Self {
            email: default_email(),
            phone: default_phone(),
            whatsapp: default_phone(),
        }
    }
}

/// Where newly identified leads are reported
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// POST each new lead as JSON to this URL; log-only when unset
    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CONFIG: &str = r#"
[site]
name = "Kaffero Kochi"

[company]
email = "sales@kaffero.in"
phone = "+91 90000 11111"
whatsapp = "+91 90000 22222"

[notifications]
webhook_url = "https://hooks.example.com/leads"
"#;

    #[test]
    fn test_parse_config() {
        let config = SiteConfig::from_toml(SAMPLE_CONFIG).unwrap();

        assert_eq!(config.site.name, "Kaffero Kochi");
        assert_eq!(config.company.email, "sales@kaffero.in");
        assert_eq!(config.company.phone, "+91 90000 11111");
        assert_eq!(config.company.whatsapp, "+91 90000 22222");
        assert_eq!(
            config.notifications.webhook_url.as_deref(),
            Some("https://hooks.example.com/leads")
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SiteConfig::from_toml("").unwrap();

        assert_eq!(config.site.name, "Kaffero");
        assert_eq!(config.company, CompanyInfo::default());
        assert_eq!(config.company.whatsapp, "+91 98956 63498");
        assert!(config.notifications.webhook_url.is_none());
    }

    #[test]
    fn test_partial_company_section() {
        let config = SiteConfig::from_toml("[company]\nemail = \"a@b.in\"\n").unwrap();
        assert_eq!(config.company.email, "a@b.in");
        assert_eq!(config.company.phone, "+91 98956 63498");
    }

    #[test]
    fn test_invalid_toml() {
        let err = SiteConfig::from_toml("[company\nemail = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}
