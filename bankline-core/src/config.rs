//! Configuration management
//!
//! `settings.json` in the data directory:
//! ```json
//! {
//!   "app": { "bankName": "Bankline", "dateMode": "legacy" },
//!   "server": { "listenAddr": "0.0.0.0:7860", "adminKey": "..." }
//! }
//! ```
//! Keys this crate does not manage are carried through `save` untouched.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::result::Error;
use crate::services::DateMode;

pub const DEFAULT_BANK_NAME: &str = "Bankline";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:7860";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(default)]
    server: ServerSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bank_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date_mode: Option<DateMode>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    listen_addr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    admin_key: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Shown as the recipient of admin funding entries
    pub bank_name: String,
    pub date_mode: DateMode,
    pub listen_addr: String,
    /// When set, admin routes require a matching `x-admin-key` header
    pub admin_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bank_name: DEFAULT_BANK_NAME.to_string(),
            date_mode: DateMode::default(),
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            admin_key: None,
        }
    }
}

impl Config {
    /// Load config from the data directory, then apply environment overrides
    ///
    /// - `BANKLINE_DATE_MODE` (`legacy` | `utc`)
    /// - `BANKLINE_LISTEN_ADDR`
    /// - `BANKLINE_ADMIN_KEY`
    pub fn load(bankline_dir: &Path) -> Result<Self> {
        let raw = read_settings(bankline_dir)?;
        let defaults = Config::default();

        let date_mode = match std::env::var("BANKLINE_DATE_MODE").ok() {
            Some(value) => DateMode::parse(&value).ok_or_else(|| {
                Error::Config(format!("BANKLINE_DATE_MODE must be legacy or utc, got {}", value))
            })?,
            None => raw.app.date_mode.unwrap_or(defaults.date_mode),
        };

        Ok(Self {
            bank_name: raw
                .app
                .bank_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(defaults.bank_name),
            date_mode,
            listen_addr: std::env::var("BANKLINE_LISTEN_ADDR")
                .ok()
                .or(raw.server.listen_addr)
                .unwrap_or(defaults.listen_addr),
            admin_key: std::env::var("BANKLINE_ADMIN_KEY")
                .ok()
                .or(raw.server.admin_key)
                .filter(|key| !key.is_empty()),
        })
    }

    /// Write the managed fields back, preserving everything else in the file
    pub fn save(&self, bankline_dir: &Path) -> Result<()> {
        let mut settings = read_settings(bankline_dir)?;
        settings.app.bank_name = Some(self.bank_name.clone());
        settings.app.date_mode = Some(self.date_mode);
        settings.server.listen_addr = Some(self.listen_addr.clone());
        settings.server.admin_key = self.admin_key.clone();

        std::fs::create_dir_all(bankline_dir)?;
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(bankline_dir.join("settings.json"), content)?;
        Ok(())
    }
}

fn read_settings(bankline_dir: &Path) -> Result<SettingsFile> {
    let settings_path = bankline_dir.join("settings.json");
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.bank_name, "Bankline");
        assert_eq!(config.listen_addr, DEFAULT_LISTEN_ADDR);
    }

    #[test]
    fn test_reads_camel_case_settings() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"app": {"bankName": "First Demo Bank"}, "server": {"listenAddr": "127.0.0.1:9000"}}"#,
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.bank_name, "First Demo Bank");
        assert_eq!(config.listen_addr, "127.0.0.1:9000");
    }

    #[test]
    fn test_save_preserves_unknown_keys() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"app": {"theme": "dark"}, "plugins": {"x": 1}}"#,
        )
        .unwrap();

        let mut config = Config::load(dir.path()).unwrap();
        config.bank_name = "Renamed".to_string();
        config.save(dir.path()).unwrap();

        let saved: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("settings.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(saved["app"]["theme"], "dark");
        assert_eq!(saved["app"]["bankName"], "Renamed");
        assert_eq!(saved["plugins"]["x"], 1);
    }
}
