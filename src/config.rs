//! Server configuration
//!
//! Layered: built-in defaults, then an optional TOML file, then `.env` and
//! process environment, then whatever the CLI overrides on top.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};

pub const ENV_BIND: &str = "ARENA_DISPLAY_BIND";
pub const ENV_PORT: &str = "ARENA_DISPLAY_PORT";
pub const ENV_ADMIN_TOKEN: &str = "ARENA_DISPLAY_ADMIN_TOKEN";
pub const ENV_LOG: &str = "ARENA_DISPLAY_LOG";
pub const ENV_LOG_DIR: &str = "ARENA_DISPLAY_LOG_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Interface to bind
    pub bind: String,

    pub port: u16,

    /// Bearer token required by admin endpoints; open when unset
    pub admin_token: Option<String>,

    /// Default tracing filter when `RUST_LOG` is not set
    pub log_level: String,

    /// Directory for a daily rolling log file
    pub log_dir: Option<PathBuf>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
            admin_token: None,
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl DisplayConfig {
    /// Defaults, then `path` if given, then `.env` and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_vars(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Override fields from variables looked up through `lookup`.
    pub fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(bind) = lookup(ENV_BIND) {
            self.bind = bind;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = port
                .parse()
                .with_context(|| format!("{ENV_PORT} is not a valid port: {port}"))?;
        }
        if let Some(token) = lookup(ENV_ADMIN_TOKEN) {
            self.admin_token = Some(token).filter(|t| !t.is_empty());
        }
        if let Some(level) = lookup(ENV_LOG) {
            self.log_level = level;
        }
        if let Some(dir) = lookup(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = DisplayConfig::default();
        assert_eq!(config.socket_addr(), "0.0.0.0:8080");
        assert!(config.admin_token.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("display.toml");
        std::fs::write(&path, "port = 9001\nadmin_token = \"fta\"\n").unwrap();

        let config = DisplayConfig::from_file(&path).unwrap();
        assert_eq!(config.port, 9001);
        assert_eq!(config.admin_token.as_deref(), Some("fta"));
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("display.toml");
        std::fs::write(&path, "port = \"not a number\"").unwrap();

        assert!(DisplayConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_vars_override_file_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_PORT, "7000"),
            (ENV_BIND, "127.0.0.1"),
            (ENV_ADMIN_TOKEN, ""),
        ]);
        let mut config = DisplayConfig {
            admin_token: Some("old".into()),
            ..DisplayConfig::default()
        };

        config
            .apply_vars(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.socket_addr(), "127.0.0.1:7000");
        assert!(config.admin_token.is_none());
    }

    #[test]
    fn test_bad_port_var() {
        let mut config = DisplayConfig::default();
        let result = config.apply_vars(|key| (key == ENV_PORT).then(|| "eighty".to_string()));
        assert!(result.is_err());
    }
}
