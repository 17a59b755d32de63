//! Server configuration.
//!
//! Defaults are overridden by environment variables, which are in turn
//! overridden by command-line flags in `main.rs`:
//! - `GOALBOARD_HOST` - bind address (default `0.0.0.0`)
//! - `GOALBOARD_PORT` - listen port (default `3001`)
//! - `GOALBOARD_DB` - SQLite file (default: platform data dir)
//! - `GOALBOARD_CORS_ORIGINS` - comma-separated allowed origins (default: any)
//! - `GOALBOARD_STATIC_DIR` - directory holding the built board UI

use std::path::PathBuf;

use anyhow::Context;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `None` uses [`crate::db::Database::default_path`].
    pub database_path: Option<PathBuf>,
    /// Empty allows any origin.
    pub cors_origins: Vec<String>,
    /// When set, files here are served for non-API paths with an
    /// `index.html` fallback.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database_path: None,
            cors_origins: Vec::new(),
            static_dir: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(host) = lookup("GOALBOARD_HOST").filter(|h| !h.trim().is_empty()) {
            config.host = host.trim().to_string();
        }
        if let Some(port) = lookup("GOALBOARD_PORT") {
            config.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid GOALBOARD_PORT: {}", port))?;
        }
        if let Some(path) = lookup("GOALBOARD_DB").filter(|p| !p.is_empty()) {
            config.database_path = Some(PathBuf::from(path));
        }
        if let Some(origins) = lookup("GOALBOARD_CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(dir) = lookup("GOALBOARD_STATIC_DIR").filter(|d| !d.is_empty()) {
            config.static_dir = Some(PathBuf::from(dir));
        }

        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr(), "0.0.0.0:3001");
    }

    #[test]
    fn env_overrides_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("GOALBOARD_HOST", "127.0.0.1"),
            ("GOALBOARD_PORT", "8080"),
            ("GOALBOARD_DB", "/tmp/board.db"),
            ("GOALBOARD_CORS_ORIGINS", "http://localhost:5173, https://board.example.com,"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/board.db")));
        assert_eq!(
            config.cors_origins,
            vec!["http://localhost:5173", "https://board.example.com"]
        );
    }

    #[test]
    fn invalid_port_is_an_error() {
        assert!(ServerConfig::from_lookup(lookup(&[("GOALBOARD_PORT", "eighty")])).is_err());
    }
}
