use std::{env, path::PathBuf};

use dirs_next::{config_dir, home_dir};
use serde::Deserialize;

/// API version the schema call is pinned to.
pub const DEFAULT_API_VERSION: &str = "2.170";

/// Client settings read from the configuration file.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Server base URL, e.g. `https://ipa.example.test`
    #[serde(default)]
    pub server: Option<String>,
    /// API version sent with every call
    #[serde(default)]
    pub api_version: Option<String>,
    /// Saved schema used instead of a live server
    #[serde(default)]
    pub schema_path: Option<String>,
}

impl ClientConfig {
    /// Loads the configuration from [`default_config_path`], falling back to
    /// defaults when the file is missing or unreadable.
    pub fn load() -> Self {
        Self::load_from(default_config_path())
    }

    pub fn load_from(path: PathBuf) -> Self {
        if let Ok(content) = std::fs::read_to_string(&path)
            && let Ok(config) = serde_json::from_str(&content)
        {
            return config;
        }
        ClientConfig::default()
    }

    pub fn api_version(&self) -> &str {
        self.api_version.as_deref().unwrap_or(DEFAULT_API_VERSION)
    }

    pub fn schema_path(&self) -> Option<PathBuf> {
        self.schema_path.as_deref().map(expand_tilde)
    }
}

/// Get the default path for the client configuration file.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var("IPASCHEMA_CONFIG_PATH")
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ipaschema")
        .join("config.json")
}

pub fn expand_tilde(path: &str) -> PathBuf {
    let p = path.trim();
    if p == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    if let Some(rest) = p.strip_prefix("~/") {
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    PathBuf::from(p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = ClientConfig::load_from(PathBuf::from("/nonexistent/ipaschema/config.json"));
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.api_version(), DEFAULT_API_VERSION);
    }

    #[test]
    fn reads_partial_config() {
        let dir = env::temp_dir().join(format!("ipaschema-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{"server": "https://ipa.example.test", "api_version": "2.251"}"#).expect("write config");

        let config = ClientConfig::load_from(path);
        assert_eq!(config.server.as_deref(), Some("https://ipa.example.test"));
        assert_eq!(config.api_version(), "2.251");
        assert!(config.schema_path().is_none());
    }

    #[test]
    fn schema_path_is_expanded_and_unreadable_file_ignored() {
        let dir = env::temp_dir().join(format!("ipaschema-config-schema-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{"schema_path": "/var/lib/ipa/schema.json"}"#).expect("write config");
        let config = ClientConfig::load_from(path.clone());
        assert_eq!(config.schema_path(), Some(PathBuf::from("/var/lib/ipa/schema.json")));

        std::fs::write(&path, "not json").expect("write config");
        assert_eq!(ClientConfig::load_from(path), ClientConfig::default());
    }

    #[test]
    fn tilde_paths_expand() {
        assert_eq!(expand_tilde("/etc/ipa"), PathBuf::from("/etc/ipa"));
        if let Some(home) = home_dir() {
            assert_eq!(expand_tilde("~/schema.json"), home.join("schema.json"));
        }
    }
}
