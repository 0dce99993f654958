//! Configuration loading and management.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chatline_providers::HttpBackendConfig;
use chatline_providers::http::{DEFAULT_BASE_URL, DEFAULT_CHAT_PATH, DEFAULT_STREAM_PATH};
use chatline_providers::shared::resolve_base_url;
use chatline_render::{DEFAULT_CURSOR, RendererPreference};
use serde::{Deserialize, Serialize};

/// Environment variable overriding `endpoint.base_url`.
pub const BASE_URL_ENV: &str = "CHATLINE_BASE_URL";

pub mod paths {
    //! Path resolution for chatline configuration.
    //!
    //! CHATLINE_HOME resolution order:
    //! 1. CHATLINE_HOME environment variable (if set)
    //! 2. ~/.config/chatline (default)

    use std::path::PathBuf;

    pub fn chatline_home() -> PathBuf {
        if let Ok(home) = std::env::var("CHATLINE_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("chatline")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        chatline_home().join("config.toml")
    }
}

/// Returns the commented config template embedded at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Overlays `values` onto the commented template, keeping its comments.
///
/// The config holds only scalars and plain sections, so other item kinds
/// never appear here.
fn overlay_items(template: &mut toml_edit::Table, values: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, item) in values.iter() {
        match item {
            Item::Table(section) => {
                if let Some(Item::Table(existing)) = template.get_mut(key) {
                    overlay_items(existing, section);
                } else {
                    template[key] = item.clone();
                }
            }
            Item::Value(_) => template[key] = item.clone(),
            _ => {}
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Identifier the server keys conversation history by.
    pub user_id: String,
    pub renderer: RendererPreference,
    pub cursor: String,
    pub endpoint: EndpointConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub base_url: String,
    pub stream_path: String,
    pub chat_path: String,
    /// Per-strategy deadline; 0 disables.
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            stream_path: DEFAULT_STREAM_PATH.to_string(),
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            timeout_secs: Config::DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: Config::DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when CHATLINE_LOG is unset.
    pub level: String,
    /// Daily-rolling log file; stderr when unset.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Config::DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: Self::DEFAULT_USER_ID.to_string(),
            renderer: RendererPreference::default(),
            cursor: DEFAULT_CURSOR.to_string(),
            endpoint: EndpointConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    const DEFAULT_USER_ID: &str = "default";
    const DEFAULT_TIMEOUT_SECS: u64 = 60;
    const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
    const DEFAULT_LOG_LEVEL: &str = "warn";

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Renders `Config::default()` into the commented template.
    pub fn generate() -> Result<String> {
        use toml_edit::DocumentMut;

        let generated_toml = toml::to_string(&Config::default())
            .context("Failed to serialize default config to TOML")?;

        let mut doc: DocumentMut = default_config_template()
            .parse()
            .context("Failed to parse default config template")?;
        let generated_doc: DocumentMut = generated_toml
            .parse()
            .context("Failed to parse generated config")?;

        overlay_items(doc.as_table_mut(), generated_doc.as_table());

        Ok(doc.to_string())
    }

    /// Writes config content atomically (temp file + rename), creating
    /// parent directories as needed.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }

    /// Endpoint settings for the HTTP backend, with CHATLINE_BASE_URL applied.
    pub fn backend_config(&self) -> Result<HttpBackendConfig> {
        let base_url = resolve_base_url(
            Some(&self.endpoint.base_url),
            BASE_URL_ENV,
            DEFAULT_BASE_URL,
        )?;

        Ok(HttpBackendConfig {
            base_url,
            stream_path: self.endpoint.stream_path.clone(),
            chat_path: self.endpoint.chat_path.clone(),
            connect_timeout: secs(self.endpoint.connect_timeout_secs),
        })
    }

    /// Deadline applied to each strategy attempt.
    pub fn attempt_timeout(&self) -> Option<Duration> {
        secs(self.endpoint.timeout_secs)
    }
}

fn secs(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nonexistent.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.user_id, "default");
        assert_eq!(config.renderer, RendererPreference::Auto);
    }

    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(
            &config_path,
            "renderer = \"fallback\"\n[endpoint]\ntimeout_secs = 0\n",
        )
        .unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.renderer, RendererPreference::Fallback);
        assert_eq!(config.attempt_timeout(), None);
        assert_eq!(config.endpoint.chat_path, "/api/chat");
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_load_invalid_renderer_fails() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "renderer = \"fancy\"\n").unwrap();

        let err = Config::load_from(&config_path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config"));
    }

    #[test]
    fn test_init_creates_config() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subdir").join("config.toml");

        Config::init(&config_path).unwrap();

        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("user_id = \"default\""));
        assert!(contents.contains("# file ="));
        assert!(!config_path.with_extension("toml.tmp").exists());
        assert_eq!(Config::load_from(&config_path).unwrap(), Config::default());
    }

    #[test]
    fn test_init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "user_id = \"me\"\n").unwrap();

        assert!(Config::init(&config_path).is_err());
        assert_eq!(
            fs::read_to_string(&config_path).unwrap(),
            "user_id = \"me\"\n"
        );
    }

    /// The embedded template must match `Config::default()`.
    #[test]
    fn test_template_in_sync_with_defaults() {
        let template: Config = toml::from_str(default_config_template()).unwrap();
        assert_eq!(template, Config::default());

        let generated: Config = toml::from_str(&Config::generate().unwrap()).unwrap();
        assert_eq!(generated, Config::default());
    }

    #[test]
    fn test_overlay_keeps_template_comments() {
        use toml_edit::DocumentMut;

        let mut doc: DocumentMut = "# top\nuser_id = \"a\"\n\n[endpoint]\n# port note\nbase_url = \"x\"\n"
            .parse()
            .unwrap();
        let values: DocumentMut = "user_id = \"b\"\n[endpoint]\nbase_url = \"y\"\ntimeout_secs = 5\n[logging]\nlevel = \"info\"\n"
            .parse()
            .unwrap();

        overlay_items(doc.as_table_mut(), values.as_table());

        let rendered = doc.to_string();
        assert!(rendered.contains("# top"));
        assert!(rendered.contains("# port note"));
        let merged: toml::Table = toml::from_str(&rendered).unwrap();
        assert_eq!(merged["user_id"].as_str(), Some("b"));
        assert_eq!(merged["endpoint"]["base_url"].as_str(), Some("y"));
        assert_eq!(merged["endpoint"]["timeout_secs"].as_integer(), Some(5));
        assert_eq!(merged["logging"]["level"].as_str(), Some("info"));
    }

    #[test]
    fn test_backend_config_from_endpoint() {
        let mut config = Config::default();
        config.endpoint.base_url = "http://chat.test:9000/".to_string();
        config.endpoint.connect_timeout_secs = 0;

        // Holds unless the environment sets CHATLINE_BASE_URL for the test run.
        if std::env::var(BASE_URL_ENV).is_err() {
            let backend = config.backend_config().unwrap();
            assert_eq!(backend.base_url, "http://chat.test:9000");
            assert_eq!(backend.stream_path, "/api/chat/stream");
            assert_eq!(backend.connect_timeout, None);
        }
    }

    #[test]
    fn test_attempt_timeout() {
        assert_eq!(
            Config::default().attempt_timeout(),
            Some(Duration::from_secs(60))
        );
    }
}
