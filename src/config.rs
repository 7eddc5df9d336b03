use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct HearthConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub remote: RemoteConfig,
    pub retrieval: RetrievalConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider name. Only `"openai"` (and OpenAI-compatible endpoints) is supported.
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub dimensions: usize,
    /// Content longer than this is cut before it is sent for embedding.
    pub max_input_chars: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the Supabase project (or any PostgREST endpoint).
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub table: String,
    pub match_function: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    pub semantic_weight: f64,
    pub keyword_weight: f64,
    pub similarity_threshold: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SyncConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub batch_size: usize,
    pub migration_batch_size: usize,
    pub migration_delay_ms: u64,
    pub mirror_on_write: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_hearth_dir()
            .join("memory.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            model: "text-embedding-3-small".into(),
            base_url: "https://api.openai.com".into(),
            api_key: None,
            dimensions: crate::embedding::EMBEDDING_DIM,
            max_input_chars: 8000,
            timeout_secs: 10,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            table: "memories".into(),
            match_function: "match_memories".into(),
            timeout_secs: 10,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
            semantic_weight: 0.7,
            keyword_weight: 0.3,
            similarity_threshold: 0.5,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
            batch_size: 1000,
            migration_batch_size: 5,
            migration_delay_ms: 1000,
            mirror_on_write: true,
        }
    }
}

/// Returns `~/.hearth/`, or `./.hearth` when no home directory is known.
pub fn default_hearth_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".hearth")
}

/// Returns the default config file path: `~/.hearth/config.toml`
pub fn default_config_path() -> PathBuf {
    default_hearth_dir().join("config.toml")
}

impl HearthConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            HearthConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// `SUPABASE_*`, `OPENAI_API_KEY` and `PORT` are read under their conventional
    /// names so the server drops into existing deployments unchanged.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HEARTH_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("HEARTH_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("HEARTH_HOST") {
            self.server.host = val;
        }
        for key in ["PORT", "HEARTH_PORT"] {
            if let Some(port) = std::env::var(key).ok().and_then(|v| v.parse().ok()) {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("SUPABASE_URL") {
            self.remote.url = Some(val);
        }
        for key in ["SUPABASE_KEY", "SUPABASE_SERVICE_KEY"] {
            if let Ok(val) = std::env::var(key) {
                self.remote.api_key = Some(val);
            }
        }
        if let Ok(val) = std::env::var("OPENAI_API_KEY") {
            self.embedding.api_key = Some(val);
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

impl RemoteConfig {
    /// Both the URL and the credential are present and non-empty.
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.url) && present(&self.api_key)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = HearthConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.embedding.dimensions, 1536);
        assert_eq!(config.retrieval.semantic_weight, 0.7);
        assert_eq!(config.retrieval.keyword_weight, 0.3);
        assert_eq!(config.sync.interval_secs, 30);
        assert_eq!(config.sync.migration_batch_size, 5);
        assert!(config.storage.db_path.ends_with("memory.db"));
        assert!(!config.remote.is_configured());
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
port = 8080

[storage]
db_path = "/tmp/test.db"

[remote]
url = "https://example.supabase.co"
api_key = "service-key"

[retrieval]
default_limit = 25
"#;
        let config: HearthConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.db_path, "/tmp/test.db");
        assert_eq!(config.retrieval.default_limit, 25);
        assert!(config.remote.is_configured());
        // defaults still apply for unset fields
        assert_eq!(config.remote.table, "memories");
        assert_eq!(config.retrieval.semantic_weight, 0.7);
    }

    #[test]
    fn blank_remote_key_is_not_configured() {
        let remote = RemoteConfig {
            url: Some("https://example.supabase.co".into()),
            api_key: Some("  ".into()),
            ..RemoteConfig::default()
        };
        assert!(!remote.is_configured());
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = HearthConfig::default();
        std::env::set_var("HEARTH_DB", "/tmp/override.db");
        std::env::set_var("HEARTH_LOG_LEVEL", "trace");
        std::env::set_var("HEARTH_PORT", "4100");
        std::env::set_var("SUPABASE_URL", "https://env.supabase.co");
        std::env::set_var("SUPABASE_SERVICE_KEY", "env-key");

        config.apply_env_overrides();

        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.server.log_level, "trace");
        assert_eq!(config.server.port, 4100);
        assert_eq!(config.remote.url.as_deref(), Some("https://env.supabase.co"));
        assert_eq!(config.remote.api_key.as_deref(), Some("env-key"));

        // Clean up
        std::env::remove_var("HEARTH_DB");
        std::env::remove_var("HEARTH_LOG_LEVEL");
        std::env::remove_var("HEARTH_PORT");
        std::env::remove_var("SUPABASE_URL");
        std::env::remove_var("SUPABASE_SERVICE_KEY");
    }
}
