use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_LOG_LEVEL: &str = "docwizard=info";

/// Main configuration structure loaded from docwizard.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub completion: CompletionConfig,
    pub storage: StorageConfig,
    pub export: ExportConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Completion endpoint settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub endpoint: String,
    pub model: String,
    /// Unset means a request may wait indefinitely.
    pub request_timeout_ms: Option<u64>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout_ms: None,
        }
    }
}

/// Where the persisted credential lives
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
        }
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn load_from_env() -> Self {
        Self {
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string()),
        }
    }
}

fn default_storage_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docwizard")
        .join("storage.json")
}

impl Config {
    /// Load configuration from TOML file and environment variables
    /// Uses DOCWIZARD_CONFIG environment variable or defaults to "docwizard.toml"
    pub fn load() -> anyhow::Result<Self> {
        Self::load_env_file();

        let explicit_path = std::env::var("DOCWIZARD_CONFIG").ok();
        let config_path = explicit_path
            .clone()
            .unwrap_or_else(|| "docwizard.toml".to_string());

        let mut config: Config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            Self::from_toml(&content)?
        } else if explicit_path.is_some() {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        } else {
            tracing::debug!("No {} in working directory, using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();
        config.runtime = RuntimeConfig::load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load `.env` from DOCWIZARD_ENV_FILE or the working directory.
    /// Variables already set in the process win.
    pub fn load_env_file() {
        if let Ok(env_path) = std::env::var("DOCWIZARD_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::from_path(".env");
        }
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = std::env::var("DOCWIZARD_ENDPOINT") {
            self.completion.endpoint = endpoint;
            tracing::debug!("DOCWIZARD_ENDPOINT env override applied");
        }
        if let Ok(model) = std::env::var("DOCWIZARD_MODEL") {
            self.completion.model = model;
            tracing::debug!("DOCWIZARD_MODEL env override applied");
        }
        if let Some(timeout) = std::env::var("DOCWIZARD_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            self.completion.request_timeout_ms = Some(timeout);
        }
        if let Ok(path) = std::env::var("DOCWIZARD_STORAGE_PATH") {
            self.storage.path = PathBuf::from(path);
        }
    }

    /// Reject settings the completion client cannot work with
    pub fn validate(&mut self) -> anyhow::Result<()> {
        let endpoint = &self.completion.endpoint;
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            anyhow::bail!(
                "completion endpoint '{}' must start with http:// or https://",
                endpoint
            );
        }
        if self.completion.model.trim().is_empty() {
            anyhow::bail!("completion model must not be empty");
        }
        if self.completion.request_timeout_ms == Some(0) {
            tracing::warn!("request_timeout_ms = 0 treated as no timeout");
            self.completion.request_timeout_ms = None;
        }
        Ok(())
    }
}
