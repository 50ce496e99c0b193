use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{LettingsError, Result};

/// Top-level configuration for the lettings assistant.
///
/// Loaded from `~/.lettings/config.toml` by default, then overlaid with
/// environment variables. Read once at process start and never mutated
/// afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LettingsConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

impl LettingsConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LettingsConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| LettingsError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Overlay values from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary key lookup.
    ///
    /// Unparseable numeric values are ignored with a warning so a typo in the
    /// environment never prevents start-up.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.completion.api_key = key;
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            self.completion.model = model;
        }
        if let Some(raw) = lookup("OPENAI_MAX_TOKENS") {
            match raw.parse::<u32>() {
                Ok(v) => self.completion.max_tokens = v,
                Err(_) => warn!(value = %raw, "Ignoring invalid OPENAI_MAX_TOKENS"),
            }
        }
        if let Some(uri) = lookup("LETTINGS_STORE_URI") {
            self.store.uri = uri;
        }
        if let Some(name) = lookup("LETTINGS_STORE_NAME") {
            self.store.name = name;
        }
        if let Some(env) = lookup("LETTINGS_ENV") {
            self.general.environment = env;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.general.log_level = level;
        }
        if let Some(raw) = lookup("LETTINGS_PORT") {
            match raw.parse::<u16>() {
                Ok(v) => self.server.port = v,
                Err(_) => warn!(value = %raw, "Ignoring invalid LETTINGS_PORT"),
            }
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Deployment environment: development, test, production.
    pub environment: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl GeneralConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// WebSocket server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

/// Completion API settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 1500,
            temperature: 0.7,
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

impl std::fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Document store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the database file, or `:memory:`.
    pub uri: String,
    /// Database name; the file is `<uri>/<name>.db`.
    pub name: String,
    /// Insert sample properties and residents into empty collections on start.
    pub seed_sample_data: bool,
}

impl StoreConfig {
    pub fn is_in_memory(&self) -> bool {
        self.uri == ":memory:"
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: "~/.lettings/data".to_string(),
            name: "property_management".to_string(),
            seed_sample_data: true,
        }
    }
}

/// Conversation behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Maximum number of turns retained per conversation.
    pub history_limit: usize,
    /// Number of prior turns sent with each completion request.
    pub prompt_turns: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            history_limit: 20,
            prompt_turns: 10,
        }
    }
}

/// Terminal client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server_url: String,
    pub reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:3001/ws".to_string(),
            reconnect_attempts: 5,
            reconnect_delay_ms: 1000,
        }
    }
}
