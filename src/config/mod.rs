mod api;
mod chat;
mod defaults;
mod validation;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use api::ApiConfig;
pub use chat::{ChatConfig, SessionConfig};
pub use defaults::{
    default_api_base_url, default_initial_greeting, default_session_ttl_secs,
    default_stream_timeout_secs,
};
pub use validation::{expand_env_var_in_string, normalize_base_url};

pub const ENV_API_URL: &str = "AGENTCHAT_API_URL";
pub const ENV_GREETING: &str = "AGENTCHAT_GREETING";
pub const ENV_SESSION_TTL: &str = "AGENTCHAT_SESSION_TTL_SECS";
pub const ENV_STREAM_TIMEOUT: &str = "AGENTCHAT_STREAM_TIMEOUT";

/// Settings injected into the chat client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Endpoint root; request paths such as `/chat` are appended to it.
    pub api_base_url: String,
    /// Assistant message every conversation starts with.
    pub initial_greeting: String,
    /// How long a session id stays valid after it was minted.
    pub session_ttl: Duration,
    /// Longest wait for the next chunk of a streaming response.
    ///
    /// A turn whose stream stays silent for longer fails with [`crate::ChatError::Timeout`]
    /// and records the failure message, even if the service would have answered later.
    pub stream_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            initial_greeting: default_initial_greeting(),
            session_ttl: Duration::from_secs(default_session_ttl_secs()),
            stream_timeout: Duration::from_secs(default_stream_timeout_secs()),
        }
    }
}

/// On-disk configuration file, YAML or JSON.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FileConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl ClientConfig {
    /// Resolve settings: environment > config file > defaults.
    pub fn load() -> crate::error::Result<Self> {
        let file_config = FileConfig::load()?;
        Self::resolve(&file_config, |key| env::var(key).ok())
    }

    /// Resolve settings from a parsed file and an environment lookup.
    pub fn resolve<F>(file_config: &FileConfig, lookup: F) -> crate::error::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_base_url = lookup(ENV_API_URL)
            .or_else(|| file_config.api.base_url.clone())
            .unwrap_or_else(default_api_base_url);
        let api_base_url =
            normalize_base_url(&raw_base_url).map_err(crate::error::ChatError::ConfigError)?;

        let initial_greeting = lookup(ENV_GREETING)
            .or_else(|| file_config.chat.initial_greeting.clone())
            .unwrap_or_else(default_initial_greeting);

        let session_ttl_secs = parse_secs(lookup(ENV_SESSION_TTL), ENV_SESSION_TTL)?
            .or(file_config.session.ttl_secs)
            .unwrap_or_else(default_session_ttl_secs);

        let stream_timeout_secs = parse_secs(lookup(ENV_STREAM_TIMEOUT), ENV_STREAM_TIMEOUT)?
            .or(file_config.api.stream_timeout)
            .unwrap_or_else(default_stream_timeout_secs);

        if session_ttl_secs == 0 {
            return Err(crate::error::ChatError::ConfigError(
                "session ttl must be greater than zero".to_string(),
            ));
        }
        if stream_timeout_secs == 0 {
            return Err(crate::error::ChatError::ConfigError(
                "stream timeout must be greater than zero".to_string(),
            ));
        }

        Ok(ClientConfig {
            api_base_url,
            initial_greeting,
            session_ttl: Duration::from_secs(session_ttl_secs),
            stream_timeout: Duration::from_secs(stream_timeout_secs),
        })
    }

    /// Full URL of an API path, e.g. `endpoint("/chat")`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn parse_secs(value: Option<String>, name: &str) -> crate::error::Result<Option<u64>> {
    match value {
        None => Ok(None),
        Some(v) => v.trim().parse::<u64>().map(Some).map_err(|e| {
            crate::error::ChatError::ConfigError(format!("{} must be whole seconds: {}", name, e))
        }),
    }
}

impl FileConfig {
    pub fn load() -> Result<Self> {
        for path in Self::get_config_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        // No config file found, return default
        Ok(FileConfig::default())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let is_yaml = matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("yaml") | Some("yml")
        );
        let config: FileConfig = if is_yaml {
            serde_yaml::from_str(&contents).with_context(|| {
                format!("Failed to parse YAML config file: {}", path.display())
            })?
        } else {
            serde_json::from_str(&contents).with_context(|| {
                format!("Failed to parse JSON config file: {}", path.display())
            })?
        };

        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    pub fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // 1. Current directory (highest priority - local override)
        paths.push(PathBuf::from(".agentchat.yaml"));
        paths.push(PathBuf::from(".agentchat.yml"));
        paths.push(PathBuf::from(".agentchat.json"));

        // 2. User's config directory (global config)
        if let Some(home_dir) = dirs::home_dir() {
            let config_dir = home_dir.join(".config").join("agentchat");
            paths.push(config_dir.join("agentchat.yaml"));
            paths.push(config_dir.join("agentchat.yml"));
            paths.push(config_dir.join("agentchat.json"));
        }

        paths
    }
}
