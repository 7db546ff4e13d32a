use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::llm::Backend;
use crate::prompt::{PromptMode, DEFAULT_SYSTEM_PROMPT};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Backend
    pub backend: Backend,
    pub endpoint_url: String,
    pub model_name: String,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout_secs: u64,

    // Popup
    pub default_mode: PromptMode,

    // Watcher
    pub poll_interval_ms: u64,
    pub debounce_ms: u64,
    pub extra_source_commands: Vec<String>,

    // Meta
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::OpenAiChat,
            endpoint_url: "http://localhost:1234".to_string(),
            model_name: "meta-llama-3.1-8b-instruct".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            request_timeout_secs: 30,
            default_mode: PromptMode::Write,
            // Poll is the correctness backstop behind the event feeds; the
            // interval trades CPU for staleness bound.
            poll_interval_ms: 100,
            debounce_ms: 8,
            extra_source_commands: Vec::new(),
            log_level: "INFO".to_string(),
        }
    }
}

impl Config {
    /// Load config from file or create default
    pub fn load() -> Result<Self> {
        let config_path = config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            match serde_json::from_str(&content) {
                Ok(config) => Ok(config),
                Err(e) => {
                    // Graceful degradation: log warning and use defaults
                    tracing::warn!("⚠️ Config file corrupted or invalid, using defaults: {}", e);
                    // Backup corrupt file for debugging
                    let backup_path = config_path.with_extension("json.corrupt");
                    let _ = std::fs::rename(&config_path, &backup_path);
                    Ok(Self::default())
                }
            }
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let config_path = config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("selrelay")
        .join("config.json")
}
