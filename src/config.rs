//! Configuration management
//!
//! Storage location, model settings for the collaborators, and the
//! performance multiplier tables. Stored as TOML in the platform config dir.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::performance::PerformanceConfig;
use crate::store::DEFAULT_WARM_THRESHOLD;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Where templates are kept
    #[serde(default)]
    pub storage: StorageConfig,
    /// Model-backed collaborators
    #[serde(default)]
    pub llm: LlmConfig,
    /// Prediction multipliers
    #[serde(default)]
    pub performance: PerformanceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Repository root; defaults to `<data dir>/templates`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    /// Listings thinner than this trigger a full directory scan
    #[serde(default = "default_warm_threshold")]
    pub warm_threshold: usize,
}

fn default_warm_threshold() -> usize {
    DEFAULT_WARM_THRESHOLD
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: None,
            warm_threshold: default_warm_threshold(),
        }
    }
}

impl StorageConfig {
    pub fn resolve_root(&self) -> Result<PathBuf> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => Ok(data_dir()?.join("templates")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Model used to extract templates from content
    #[serde(default = "default_analysis_model")]
    pub analysis_model: String,
    /// Model used to adapt templates
    #[serde(default = "default_adaptation_model")]
    pub adaptation_model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Client-side request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}

fn default_analysis_model() -> String {
    "openai/gpt-4o".to_string()
}

fn default_adaptation_model() -> String {
    "openai/gpt-4o".to_string()
}

fn default_max_tokens() -> u32 {
    2500
}

fn default_timeout_secs() -> u64 {
    90
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            analysis_model: default_analysis_model(),
            adaptation_model: default_adaptation_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    /// Model for a role name
    pub fn model(&self, role: &str) -> Option<&str> {
        match role.to_lowercase().as_str() {
            "analysis" | "analyzer" | "extract" => Some(&self.analysis_model),
            "adaptation" | "adapter" | "adapt" => Some(&self.adaptation_model),
            _ => None,
        }
    }

    /// Set the model for a role name
    pub fn set_model(&mut self, role: &str, model: String) -> bool {
        match role.to_lowercase().as_str() {
            "analysis" | "analyzer" | "extract" => {
                self.analysis_model = model;
                true
            }
            "adaptation" | "adapter" | "adapt" => {
                self.adaptation_model = model;
                true
            }
            _ => false,
        }
    }

    pub fn roles() -> &'static [&'static str] {
        &["analysis", "adaptation"]
    }
}

impl Config {
    /// Load configuration from the default location, creating it on first use
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Load configuration from `path`, writing defaults there if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path.parent().context("Config path has no parent")?;
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).context("Failed to write config file")?;
        Ok(())
    }
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "viral-templates", "viral-templates")
        .context("Failed to get project directories")
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("config.toml"))
}

/// Get the data directory path
pub fn data_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().to_path_buf())
}

/// Print the effective configuration
pub fn show_config(config: &Config, path: &Path) -> Result<()> {
    println!("Config file:      {}", path.display());
    println!("Storage root:     {}", config.storage.resolve_root()?.display());
    println!("Warm threshold:   {}", config.storage.warm_threshold);
    println!("API base URL:     {}", config.llm.base_url);
    println!("API key env var:  {}", config.llm.api_key_env);
    println!("Analysis model:   {}", config.llm.analysis_model);
    println!("Adaptation model: {}", config.llm.adaptation_model);
    println!("Max tokens:       {}", config.llm.max_tokens);
    println!("Timeout:          {}s", config.llm.timeout_secs);
    Ok(())
}

/// Set the model for a collaborator role and persist it
pub fn set_model(path: &Path, role: &str, model: &str) -> Result<()> {
    let mut config = Config::load_from(path)?;
    if !config.llm.set_model(role, model.to_string()) {
        anyhow::bail!("Unknown role '{}'. Available roles: {}", role, LlmConfig::roles().join(", "));
    }
    config.save_to(path)?;
    println!("Model for '{}' set to: {}", role, model);
    Ok(())
}

/// Point the repository at a different root directory
pub fn set_storage_root(path: &Path, root: &Path) -> Result<()> {
    let mut config = Config::load_from(path)?;
    config.storage.root = Some(root.to_path_buf());
    config.save_to(path)?;
    println!("Storage root set to {}", root.display());
    Ok(())
}

/// Reset configuration to defaults
pub fn reset_config(path: &Path) -> Result<()> {
    Config::default().save_to(path)?;
    println!("Configuration reset to defaults.");
    Ok(())
}
