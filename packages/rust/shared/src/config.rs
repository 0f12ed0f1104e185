//! Application configuration for the water quality auditor.
//!
//! User config lives at `~/.waterauditor/waterauditor.toml`.
//! CLI flags override config file values, which override defaults.
//! API keys are never stored in the file, only the names of the env vars
//! that hold them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AuditError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "waterauditor.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".waterauditor";

// ---------------------------------------------------------------------------
// Config structs (matching waterauditor.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// OpenAI-compatible reasoning service settings.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// SerpAPI search settings.
    #[serde(default)]
    pub serpapi: SerpApiConfig,

    /// Resource research policy.
    #[serde(default)]
    pub research: ResearchConfig,

    /// Report export defaults.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[openai]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Name of the env var holding the API key.
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,

    /// Base URL of the chat-completions API (without `/chat/completions`).
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model for risk mapping.
    #[serde(default = "default_model")]
    pub model: String,

    /// Vision-capable model for the visual analysis stage.
    #[serde(default = "default_model")]
    pub vision_model: String,

    /// Model for report composition.
    #[serde(default = "default_composer_model")]
    pub composer_model: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_openai_timeout")]
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_openai_key_env(),
            base_url: default_openai_base_url(),
            model: default_model(),
            vision_model: default_model(),
            composer_model: default_composer_model(),
            timeout_secs: default_openai_timeout(),
        }
    }
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_composer_model() -> String {
    "o3-mini".into()
}
fn default_openai_timeout() -> u64 {
    120
}

/// `[serpapi]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerpApiConfig {
    /// Name of the env var holding the API key.
    #[serde(default = "default_serp_key_env")]
    pub api_key_env: String,

    /// Base URL of the SerpAPI service.
    #[serde(default = "default_serp_base_url")]
    pub base_url: String,

    /// Search engine parameter.
    #[serde(default = "default_engine")]
    pub engine: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_serp_timeout")]
    pub timeout_secs: u64,
}

impl Default for SerpApiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_serp_key_env(),
            base_url: default_serp_base_url(),
            engine: default_engine(),
            timeout_secs: default_serp_timeout(),
        }
    }
}

fn default_serp_key_env() -> String {
    "SERP_API_KEY".into()
}
fn default_serp_base_url() -> String {
    "https://serpapi.com".into()
}
fn default_engine() -> String {
    "google".into()
}
fn default_serp_timeout() -> u64 {
    30
}

/// What the researcher does when a category search fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchFailurePolicy {
    /// Abort the whole pipeline with a search service error.
    #[default]
    Abort,
    /// Leave the category empty and annotate the report with a warning.
    Degrade,
}

/// `[research]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Maximum links kept per resource category.
    #[serde(default = "default_max_results")]
    pub max_results_per_category: usize,

    /// Behaviour when a category search fails.
    #[serde(default)]
    pub on_search_failure: SearchFailurePolicy,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_results_per_category: default_max_results(),
            on_search_failure: SearchFailurePolicy::default(),
        }
    }
}

fn default_max_results() -> usize {
    4
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory the report file is written to.
    #[serde(default = "default_output_dir")]
    pub dir: String,

    /// Report file name.
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            file_name: default_file_name(),
        }
    }
}

fn default_output_dir() -> String {
    ".".into()
}
fn default_file_name() -> String {
    "water_safety_report.md".into()
}

// ---------------------------------------------------------------------------
// Audit config (runtime, threaded into each pipeline run)
// ---------------------------------------------------------------------------

/// Runtime pipeline configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Maximum links kept per resource category.
    pub max_results_per_category: usize,
    /// Behaviour when a category search fails.
    pub on_search_failure: SearchFailurePolicy,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for AuditConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_results_per_category: config.research.max_results_per_category,
            on_search_failure: config.research.on_search_failure,
        }
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// API keys resolved once per session and shared read-only by every stage.
#[derive(Clone)]
pub struct Credentials {
    /// Key for the reasoning service.
    pub openai_api_key: String,
    /// Key for the search service.
    pub serp_api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_key", &"<redacted>")
            .field("serp_api_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Resolve both keys from the env vars named in the config.
    pub fn from_env(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            openai_api_key: read_key(&config.openai.api_key_env, "OpenAI")?,
            serp_api_key: read_key(&config.serpapi.api_key_env, "SerpAPI")?,
        })
    }
}

fn read_key(var_name: &str, service: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(AuditError::config(format!(
            "{service} API key not found. Set the {var_name} environment variable."
        ))),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.waterauditor/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| AuditError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.waterauditor/waterauditor.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AuditError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| AuditError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| AuditError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| AuditError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| AuditError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
