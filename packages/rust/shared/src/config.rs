//! Application configuration for paperdigest.
//!
//! User config lives at `~/.paperdigest/paperdigest.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PaperdigestError, Result};
use crate::types::Category;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "paperdigest.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".paperdigest";

// ---------------------------------------------------------------------------
// Config structs (matching paperdigest.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Pipeline defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// OpenAI settings.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Categories to track. Empty means the built-in default set.
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            defaults: DefaultsConfig::default(),
            openai: OpenAiConfig::default(),
            server: ServerConfig::default(),
            categories: Vec::new(),
        }
    }
}

impl AppConfig {
    /// The configured categories, falling back to the built-in set.
    pub fn categories(&self) -> Vec<Category> {
        if self.categories.is_empty() {
            default_categories()
        } else {
            self.categories.clone()
        }
    }
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Data directory holding the database and downloaded PDFs.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Papers to enrich per category per run.
    #[serde(default = "default_max_papers")]
    pub max_papers_per_category: u32,

    /// Recency window for candidate fetches, in days.
    #[serde(default = "default_days_back")]
    pub fetch_days_back: u32,

    /// How many categories may be processed simultaneously.
    #[serde(default = "default_category_concurrency")]
    pub category_concurrency: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            max_papers_per_category: default_max_papers(),
            fetch_days_back: default_days_back(),
            category_concurrency: default_category_concurrency(),
        }
    }
}

fn default_data_dir() -> String {
    "~/.paperdigest/data".into()
}
fn default_max_papers() -> u32 {
    1
}
fn default_days_back() -> u32 {
    7
}
fn default_category_concurrency() -> u32 {
    3
}

/// `[openai]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for ranking and enrichment.
    #[serde(default = "default_model")]
    pub model: String,

    /// API base URL (override for proxies and tests).
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            base_url: default_base_url(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8000
}

/// The built-in category set tracked when the config lists none.
pub fn default_categories() -> Vec<Category> {
    [
        ("cs.LG", "Machine Learning"),
        ("cs.CL", "Natural Language Processing"),
        ("cs.CV", "Computer Vision"),
        ("stat.ML", "Statistical ML"),
        ("quant-ph", "Quantum Physics"),
        ("nucl-th", "Nuclear Theory"),
        ("nucl-ex", "Nuclear Experiment"),
        ("cond-mat.mtrl-sci", "Materials Science"),
        ("astro-ph.GA", "Galaxy Astrophysics"),
        ("q-bio.NC", "Neurons & Cognition"),
        ("cs.CR", "Crypto & Security"),
    ]
    .into_iter()
    .map(|(code, name)| Category::new(code, name))
    .collect()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.paperdigest/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PaperdigestError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.paperdigest/paperdigest.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| PaperdigestError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        PaperdigestError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Expand a leading `~/` against the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

/// Read the OpenAI API key from the configured env var.
/// A missing key is fatal at startup.
pub fn api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.openai.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(PaperdigestError::config(format!(
            "OpenAI API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("max_papers_per_category"));
        assert!(toml_str.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.fetch_days_back, 7);
        assert_eq!(parsed.defaults.category_concurrency, 3);
        assert_eq!(parsed.openai.model, "gpt-4o-mini");
        assert_eq!(parsed.server.port, 8000);
    }

    #[test]
    fn config_with_categories() {
        let toml_str = r#"
[defaults]
max_papers_per_category = 3

[[categories]]
code = "cs.LG"
name = "Machine Learning"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.max_papers_per_category, 3);
        assert_eq!(config.categories().len(), 1);
        assert_eq!(config.categories()[0].code, "cs.LG");
    }

    #[test]
    fn empty_categories_fall_back_to_builtin() {
        let config = AppConfig::default();
        let cats = config.categories();
        assert_eq!(cats.len(), 11);
        assert!(cats.iter().any(|c| c.code == "quant-ph"));
    }

    #[test]
    fn api_key_missing_is_error() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.openai.api_key_env = "PD_TEST_NONEXISTENT_KEY_12345".into();
        let result = api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }

    #[test]
    fn expand_home_passthrough_for_absolute() {
        assert_eq!(expand_home("/tmp/x"), PathBuf::from("/tmp/x"));
    }
}
