//! Application configuration for pagelift.
//!
//! User config lives at `~/.pagelift/pagelift.toml`.
//! Secrets are referenced by environment-variable name and never stored.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PageliftError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "pagelift.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".pagelift";

// ---------------------------------------------------------------------------
// Config structs (matching pagelift.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Document store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Local content settings.
    #[serde(default)]
    pub content: ContentConfig,

    /// Image host settings.
    #[serde(default)]
    pub images: ImagesConfig,
}

/// `[store]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Target database identifier.
    #[serde(default)]
    pub database_id: String,

    /// API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            database_id: String::new(),
            api_base: default_api_base(),
        }
    }
}

fn default_api_key_env() -> String {
    "PAGELIFT_API_KEY".into()
}
fn default_api_base() -> String {
    "https://api.notion.com/v1".into()
}

/// `[content]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Root directory scanned for markdown documents.
    #[serde(default)]
    pub base_directory: String,
}

/// `[images]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// Public URL prefix prepended to mirrored image filenames.
    /// Empty means no image host is configured; local image references
    /// become a config error at translation time.
    #[serde(default)]
    pub host_prefix: String,

    /// Local directory holding the images referenced by documents.
    #[serde(default)]
    pub local_dir: String,

    /// Object store HTTP endpoint.
    #[serde(default)]
    pub endpoint: String,

    /// Object store bucket name.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Key prefix under which objects are stored.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Name of the env var holding the object store auth token, if any.
    #[serde(default)]
    pub auth_token_env: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            host_prefix: String::new(),
            local_dir: String::new(),
            endpoint: String::new(),
            bucket: default_bucket(),
            key_prefix: default_key_prefix(),
            auth_token_env: String::new(),
        }
    }
}

fn default_bucket() -> String {
    "myimgs".into()
}
fn default_key_prefix() -> String {
    "blog/".into()
}

impl ImagesConfig {
    /// Whether an image host is configured at all.
    pub fn host_configured(&self) -> bool {
        !self.host_prefix.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.pagelift/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PageliftError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.pagelift/pagelift.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| PageliftError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| PageliftError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PageliftError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PageliftError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PageliftError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Resolve the store API key from the configured env var.
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.store.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(PageliftError::config(format!(
            "store API key not found. Set the {var_name} environment variable."
        ))),
    }
}

/// Check that the config is complete enough to run a sync.
pub fn validate_for_sync(config: &AppConfig) -> Result<()> {
    resolve_api_key(config)?;
    if config.store.database_id.is_empty() {
        return Err(PageliftError::config(
            "store.database_id is not set in pagelift.toml",
        ));
    }
    if config.content.base_directory.is_empty() {
        return Err(PageliftError::config(
            "content.base_directory is not set in pagelift.toml",
        ));
    }
    validate_url("store.api_base", &config.store.api_base)?;
    if config.images.host_configured() {
        validate_url("images.host_prefix", &config.images.host_prefix)?;
    }
    if !config.images.endpoint.is_empty() {
        validate_url("images.endpoint", &config.images.endpoint)?;
    }
    Ok(())
}

fn validate_url(field: &str, value: &str) -> Result<()> {
    url::Url::parse(value)
        .map_err(|e| PageliftError::config(format!("{field} is not a valid URL: {e}")))?;
    Ok(())
}
