//! Application configuration for Carton.
//!
//! User config lives at `~/.carton/carton.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CartonError, Result};
use crate::types::{ASSEMBLY_BUCKET, COMPONENT_BUCKET, DEFAULT_HDD};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "carton.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".carton";

// ---------------------------------------------------------------------------
// Config structs (matching carton.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Record store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Fallbacks applied while composing cartons.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Source retrieval settings.
    #[serde(default)]
    pub repository: RepositoryConfig,
}

/// `[store]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the libSQL database file.
    #[serde(default = "default_store_path")]
    pub path: String,

    /// Bucket holding assembly records.
    #[serde(default = "default_assembly_bucket")]
    pub assembly_bucket: String,

    /// Bucket holding component records.
    #[serde(default = "default_component_bucket")]
    pub component_bucket: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            assembly_bucket: default_assembly_bucket(),
            component_bucket: default_component_bucket(),
        }
    }
}

fn default_store_path() -> String {
    "~/.carton/carton.db".into()
}
fn default_assembly_bucket() -> String {
    ASSEMBLY_BUCKET.into()
}
fn default_component_bucket() -> String {
    COMPONENT_BUCKET.into()
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Disk size used when an assembly leaves `hdd` blank.
    #[serde(default = "default_hdd")]
    pub hdd: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self { hdd: default_hdd() }
    }
}

fn default_hdd() -> String {
    DEFAULT_HDD.into()
}

/// `[repository]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Root directory that checkouts are cloned into.
    #[serde(default = "default_workdir")]
    pub workdir: String,

    /// Git executable used by the github manager.
    #[serde(default = "default_git_bin")]
    pub git_bin: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            workdir: default_workdir(),
            git_bin: default_git_bin(),
        }
    }
}

fn default_workdir() -> String {
    "~/.carton/sources".into()
}
fn default_git_bin() -> String {
    "git".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.carton/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| CartonError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.carton/carton.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Expand a leading `~/` against the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| CartonError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
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
    let content = std::fs::read_to_string(path).map_err(|e| CartonError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| CartonError::config(format!("failed to parse {}: {e}", path.display())))?;
    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CartonError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CartonError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CartonError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject configs that would make every lookup miss.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.store.assembly_bucket.trim().is_empty() {
        return Err(CartonError::config("store.assembly_bucket must not be empty"));
    }
    if config.store.component_bucket.trim().is_empty() {
        return Err(CartonError::config("store.component_bucket must not be empty"));
    }
    if config.defaults.hdd.trim().is_empty() {
        return Err(CartonError::config("defaults.hdd must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("assembly_bucket"));
        assert!(toml_str.contains("git_bin"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[store]
path = "/var/lib/carton/carton.db"

[defaults]
hdd = "40"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.store.path, "/var/lib/carton/carton.db");
        assert_eq!(config.store.assembly_bucket, "assembly");
        assert_eq!(config.store.component_bucket, "components");
        assert_eq!(config.defaults.hdd, "40");
        assert_eq!(config.repository.git_bin, "git");
    }

    #[test]
    fn blank_bucket_is_rejected() {
        let mut config = AppConfig::default();
        config.store.assembly_bucket = "  ".into();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("assembly_bucket"));
    }

    #[test]
    fn expand_home_leaves_absolute_paths() {
        assert_eq!(
            expand_home("/tmp/carton.db").unwrap(),
            PathBuf::from("/tmp/carton.db")
        );
        let expanded = expand_home("~/x/carton.db").unwrap();
        assert!(expanded.ends_with("x/carton.db"));
        assert!(!expanded.starts_with("~"));
    }

    #[test]
    fn load_from_file() {
        let path = std::env::temp_dir().join(format!("carton_cfg_{}.toml", Uuid::now_v7()));
        std::fs::write(&path, "[repository]\nworkdir = \"/srv/src\"\n").unwrap();
        let config = load_config_from(&path).expect("load");
        assert_eq!(config.repository.workdir, "/srv/src");
        std::fs::remove_file(&path).ok();
    }
}
