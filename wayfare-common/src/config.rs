//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`WAYFARE_ROOT_FOLDER`, then legacy `WAYFARE_ROOT`)
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! Missing or malformed TOML files never abort start-up: they log a warning and
//! the compiled defaults apply.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "WAYFARE_ROOT_FOLDER";
/// Legacy alias for [`ROOT_FOLDER_ENV`]
pub const ROOT_FOLDER_ENV_LEGACY: &str = "WAYFARE_ROOT";
/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "wayfare.db";

/// Stock photo used whenever no provider image is available
pub const DEFAULT_IMAGE_URL: &str =
    "https://images.unsplash.com/photo-1488646953014-85cb44e25828?w=1200&q=80";

/// Compiled default values for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub bind_address: String,
    pub port: u16,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: "info".to_string(),
            bind_address: "127.0.0.1".to_string(),
            port: 5740,
        }
    }
}

/// `[logging]` section of the TOML config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `[providers]` section of the TOML config
///
/// API keys here are the lowest-priority source; the planner also consults the
/// database settings table and environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub unsplash_access_key: Option<String>,
    pub google_maps_api_key: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub scraper_url: Option<String>,
    /// Upper bound for any single external call, in milliseconds
    pub call_timeout_ms: Option<u64>,
    pub default_image_url: Option<String>,
}

/// Contents of `wayfare-planner.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub providers: ProviderConfig,
}

impl TomlConfig {
    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load config from `path`, falling back to defaults when the file is
    /// missing or unreadable
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_toml_str(&content) {
                Ok(config) => {
                    info!(path = %path.display(), "Loaded config file");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Malformed config file, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable config file, using defaults");
                Self::default()
            }
        }
    }
}

/// Default config file location for a module (`~/.config/wayfare/<module>.toml`)
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wayfare").join(format!("{}.toml", module_name)))
}

/// Resolves the root folder following the documented priority order
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            cli_arg: None,
            toml_root: None,
        }
    }

    /// Root folder given on the command line
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// Root folder from the loaded TOML config
    pub fn with_toml_config(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            debug!(module = %self.module_name, "Root folder from command line");
            return path.clone();
        }

        for var in [ROOT_FOLDER_ENV, ROOT_FOLDER_ENV_LEGACY] {
            if let Ok(path) = std::env::var(var) {
                if !path.trim().is_empty() {
                    debug!(module = %self.module_name, env = var, "Root folder from environment");
                    return PathBuf::from(path);
                }
            }
        }

        if let Some(path) = &self.toml_root {
            debug!(module = %self.module_name, "Root folder from TOML config");
            return path.clone();
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder and locates files inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("wayfare"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/wayfare"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("wayfare"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/wayfare"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("wayfare"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\wayfare"))
    } else {
        PathBuf::from("./wayfare_data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_config_parses_provider_section() {
        let config = TomlConfig::from_toml_str(
            r#"
            port = 6000

            [logging]
            level = "debug"

            [providers]
            llm_model = "gpt-4o-mini"
            call_timeout_ms = 2500
            "#,
        )
        .unwrap();

        assert_eq!(config.port, Some(6000));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.providers.llm_model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(config.providers.call_timeout_ms, Some(2500));
        assert!(config.providers.unsplash_access_key.is_none());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert!(config.root_folder.is_none());
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("port = \"not a number").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_initializer_database_path() {
        let init = RootFolderInitializer::new(PathBuf::from("/tmp/wayfare-root"));
        assert_eq!(init.database_path(), PathBuf::from("/tmp/wayfare-root/wayfare.db"));
    }
}
