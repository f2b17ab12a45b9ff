//! Bootstrap configuration and root folder resolution
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Compiled defaults
//!
//! Missing or unreadable TOML files never stop startup; the service logs a
//! warning and continues with the remaining sources.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory name used under the platform config/data folders
pub const APP_DIR_NAME: &str = "meter-reader";

/// Environment variable overriding the root folder
pub const ENV_ROOT_FOLDER: &str = "METER_ROOT_FOLDER";

/// Environment variable overriding the HTTP port
pub const ENV_PORT: &str = "METER_PORT";

/// Environment variable overriding the public base URL for stored images
pub const ENV_PUBLIC_BASE_URL: &str = "METER_PUBLIC_BASE_URL";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "meter.db";

/// Image folder name inside the root folder (also the URL path segment)
pub const TEMP_DIR_NAME: &str = "temp";

/// Bootstrap configuration loaded from TOML
///
/// Every field is optional; absent values fall through to the next source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the database and stored images
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP bind address
    #[serde(default)]
    pub host: Option<String>,

    /// HTTP port
    #[serde(default)]
    pub port: Option<u16>,

    /// Base URL under which `/temp/<file>` image links are published
    #[serde(default)]
    pub public_base_url: Option<String>,

    /// Gemini API key
    #[serde(default)]
    pub gemini_api_key: Option<String>,

    /// Gemini model name
    #[serde(default)]
    pub gemini_model: Option<String>,

    /// Gemini REST base URL (overridable for testing)
    #[serde(default)]
    pub gemini_base_url: Option<String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
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

impl TomlConfig {
    /// Parse TOML configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
        Self::from_str(&content)
    }

    /// Parse TOML configuration from a string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load TOML config from an explicit path or the platform default location
    ///
    /// Returns defaults (with a warning) when the file is missing or invalid.
    pub fn load_or_default(explicit: Option<&Path>) -> Self {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_file(),
        };

        match path {
            Some(path) if path.exists() => match Self::from_file(&path) {
                Ok(config) => {
                    debug!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Ignoring configuration file: {}", e);
                    Self::default()
                }
            },
            Some(path) => {
                if explicit.is_some() {
                    warn!("Config file not found: {}", path.display());
                }
                Self::default()
            }
            None => Self::default(),
        }
    }
}

/// Built-in defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            log_level: default_log_level(),
            gemini_model: "gemini-1.5-pro".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
        }
    }
}

/// Platform config file (`~/.config/meter-reader/config.toml`, then
/// `/etc/meter-reader/config.toml` on Linux)
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"));

    if let Some(path) = &user_config {
        if path.exists() {
            return user_config;
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(APP_DIR_NAME).join("config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    user_config
}

/// OS-dependent default root folder
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./meter_data"))
}

/// Root folder resolution: CLI → ENV → TOML → compiled default
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_value: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            toml_value: None,
        }
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_toml(mut self, toml: &TomlConfig) -> Self {
        self.toml_value = toml.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            debug!("[{}] root folder from command line", self.module_name);
            return path.clone();
        }

        if let Ok(path) = std::env::var(ENV_ROOT_FOLDER) {
            if !path.trim().is_empty() {
                debug!("[{}] root folder from {}", self.module_name, ENV_ROOT_FOLDER);
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_value {
            debug!("[{}] root folder from TOML config", self.module_name);
            return path.clone();
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder layout on first start
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Create root folder and image folder if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        std::fs::create_dir_all(self.temp_dir())?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.root_folder.join(TEMP_DIR_NAME)
    }
}

/// Resolve HTTP port: CLI → ENV → TOML → default
pub fn resolve_port(cli_arg: Option<u16>, toml: &TomlConfig) -> Result<u16> {
    if let Some(port) = cli_arg {
        return Ok(port);
    }

    if let Ok(value) = std::env::var(ENV_PORT) {
        return value
            .trim()
            .parse::<u16>()
            .map_err(|e| Error::Config(format!("Invalid {} '{}': {}", ENV_PORT, value, e)));
    }

    Ok(toml
        .port
        .unwrap_or_else(|| CompiledDefaults::for_current_platform().port))
}

/// Resolve public base URL: ENV → TOML → `http://localhost:{port}`
///
/// Trailing slashes are stripped so image URLs join cleanly.
pub fn resolve_public_base_url(port: u16, toml: &TomlConfig) -> String {
    let url = std::env::var(ENV_PUBLIC_BASE_URL)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| toml.public_base_url.clone())
        .unwrap_or_else(|| format!("http://localhost:{}", port));

    url.trim_end_matches('/').to_string()
}
