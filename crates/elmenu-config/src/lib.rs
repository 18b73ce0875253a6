//! Configuration management for elmenu.
//!
//! Parses `elmenu.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! Path values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `store.path`
//! - `cache.dir`

mod expand;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override menu record file.
    pub store_path: Option<PathBuf>,
    /// Override cache backend.
    pub cache_backend: Option<CacheBackend>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "elmenu.toml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Site-wide language settings.
    pub site: SiteConfig,
    /// Record store configuration (paths are relative strings from TOML).
    store: StoreConfigRaw,
    /// Cache configuration (paths are relative strings from TOML).
    cache: CacheConfigRaw,
    /// Menu rendering configuration.
    pub menu: MenuConfig,
    /// Error notification rate limiting.
    pub errors: ErrorsConfig,

    /// Resolved store configuration (set after loading).
    #[serde(skip)]
    pub store_resolved: StoreConfig,
    /// Resolved cache configuration (set after loading).
    #[serde(skip)]
    pub cache_resolved: CacheConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Site-wide language settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Languages menus are rendered and generated for.
    pub languages: Vec<String>,
    /// Language whose URLs carry no `/<lang>` prefix.
    pub default_language: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_owned()],
            default_language: "en".to_owned(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct StoreConfigRaw {
    path: Option<String>,
}

/// Resolved record store configuration.
#[derive(Debug, Default)]
pub struct StoreConfig {
    /// YAML file holding menu items and translations.
    pub path: PathBuf,
}

/// Cache backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Entries persisted under `cache.dir`, shared between processes.
    #[default]
    File,
    /// Entries kept in process memory.
    Memory,
    /// Caching disabled.
    None,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CacheConfigRaw {
    backend: Option<CacheBackend>,
    dir: Option<String>,
}

/// Resolved cache configuration.
#[derive(Debug, Default)]
pub struct CacheConfig {
    /// Selected backend.
    pub backend: CacheBackend,
    /// Root directory for the file backend.
    pub dir: PathBuf,
}

/// Menu rendering configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    /// Seconds a rendered menu stays cached.
    pub cache_duration: u64,
    /// Cache key prefixes keyed by `"<CATEGORY>_CACHE_PREFIX"`.
    pub cache_prefixes: HashMap<String, String>,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            cache_duration: 300,
            cache_prefixes: HashMap::new(),
        }
    }
}

impl MenuConfig {
    /// Cache expiry as a [`Duration`].
    #[must_use]
    pub fn cache_duration(&self) -> Duration {
        Duration::from_secs(self.cache_duration)
    }
}

/// Error notification rate limiting.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ErrorsConfig {
    /// Seconds during which a repeated trace is suppressed. Zero disables.
    pub rate_limit: u64,
    /// Maximum traces tracked in memory when no cache is available.
    pub key_limit: usize,
    /// Prefix for rate-limit keys in the cache.
    pub cache_prefix: String,
}

impl Default for ErrorsConfig {
    fn default() -> Self {
        Self {
            rate_limit: 10,
            key_limit: 100,
            cache_prefix: "ERROR_RATE".to_owned(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`store.path`").
        field: String,
        /// Error message (e.g., "${`MENU_FILE`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `elmenu.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(path) = &settings.store_path {
            self.store_resolved.path.clone_from(path);
        }
        if let Some(backend) = settings.cache_backend {
            self.cache_resolved.backend = backend;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            site: SiteConfig::default(),
            store: StoreConfigRaw::default(),
            cache: CacheConfigRaw::default(),
            menu: MenuConfig::default(),
            errors: ErrorsConfig::default(),
            store_resolved: StoreConfig {
                path: base.join("menu.yaml"),
            },
            cache_resolved: CacheConfig {
                backend: CacheBackend::File,
                dir: base.join(".elmenu").join("cache"),
            },
            config_path: None,
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_site()?;
        self.validate_menu()?;
        self.validate_errors()?;
        Ok(())
    }

    fn validate_site(&self) -> Result<(), ConfigError> {
        if self.site.languages.is_empty() {
            return Err(ConfigError::Validation(
                "site.languages must list at least one language".to_owned(),
            ));
        }
        for lang in &self.site.languages {
            require_non_empty(lang, "site.languages")?;
        }
        if !self.site.languages.contains(&self.site.default_language) {
            return Err(ConfigError::Validation(format!(
                "site.default_language '{}' is not listed in site.languages",
                self.site.default_language
            )));
        }
        Ok(())
    }

    fn validate_menu(&self) -> Result<(), ConfigError> {
        if self.menu.cache_duration == 0 {
            return Err(ConfigError::Validation(
                "menu.cache_duration must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_errors(&self) -> Result<(), ConfigError> {
        if self.errors.key_limit == 0 {
            return Err(ConfigError::Validation(
                "errors.key_limit must be greater than 0".to_owned(),
            ));
        }
        require_non_empty(&self.errors.cache_prefix, "errors.cache_prefix")
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref path) = self.store.path {
            self.store.path = Some(expand::expand_env(path, "store.path")?);
        }
        if let Some(ref dir) = self.cache.dir {
            self.cache.dir = Some(expand::expand_env(dir, "cache.dir")?);
        }
        Ok(())
    }

    /// Resolve relative paths against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.store_resolved = StoreConfig {
            path: resolve(self.store.path.as_deref(), "menu.yaml"),
        };
        self.cache_resolved = CacheConfig {
            backend: self.cache.backend.unwrap_or_default(),
            dir: resolve(self.cache.dir.as_deref(), ".elmenu/cache"),
        };
    }
}
