//! Configuration provider using Figment
//!
//! Sources are merged in precedence order, later sources override earlier ones:
//!
//! 1. discovered files (`~/.decree/` then `./.decree/`)
//! 2. files passed explicitly with [`ConfigProvider::with_file`]
//! 3. environment variables with the `DECREE_` prefix (`__` separates nested
//!    keys, e.g. `DECREE_VALIDATION__STRICT=true`)
//!
//! Nothing is merged for defaults: a field no source mentions stays unset, so
//! the loaded [`Config`] only carries what a user actually configured.

use crate::{
    discovery::{ConfigFile, ConfigFormat, FileDiscovery},
    error::ConfigError,
    types::{Config, ConfigOverrides},
    ConfigResult,
};
use decree_common::Pretty;
use figment::{
    providers::{Env, Format, Json, Toml, Yaml},
    Figment,
};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Default prefix for configuration environment variables
pub const ENV_PREFIX: &str = "DECREE_";

/// Environment keys read as configuration; other `DECREE_` variables are left
/// to the commands that bind them
const ENV_KEYS: &[&str] = &[
    "negate_flags",
    "show_help_defaults",
    "show_help_datetime_formats",
    "show_help_envvars",
    "validation__strict",
    "validation__hide_input_in_errors",
    "styling__color",
    "styling__max_width",
];

/// Loads a [`Config`] from files and the environment
pub struct ConfigProvider {
    discovery: Option<FileDiscovery>,
    files: Vec<PathBuf>,
    env_prefix: String,
}

impl ConfigProvider {
    pub fn new() -> Self {
        Self {
            discovery: Some(FileDiscovery::new()),
            files: Vec::new(),
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    /// Replace the file discovery used for global/project files
    pub fn with_discovery(mut self, discovery: FileDiscovery) -> Self {
        self.discovery = Some(discovery);
        self
    }

    /// Skip global/project file discovery entirely
    pub fn without_discovery(mut self) -> Self {
        self.discovery = None;
        self
    }

    /// Add an explicit configuration file, merged after discovered ones
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load the explicitly configured fields
    pub fn load_overrides(&self) -> ConfigResult<ConfigOverrides> {
        let figment = self.build_figment()?;
        let overrides: ConfigOverrides = figment.extract().map_err(ConfigError::parse_error)?;
        debug!("Loaded configuration overrides: {}", Pretty(&overrides));
        Ok(overrides)
    }

    /// Load a [`Config`] from all sources
    pub fn load(&self) -> ConfigResult<Config> {
        Ok(Config::from(self.load_overrides()?))
    }

    fn build_figment(&self) -> ConfigResult<Figment> {
        let mut figment = Figment::new();

        if let Some(discovery) = &self.discovery {
            for file in discovery.discover_all() {
                figment = figment.merge(Self::load_config_file(&file));
            }
        }

        for path in &self.files {
            figment = figment.merge(Self::load_explicit_file(path)?);
        }

        trace!("Merging environment variables with prefix {}", self.env_prefix);
        Ok(figment.merge(Env::prefixed(&self.env_prefix).only(ENV_KEYS).split("__")))
    }

    fn load_explicit_file(path: &Path) -> ConfigResult<Figment> {
        if !path.is_file() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat {
            format: path
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned())
                .unwrap_or_default(),
        })?;
        Ok(Self::load_config_file(&ConfigFile {
            path: path.to_path_buf(),
            format,
            scope: crate::discovery::ConfigScope::Project,
        }))
    }

    fn load_config_file(config_file: &ConfigFile) -> Figment {
        let path = &config_file.path;
        trace!("Loading config file: {}", path.display());
        match config_file.format {
            ConfigFormat::Toml => Figment::from(Toml::file(path)),
            ConfigFormat::Yaml => Figment::from(Yaml::file(path)),
            ConfigFormat::Json => Figment::from(Json::file(path)),
        }
    }
}

impl Default for ConfigProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Load configuration from the standard sources
pub fn load_config() -> ConfigResult<Config> {
    ConfigProvider::new().load()
}
