//! Decree configuration management using Figment
//!
//! [`Config`] holds the declarative toggles that decide how a function
//! signature is rendered as a command line: whether boolean options get a
//! `--no-` twin, which help annotations are shown, and the options handed to
//! the structural validator.
//!
//! ```
//! use decree_config::{config, Config, ConfigOverrides};
//!
//! let base = config(ConfigOverrides::new().negate_flags(false));
//! let child = Config::create(Some(&base), ConfigOverrides::new().show_help_defaults(false));
//!
//! assert!(!child.negate_flags());
//! assert!(!child.show_help_defaults());
//! ```
//!
//! Configuration can also be loaded from `decree.{toml,yaml,yml,json}` files
//! and `DECREE_` environment variables through [`ConfigProvider`].

pub mod discovery;
pub mod error;
pub mod provider;
pub mod types;

pub use discovery::{ConfigFile, ConfigFormat, ConfigScope, FileDiscovery};
pub use error::{ConfigError, ConfigResult};
pub use provider::{load_config, ConfigProvider, ENV_PREFIX};
pub use types::{
    config, ColorMode, Config, ConfigOverrides, EffectiveConfig, Styling, ValidationSettings,
};
