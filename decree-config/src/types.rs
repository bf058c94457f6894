//! Configuration value objects
//!
//! [`Config`] is immutable once built. It remembers which fields were set
//! explicitly so that a child configuration only overrides what its author
//! actually wrote, which is how configuration flows down a group hierarchy.

use serde::{Deserialize, Serialize};

/// Options forwarded to the structural validator of every compiled command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    /// Disable lax coercion (`"3"` is no longer accepted as an integer)
    pub strict: bool,
    /// Drop `[input_value=...]` from every validation message
    pub hide_input_in_errors: bool,
}

/// When help and error output may use color
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// Presentation options for help and error output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Styling {
    pub color: ColorMode,
    /// Upper bound on the width help text is wrapped to
    pub max_width: Option<usize>,
}

/// The explicitly-set subset of a [`Config`]
///
/// Every field is optional; `None` means "not set here, inherit". This is both
/// the builder input for [`Config::create`] and the shape configuration files
/// deserialize into.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negate_flags: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_help_defaults: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_help_datetime_formats: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_help_envvars: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styling: Option<Styling>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn negate_flags(mut self, value: bool) -> Self {
        self.negate_flags = Some(value);
        self
    }

    pub fn show_help_defaults(mut self, value: bool) -> Self {
        self.show_help_defaults = Some(value);
        self
    }

    pub fn show_help_datetime_formats(mut self, value: bool) -> Self {
        self.show_help_datetime_formats = Some(value);
        self
    }

    pub fn show_help_envvars(mut self, value: bool) -> Self {
        self.show_help_envvars = Some(value);
        self
    }

    pub fn validation(mut self, value: ValidationSettings) -> Self {
        self.validation = Some(value);
        self
    }

    pub fn styling(mut self, value: Styling) -> Self {
        self.styling = Some(value);
        self
    }

    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Layer `other` on top of `self`: fields set in `other` win
    pub fn overlay(&self, other: &ConfigOverrides) -> ConfigOverrides {
        ConfigOverrides {
            negate_flags: other.negate_flags.or(self.negate_flags),
            show_help_defaults: other.show_help_defaults.or(self.show_help_defaults),
            show_help_datetime_formats: other
                .show_help_datetime_formats
                .or(self.show_help_datetime_formats),
            show_help_envvars: other.show_help_envvars.or(self.show_help_envvars),
            validation: other
                .validation
                .clone()
                .or_else(|| self.validation.clone()),
            styling: other.styling.clone().or_else(|| self.styling.clone()),
        }
    }
}

/// Fully resolved configuration values, used for logging and comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveConfig {
    pub negate_flags: bool,
    pub show_help_defaults: bool,
    pub show_help_datetime_formats: bool,
    pub show_help_envvars: bool,
    pub validation: ValidationSettings,
    pub styling: Styling,
}

/// Declarative toggles controlling how parameters are rendered
///
/// | field | default |
/// |---|---|
/// | `negate_flags` | `true` |
/// | `show_help_defaults` | `true` |
/// | `show_help_datetime_formats` | `false` |
/// | `show_help_envvars` | `true` |
/// | `validation` | lax coercion, inputs echoed |
/// | `styling` | auto color, no width limit |
///
/// Two configs compare equal when their effective values are equal,
/// regardless of which fields were set explicitly.
#[derive(Debug, Clone, Default)]
pub struct Config {
    explicit: ConfigOverrides,
}

impl Config {
    /// Build a config from an optional base plus explicitly-set overrides
    ///
    /// Only the fields set on `base` are carried over, so the result's
    /// explicit set is the union of both.
    pub fn create(base: Option<&Config>, overrides: ConfigOverrides) -> Config {
        let explicit = match base {
            Some(base) => base.explicit.overlay(&overrides),
            None => overrides,
        };
        Config { explicit }
    }

    /// Layer `other`'s explicitly-set fields on top of `self`
    pub fn merge(&self, other: &Config) -> Config {
        Config::create(Some(self), other.explicit.clone())
    }

    /// The fields that were explicitly set on this config
    pub fn explicit(&self) -> &ConfigOverrides {
        &self.explicit
    }

    pub fn negate_flags(&self) -> bool {
        self.explicit.negate_flags.unwrap_or(true)
    }

    pub fn show_help_defaults(&self) -> bool {
        self.explicit.show_help_defaults.unwrap_or(true)
    }

    pub fn show_help_datetime_formats(&self) -> bool {
        self.explicit.show_help_datetime_formats.unwrap_or(false)
    }

    pub fn show_help_envvars(&self) -> bool {
        self.explicit.show_help_envvars.unwrap_or(true)
    }

    pub fn validation(&self) -> ValidationSettings {
        self.explicit.validation.clone().unwrap_or_default()
    }

    pub fn styling(&self) -> Styling {
        self.explicit.styling.clone().unwrap_or_default()
    }

    pub fn effective(&self) -> EffectiveConfig {
        EffectiveConfig {
            negate_flags: self.negate_flags(),
            show_help_defaults: self.show_help_defaults(),
            show_help_datetime_formats: self.show_help_datetime_formats(),
            show_help_envvars: self.show_help_envvars(),
            validation: self.validation(),
            styling: self.styling(),
        }
    }
}

impl PartialEq for Config {
    fn eq(&self, other: &Self) -> bool {
        self.effective() == other.effective()
    }
}

impl Eq for Config {}

impl From<ConfigOverrides> for Config {
    fn from(overrides: ConfigOverrides) -> Self {
        Config::create(None, overrides)
    }
}

/// Shorthand for `Config::create(None, overrides)`
pub fn config(overrides: ConfigOverrides) -> Config {
    Config::create(None, overrides)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.negate_flags());
        assert!(config.show_help_defaults());
        assert!(!config.show_help_datetime_formats());
        assert!(config.show_help_envvars());
        assert_eq!(config.validation(), ValidationSettings::default());
        assert!(config.explicit().is_empty());
    }

    #[test]
    fn test_create_without_base_records_explicit_fields() {
        let config = config(ConfigOverrides::new().negate_flags(false));
        assert!(!config.negate_flags());
        assert_eq!(config.explicit().negate_flags, Some(false));
        assert_eq!(config.explicit().show_help_defaults, None);
    }

    #[test]
    fn test_create_with_base_only_overrides_set_fields() {
        let base = config(
            ConfigOverrides::new()
                .negate_flags(false)
                .show_help_envvars(false),
        );
        let child = Config::create(Some(&base), ConfigOverrides::new().show_help_envvars(true));

        assert!(!child.negate_flags());
        assert!(child.show_help_envvars());
        assert_eq!(child.explicit().negate_flags, Some(false));
    }

    #[test]
    fn test_default_values_on_base_are_not_carried_as_explicit() {
        let base = Config::default();
        let child = Config::create(Some(&base), ConfigOverrides::new());
        assert!(child.explicit().is_empty());
    }

    #[test]
    fn test_merge_prefers_other() {
        let a = config(ConfigOverrides::new().show_help_defaults(false));
        let b = config(ConfigOverrides::new().show_help_defaults(true).negate_flags(false));
        let merged = a.merge(&b);
        assert!(merged.show_help_defaults());
        assert!(!merged.negate_flags());

        let reversed = b.merge(&a);
        assert!(!reversed.show_help_defaults());
        assert!(!reversed.negate_flags());
    }

    #[test]
    fn test_equality_compares_effective_values() {
        let implicit = Config::default();
        let explicit = config(ConfigOverrides::new().negate_flags(true));
        assert_eq!(implicit, explicit);
        assert_ne!(implicit, config(ConfigOverrides::new().negate_flags(false)));
    }

    #[test]
    fn test_overrides_reject_unknown_fields() {
        let parsed: Result<ConfigOverrides, _> =
            serde_json::from_value(serde_json::json!({"negate_flag": true}));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_partial_nested_settings_use_defaults() {
        let parsed: ConfigOverrides = serde_json::from_value(serde_json::json!({
            "validation": {"strict": true},
            "styling": {"color": "never"}
        }))
        .unwrap();
        let config = config(parsed);
        assert!(config.validation().strict);
        assert!(!config.validation().hide_input_in_errors);
        assert_eq!(config.styling().color, ColorMode::Never);
        assert_eq!(config.styling().max_width, None);
    }
}
