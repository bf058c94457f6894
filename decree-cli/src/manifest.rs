//! Command manifests
//!
//! A manifest describes command signatures as data. It is either a single
//! `command`, or a group with `commands`, nested `groups` and an optional
//! `main`. Every command body echoes its validated call.
//!
//! ```yaml
//! name: tools
//! doc: Little tools.
//! commands:
//!   - name: add
//!     params:
//!       - { name: a, kind: positional, type: int }
//!       - { name: b, kind: positional, type: int }
//!       - { name: verbose, type: bool, default: false }
//! ```

use figment::providers::{Format, Json, Toml, Yaml};
use figment::Figment;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

use decree::{parse_hint, Command, FunctionSpec, Group, Param, Signature, Target};
use decree_config::{Config, ConfigFormat, ConfigOverrides};

use crate::error::{ManifestError, ManifestResult};

/// Class name of the root group when the manifest does not name one
pub const ROOT_CLASS: &str = "Manifest";

/// Top level of a manifest file, also used for nested groups
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub epilog: Option<String>,
    #[serde(default)]
    pub hidden: Option<bool>,
    #[serde(default)]
    pub config: ConfigOverrides,
    #[serde(default)]
    pub invoke_without_command: Option<bool>,
    #[serde(default)]
    pub main: Option<CommandManifest>,
    /// A single command instead of a group
    #[serde(default)]
    pub command: Option<CommandManifest>,
    #[serde(default)]
    pub commands: Vec<CommandManifest>,
    #[serde(default)]
    pub groups: Vec<Manifest>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandManifest {
    /// Function name
    pub name: String,
    #[serde(default)]
    pub doc: Option<String>,
    /// Command-line name, replacing the sanitized function name
    #[serde(default)]
    pub rename: Option<String>,
    #[serde(default)]
    pub help: Option<String>,
    #[serde(default)]
    pub epilog: Option<String>,
    #[serde(default)]
    pub hidden: Option<bool>,
    #[serde(default)]
    pub params: Vec<ParamManifest>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamManifest {
    pub name: String,
    #[serde(default)]
    pub kind: ParamKindManifest,
    /// Type annotation, e.g. `int`, `list[str]`, `Optional[PositiveInt]`
    #[serde(rename = "type", default = "default_type")]
    pub hint: String,
    /// Present even when null
    #[serde(default, deserialize_with = "present")]
    pub default: Option<Value>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub env: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub rename: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKindManifest {
    Positional,
    PositionalOnly,
    VarPositional,
    #[default]
    Keyword,
    VarKeyword,
    Context,
}

fn default_type() -> String {
    "str".to_string()
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// A compiled manifest
#[derive(Debug, Clone)]
pub enum Compiled {
    Command(Command),
    Group(Group),
}

impl From<Compiled> for Target {
    fn from(compiled: Compiled) -> Self {
        match compiled {
            Compiled::Command(command) => Target::from(command),
            Compiled::Group(group) => Target::from(group),
        }
    }
}

impl Manifest {
    /// Load a manifest, picking the format from the file extension
    pub fn load(path: &Path) -> ManifestResult<Manifest> {
        if !path.is_file() {
            return Err(ManifestError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let format = ConfigFormat::from_path(path).ok_or_else(|| ManifestError::UnsupportedFormat {
            extension: path
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned())
                .unwrap_or_default(),
        })?;
        let figment = match format {
            ConfigFormat::Yaml => Figment::from(Yaml::file(path)),
            ConfigFormat::Json => Figment::from(Json::file(path)),
            ConfigFormat::Toml => Figment::from(Toml::file(path)),
        };
        let manifest = figment.extract().map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;
        debug!(path = %path.display(), "loaded manifest");
        Ok(manifest)
    }

    pub fn from_yaml(text: &str) -> ManifestResult<Manifest> {
        Figment::from(Yaml::string(text))
            .extract()
            .map_err(|source| ManifestError::Parse {
                path: "<string>".into(),
                source: Box::new(source),
            })
    }

    /// Compile on top of `base`; the manifest's own `config` wins
    pub fn compile(&self, base: &Config) -> ManifestResult<Compiled> {
        let config = Config::create(Some(base), self.config.clone());
        if let Some(command) = &self.command {
            return Ok(Compiled::Command(command.compile(&config)?));
        }
        if self.commands.is_empty() && self.groups.is_empty() && self.main.is_none() {
            return Err(ManifestError::Empty);
        }
        Ok(Compiled::Group(self.compile_group(base)?))
    }

    fn compile_group(&self, base: &Config) -> ManifestResult<Group> {
        let config = Config::create(Some(base), self.config.clone());
        let class_name = self.name.clone().unwrap_or_else(|| ROOT_CLASS.to_string());
        let mut builder = Group::builder(class_name).config(config.clone());
        if let Some(name) = &self.name {
            builder = builder.name(name.clone());
        }
        if let Some(doc) = &self.doc {
            builder = builder.doc(doc.clone());
        }
        if let Some(epilog) = &self.epilog {
            builder = builder.epilog(epilog.clone());
        }
        if let Some(hidden) = self.hidden {
            builder = builder.hidden(hidden);
        }
        if let Some(invoke) = self.invoke_without_command {
            builder = builder.invoke_without_command(invoke);
        }
        if let Some(main) = &self.main {
            builder = builder.main(main.function()?);
        }
        for command in &self.commands {
            builder = builder.command(command.name.clone(), command.compile(&config)?);
        }
        let group = builder.build()?;

        let subgroups = self
            .groups
            .iter()
            .map(|sub| sub.compile_group(base))
            .collect::<ManifestResult<Vec<_>>>()?;
        group.register(&subgroups)?;
        Ok(group)
    }
}

impl CommandManifest {
    /// The echoing function this entry describes
    pub fn function(&self) -> ManifestResult<FunctionSpec> {
        let params = self
            .params
            .iter()
            .map(|param| param.param(&self.name))
            .collect::<ManifestResult<Vec<_>>>()?;
        let mut function = FunctionSpec::new(self.name.clone(), Signature::new(params)?, |_, call| {
            Ok(call.to_value())
        });
        if let Some(doc) = &self.doc {
            function = function.doc(doc.clone());
        }
        for param in &self.params {
            if !param.aliases.is_empty() {
                function = function.alias(&param.name, param.aliases.clone())?;
            }
            if let Some(env) = &param.env {
                function = function.env(&param.name, env.clone())?;
            }
            if let Some(section) = &param.section {
                function = function.section(&param.name, section.clone())?;
            }
        }
        let renames: Vec<(String, String)> = self
            .params
            .iter()
            .filter_map(|p| p.rename.clone().map(|new| (p.name.clone(), new)))
            .collect();
        if self.rename.is_some() || !renames.is_empty() {
            function = function.rename(self.rename.as_deref(), renames)?;
        }
        Ok(function)
    }

    pub fn compile(&self, config: &Config) -> ManifestResult<Command> {
        let mut builder = Command::builder(self.function()?).config(config.clone());
        if let Some(help) = &self.help {
            builder = builder.help(help.clone());
        }
        if let Some(epilog) = &self.epilog {
            builder = builder.epilog(epilog.clone());
        }
        if let Some(hidden) = self.hidden {
            builder = builder.hidden(hidden);
        }
        Ok(builder.build()?)
    }
}

impl ParamManifest {
    fn param(&self, command: &str) -> ManifestResult<Param> {
        if self.kind == ParamKindManifest::Context {
            return Ok(Param::context());
        }
        let hint = parse_hint(&self.hint).map_err(|source| ManifestError::Hint {
            command: command.to_string(),
            param: self.name.clone(),
            source,
        })?;
        let param = match self.kind {
            ParamKindManifest::Positional => Param::positional(self.name.clone(), hint),
            ParamKindManifest::PositionalOnly => Param::positional_only(self.name.clone(), hint),
            ParamKindManifest::VarPositional => Param::var_positional(self.name.clone(), hint),
            ParamKindManifest::VarKeyword => Param::var_keyword(self.name.clone(), hint),
            ParamKindManifest::Keyword | ParamKindManifest::Context => Param::keyword(self.name.clone(), hint),
        };
        Ok(match &self.default {
            Some(default) => param.with_default(default.clone()),
            None => param,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TOOLS: &str = r#"
name: tools
doc: Little tools.
commands:
  - name: add
    doc: Add two numbers.
    params:
      - { name: a, kind: positional, type: int }
      - { name: b, kind: positional, type: int }
      - { name: verbose, type: bool, default: false }
  - name: greet_user
    rename: greet
    params:
      - { name: who, kind: positional }
      - { name: times, type: PositiveInt, default: 1, aliases: ["-t"] }
groups:
  - name: db
    commands:
      - name: migrate
        params:
          - { name: steps, type: int, default: 1 }
"#;

    fn tools() -> Group {
        match Manifest::from_yaml(TOOLS).unwrap().compile(&Config::default()).unwrap() {
            Compiled::Group(group) => group,
            Compiled::Command(command) => panic!("expected a group, got {command:?}"),
        }
    }

    #[test]
    fn test_group_manifest() {
        let group = tools();
        assert_eq!(group.name(), "tools");
        assert_eq!(group.command_names(), vec!["add", "greet"]);
        assert_eq!(group.subgroup_names(), vec!["db"]);
        assert_eq!(
            group.run(["add", "1", "2"]).unwrap(),
            json!({"a": 1, "b": 2, "verbose": false})
        );
        assert_eq!(group.run(["greet", "bob", "-t", "3"]).unwrap(), json!({"who": "bob", "times": 3}));
        assert_eq!(group.run(["db", "migrate"]).unwrap(), json!({"steps": 1}));
    }

    #[test]
    fn test_single_command_manifest() {
        let manifest = Manifest::from_yaml(
            r#"
command:
  name: echo
  params:
    - { name: words, kind: var_positional }
    - { name: sep, type: "Optional[str]", default: null }
"#,
        )
        .unwrap();
        let Compiled::Command(command) = manifest.compile(&Config::default()).unwrap() else {
            panic!("expected a command");
        };
        assert_eq!(command.name(), "echo");
        assert_eq!(
            command.run(["a", "b"]).unwrap(),
            json!({"words": ["a", "b"], "sep": null})
        );
    }

    #[test]
    fn test_bad_type_names_the_parameter() {
        let manifest = Manifest::from_yaml(
            r#"
command:
  name: f
  params:
    - { name: x, type: "list[" }
"#,
        )
        .unwrap();
        let err = manifest.compile(&Config::default()).unwrap_err();
        assert!(err.to_string().starts_with("parameter 'x' of 'f'"), "{err}");
    }

    #[test]
    fn test_empty_manifest_is_rejected() {
        let manifest = Manifest::from_yaml("name: nothing\n").unwrap();
        assert!(matches!(
            manifest.compile(&Config::default()),
            Err(ManifestError::Empty)
        ));
    }

    #[test]
    fn test_manifest_config_applies() {
        let manifest = Manifest::from_yaml(
            r#"
config:
  negate_flags: false
command:
  name: f
  params:
    - { name: flag, type: bool, default: false }
"#,
        )
        .unwrap();
        let Compiled::Command(command) = manifest.compile(&Config::default()).unwrap() else {
            panic!("expected a command");
        };
        let option = command.options().next().unwrap();
        assert!(option.secondary_opts().is_empty());
    }
}
