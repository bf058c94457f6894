//! Command bodies and the metadata attached to them before compilation
//!
//! A [`FunctionSpec`] pairs a callable with its [`Signature`], docstring and
//! the author's [`CommandMetadata`]: aliases, environment bindings, renames
//! and help sections. Each decorator checks its input against the signature
//! immediately and fails with a [`CompilationError`].

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::context::{Call, Context};
use crate::error::CompilationError;
use crate::signature::{ParamKind, Signature};

static ALIAS_FORMAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-[a-zA-Z0-9]$").unwrap());

/// A command body
///
/// Receives the invocation context and the validated call; returns any
/// JSON-serializable result.
pub type Handler = Arc<dyn Fn(&mut Context, &Call) -> anyhow::Result<Value> + Send + Sync>;

/// Author-attached presentation metadata, keyed by original parameter name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandMetadata {
    pub aliases: IndexMap<String, Vec<String>>,
    pub envs: IndexMap<String, String>,
    pub command_name: Option<String>,
    pub param_names: IndexMap<String, String>,
    pub sections: IndexMap<String, String>,
}

impl CommandMetadata {
    /// CLI-facing name of a parameter after renames
    pub fn param_name<'a>(&'a self, param: &'a str) -> &'a str {
        self.param_names
            .get(param)
            .map(String::as_str)
            .unwrap_or(param)
    }

    /// Original parameter name of a CLI-facing name
    pub fn original_name<'a>(&'a self, renamed: &'a str) -> &'a str {
        self.param_names
            .iter()
            .find(|(_, new)| new.as_str() == renamed)
            .map(|(old, _)| old.as_str())
            .unwrap_or(renamed)
    }
}

/// A pre-built host parameter that replaces classification for one parameter
///
/// The argument id is the parameter it stands in for. Overrides whose id does
/// not appear in the signature are appended after every signature parameter.
#[derive(Debug, Clone)]
pub struct ParamOverride {
    pub arg: clap::Arg,
    /// Treat input as secret when echoing validation errors
    pub hide_input: bool,
}

impl ParamOverride {
    pub fn new(arg: clap::Arg) -> Self {
        Self {
            arg,
            hide_input: false,
        }
    }

    pub fn hide_input(mut self, hide_input: bool) -> Self {
        self.hide_input = hide_input;
        self
    }

    pub fn name(&self) -> &str {
        self.arg.get_id().as_str()
    }

    /// Environment-sourced or masked input
    pub fn is_sensitive(&self) -> bool {
        self.hide_input || self.arg.get_env().is_some()
    }
}

/// A callable together with everything needed to compile it into a command
#[derive(Clone)]
pub struct FunctionSpec {
    name: String,
    signature: Signature,
    doc: Option<String>,
    handler: Handler,
    metadata: CommandMetadata,
    overrides: Vec<ParamOverride>,
}

impl fmt::Debug for FunctionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionSpec")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("doc", &self.doc)
            .field("metadata", &self.metadata)
            .field("overrides", &self.overrides)
            .finish_non_exhaustive()
    }
}

impl FunctionSpec {
    pub fn new<F>(name: impl Into<String>, signature: Signature, handler: F) -> Self
    where
        F: Fn(&mut Context, &Call) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            signature,
            doc: None,
            handler: Arc::new(handler),
            metadata: CommandMetadata::default(),
            overrides: Vec::new(),
        }
    }

    /// Attach a structured docstring
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Add short-flag aliases to a keyword-only parameter
    ///
    /// # Errors
    ///
    /// The parameter must be keyword-only; aliases must match `^-[a-zA-Z0-9]$`
    /// and be unique across the whole function.
    pub fn alias<I, S>(mut self, param: &str, aliases: I) -> Result<Self, CompilationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.require_keyword_only("alias", param)?;
        let aliases: Vec<String> = aliases.into_iter().map(Into::into).collect();

        let mut all: Vec<&str> = self
            .metadata
            .aliases
            .iter()
            .filter(|(p, _)| p.as_str() != param)
            .flat_map(|(_, a)| a.iter().map(String::as_str))
            .collect();
        all.extend(aliases.iter().map(String::as_str));
        let mut unique = all.clone();
        unique.sort_unstable();
        unique.dedup();
        if unique.len() < all.len() {
            return Err(CompilationError::new(format!(
                "Aliases for function '{}' must be unique.",
                self.name
            )));
        }
        if aliases.iter().any(|a| !ALIAS_FORMAT.is_match(a)) {
            return Err(CompilationError::new(format!(
                "Invalid aliases provided for function '{}'. Aliases must be of the format '{}'.",
                self.name,
                ALIAS_FORMAT.as_str()
            )));
        }

        self.metadata.aliases.insert(param.to_string(), aliases);
        Ok(self)
    }

    /// Read a keyword-only parameter from an environment variable when absent
    pub fn env(mut self, param: &str, var: impl Into<String>) -> Result<Self, CompilationError> {
        self.require_keyword_only("env", param)?;
        self.metadata.envs.insert(param.to_string(), var.into());
        Ok(self)
    }

    /// Rename the command and/or some of its parameters
    pub fn rename<I, K, V>(mut self, command: Option<&str>, params: I) -> Result<Self, CompilationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let params: Vec<(String, String)> = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let extra: Vec<&str> = params
            .iter()
            .map(|(k, _)| k.as_str())
            .filter(|k| !self.signature.contains(k))
            .collect();
        if !extra.is_empty() {
            return Err(self.extra_arguments("rename", "parameters", &extra));
        }
        if let Some(command) = command {
            self.metadata.command_name = Some(command.to_string());
        }
        self.metadata.param_names.extend(params);
        Ok(self)
    }

    /// Display a parameter under its own help heading
    pub fn section(mut self, param: &str, heading: impl Into<String>) -> Result<Self, CompilationError> {
        if !self.signature.contains(param) {
            return Err(self.extra_arguments("section", "parameters", &[param]));
        }
        self.metadata.sections.insert(param.to_string(), heading.into());
        Ok(self)
    }

    /// Replace (or add) a parameter with a pre-built host argument
    pub fn with_override(mut self, param: ParamOverride) -> Self {
        self.overrides.retain(|o| o.name() != param.name());
        self.overrides.push(param);
        self
    }

    fn require_keyword_only(&self, decorator: &str, param: &str) -> Result<(), CompilationError> {
        match self.signature.get(param) {
            Some(p) if p.kind == ParamKind::KeywordOnly => Ok(()),
            _ => Err(self.extra_arguments(decorator, "keyword-only parameters", &[param])),
        }
    }

    fn extra_arguments(&self, decorator: &str, what: &str, extra: &[&str]) -> CompilationError {
        let extra: Vec<String> = extra.iter().map(|e| format!("'{e}'")).collect();
        CompilationError::new(format!(
            "Arguments provided to '{decorator}' must also be {what} of function '{}'. \
             Received extra arguments: {}.",
            self.name,
            extra.join(", ")
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn docstring(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }

    pub fn overrides(&self) -> &[ParamOverride] {
        &self.overrides
    }

    pub fn override_for(&self, param: &str) -> Option<&ParamOverride> {
        self.overrides.iter().find(|o| o.name() == param)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Param;
    use crate::typing::TypeHint;

    fn spec() -> FunctionSpec {
        let signature = Signature::new([
            Param::positional("path", TypeHint::Str),
            Param::keyword("verbose", TypeHint::Bool),
            Param::keyword("token", TypeHint::Str),
        ])
        .unwrap();
        FunctionSpec::new("fetch", signature, |_ctx, _call| Ok(Value::Null))
    }

    #[test]
    fn test_alias_requires_keyword_only() {
        let err = spec().alias("path", ["-p"]).unwrap_err();
        assert_eq!(
            err.message(),
            "Arguments provided to 'alias' must also be keyword-only parameters of function \
             'fetch'. Received extra arguments: 'path'."
        );
        assert!(spec().alias("missing", ["-m"]).is_err());
    }

    #[test]
    fn test_alias_format_and_uniqueness() {
        assert!(spec().alias("verbose", ["--v"]).is_err());
        assert!(spec().alias("verbose", ["-v", "-v"]).is_err());
        let err = spec()
            .alias("verbose", ["-v"])
            .unwrap()
            .alias("token", ["-v"])
            .unwrap_err();
        assert_eq!(err.message(), "Aliases for function 'fetch' must be unique.");

        let ok = spec().alias("verbose", ["-v", "-V"]).unwrap();
        assert_eq!(ok.metadata().aliases["verbose"], vec!["-v", "-V"]);
    }

    #[test]
    fn test_realiasing_replaces_previous_aliases() {
        let spec = spec()
            .alias("verbose", ["-v"])
            .unwrap()
            .alias("verbose", ["-v", "-x"])
            .unwrap();
        assert_eq!(spec.metadata().aliases["verbose"], vec!["-v", "-x"]);
    }

    #[test]
    fn test_env_and_section() {
        let spec = spec()
            .env("token", "API_TOKEN")
            .unwrap()
            .section("token", "Auth")
            .unwrap();
        assert_eq!(spec.metadata().envs["token"], "API_TOKEN");
        assert_eq!(spec.metadata().sections["token"], "Auth");
        assert!(self::spec().env("path", "X").is_err());
        assert!(self::spec().section("nope", "X").is_err());
    }

    #[test]
    fn test_rename() {
        let spec = spec()
            .rename(Some("get"), [("path", "source"), ("verbose", "loud")])
            .unwrap();
        let meta = spec.metadata();
        assert_eq!(meta.command_name.as_deref(), Some("get"));
        assert_eq!(meta.param_name("path"), "source");
        assert_eq!(meta.param_name("token"), "token");
        assert_eq!(meta.original_name("loud"), "verbose");
        assert_eq!(meta.original_name("token"), "token");

        let err = self::spec().rename(None, [("nope", "x")]).unwrap_err();
        assert!(err.message().contains("Received extra arguments: 'nope'"));
    }

    #[test]
    fn test_overrides_replace_by_name() {
        let spec = spec()
            .with_override(ParamOverride::new(clap::Arg::new("token").long("tok")))
            .with_override(ParamOverride::new(clap::Arg::new("token").long("key")).hide_input(true));
        assert_eq!(spec.overrides().len(), 1);
        let token = spec.override_for("token").unwrap();
        assert!(token.is_sensitive());
        assert_eq!(token.arg.get_long(), Some("key"));
    }
}
