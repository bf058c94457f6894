//! Compiling one function into a runnable command
//!
//! [`CommandBuilder::build`] runs classification and type resolution once,
//! merges in any parameter overrides, renders the clap command and wraps the
//! body in a validation [`Bridge`]. The result is an immutable, cheaply
//! cloneable [`Command`].

use clap::ArgMatches;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::ffi::OsString;
use std::sync::Arc;
use tracing::debug;

use decree_common::Pretty;
use decree_config::Config;

use crate::bridge::Bridge;
use crate::classify::{classify, ParameterSpec};
use crate::context::{Call, Context};
use crate::docstring::Docstring;
use crate::error::{CompilationError, DecreeError, Result};
use crate::host::{self, HostParam};
use crate::inflect::sanitize;
use crate::metadata::FunctionSpec;
use crate::signature::ParamKind;
use crate::styling;
use crate::typing::resolve;

/// Presentation settings for a command or group
///
/// Every field is optional so settings can be layered with [`merge`](Self::merge).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommandSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epilog: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

impl CommandSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn epilog(mut self, epilog: impl Into<String>) -> Self {
        self.epilog = Some(epilog.into());
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = Some(hidden);
        self
    }

    /// Fields set in `other` win
    pub fn merge(&self, other: &CommandSettings) -> CommandSettings {
        CommandSettings {
            name: other.name.clone().or_else(|| self.name.clone()),
            help: other.help.clone().or_else(|| self.help.clone()),
            epilog: other.epilog.clone().or_else(|| self.epilog.clone()),
            hidden: other.hidden.or(self.hidden),
        }
    }
}

#[derive(Debug)]
struct CommandInner {
    name: String,
    help: Option<String>,
    epilog: Option<String>,
    hidden: bool,
    function: FunctionSpec,
    config: Config,
    params: Vec<HostParam>,
    template: clap::Command,
    bridge: Bridge,
}

/// A compiled, runnable command
#[derive(Debug, Clone)]
pub struct Command {
    inner: Arc<CommandInner>,
}

/// Configures and compiles a [`Command`]
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    function: FunctionSpec,
    config: Config,
    settings: CommandSettings,
}

impl CommandBuilder {
    pub fn new(function: FunctionSpec) -> Self {
        Self {
            function,
            config: Config::default(),
            settings: CommandSettings::default(),
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn settings(mut self, settings: CommandSettings) -> Self {
        self.settings = self.settings.merge(&settings);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.settings.name = Some(name.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.settings.help = Some(help.into());
        self
    }

    pub fn epilog(mut self, epilog: impl Into<String>) -> Self {
        self.settings.epilog = Some(epilog.into());
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.settings.hidden = Some(hidden);
        self
    }

    /// Compile the function
    ///
    /// # Errors
    ///
    /// Classification errors (counting on a positional parameter) and
    /// rendering errors (duplicate flags, misplaced variadic argument).
    pub fn build(self) -> std::result::Result<Command, CompilationError> {
        compile(self.function, &self.config, self.settings)
    }
}

/// Compile a function into a command
///
/// The command name is the function's rename if any, then `settings.name`,
/// then the sanitized function name. Help text is `settings.help`, then the
/// docstring description.
///
/// # Errors
///
/// See [`CommandBuilder::build`].
pub fn compile(
    function: FunctionSpec,
    config: &Config,
    settings: CommandSettings,
) -> std::result::Result<Command, CompilationError> {
    let classification = classify(&function, config)?;
    let signature = function.signature();
    let skip = usize::from(classification.pass_context);

    let mut params = Vec::new();
    for param in signature.iter().skip(skip) {
        if let Some(over) = function.override_for(&param.name) {
            params.push(HostParam::Override(over.clone()));
        } else if param.kind == ParamKind::VarKeyword {
            continue;
        } else if let Some(spec) = classification.get(&param.name) {
            let mut spec = spec.clone();
            spec.host_type = resolve(&spec.hint, config);
            params.push(HostParam::Classified(spec));
        }
    }
    params.extend(
        function
            .overrides()
            .iter()
            .filter(|over| !signature.contains(over.name()))
            .cloned()
            .map(HostParam::Override),
    );

    let name = function
        .metadata()
        .command_name
        .clone()
        .or_else(|| settings.name.clone())
        .unwrap_or_else(|| sanitize(function.name()).replace('_', "-"));
    let help = settings
        .help
        .clone()
        .or_else(|| function.docstring().map(Docstring::parse).and_then(|d| d.description()));

    let template = host::command(&name, &params)?;

    let labels: IndexMap<String, String> = params
        .iter()
        .map(|p| (p.param().to_string(), p.label()))
        .collect();
    let sensitive: HashSet<String> = params
        .iter()
        .filter(|p| p.is_sensitive())
        .map(|p| p.param().to_string())
        .collect();
    let bridge = Bridge::new(name.clone(), &function, config.validation(), labels, sensitive);

    debug!(
        command = %name,
        arguments = params.iter().filter(|p| p.is_argument()).count(),
        options = params.iter().filter(|p| !p.is_argument()).count(),
        config = %Pretty(&config.effective()),
        "compiled command"
    );

    Ok(Command {
        inner: Arc::new(CommandInner {
            name,
            help,
            epilog: settings.epilog,
            hidden: settings.hidden.unwrap_or(false),
            function,
            config: config.clone(),
            params,
            template,
            bridge,
        }),
    })
}

impl Command {
    pub fn builder(function: FunctionSpec) -> CommandBuilder {
        CommandBuilder::new(function)
    }

    /// Compile with the default configuration
    pub fn new(function: FunctionSpec) -> std::result::Result<Self, CompilationError> {
        CommandBuilder::new(function).build()
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn help(&self) -> Option<&str> {
        self.inner.help.as_deref()
    }

    pub fn epilog(&self) -> Option<&str> {
        self.inner.epilog.as_deref()
    }

    pub fn is_hidden(&self) -> bool {
        self.inner.hidden
    }

    pub fn function(&self) -> &FunctionSpec {
        &self.inner.function
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Parameters in signature order, overrides included
    pub fn params(&self) -> &[HostParam] {
        &self.inner.params
    }

    /// Classified parameters in signature order
    pub fn parameters(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.inner.params.iter().filter_map(HostParam::spec)
    }

    pub fn arguments(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters().filter(|p| p.is_argument())
    }

    pub fn options(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters().filter(|p| p.is_option())
    }

    /// Parameters that receive the invocation context are not shown
    pub fn passes_context(&self) -> bool {
        self.inner.function.signature().passes_context()
    }

    /// An independent command with the same parameters and validation
    pub fn renamed(&self, name: impl Into<String>) -> Command {
        let name = name.into();
        let inner = &self.inner;
        Command {
            inner: Arc::new(CommandInner {
                name: name.clone(),
                help: inner.help.clone(),
                epilog: inner.epilog.clone(),
                hidden: inner.hidden,
                function: inner.function.clone(),
                config: inner.config.clone(),
                params: inner.params.clone(),
                template: inner.template.clone().name(name.clone()),
                bridge: inner.bridge.renamed(name),
            }),
        }
    }

    /// The clap command, styled for the current run
    pub fn to_clap(&self) -> clap::Command {
        let mut cmd = self.inner.template.clone();
        if let Some(help) = &self.inner.help {
            cmd = cmd.about(first_paragraph(help)).long_about(help.clone());
        }
        if let Some(epilog) = &self.inner.epilog {
            cmd = cmd.after_help(epilog.clone());
        }
        cmd = cmd.hide(self.inner.hidden);
        styling::apply(cmd, &styling::effective(self.inner.config.styling()))
    }

    /// Fill in defaults for parameters missing from `params`
    pub fn with_defaults(&self, mut params: IndexMap<String, Value>) -> IndexMap<String, Value> {
        for spec in self.parameters() {
            if params.contains_key(&spec.name) {
                continue;
            }
            if let Some(default) = &spec.default {
                params.insert(spec.name.clone(), default.clone());
            } else if spec.count {
                params.insert(spec.name.clone(), Value::from(0));
            } else if spec.variadic || spec.multiple {
                params.insert(spec.name.clone(), Value::Array(Vec::new()));
            }
        }
        params
    }

    /// Validate command-line-named values without running the body
    pub fn validate(&self, params: IndexMap<String, Value>) -> Result<Call> {
        self.inner.bridge.validate(params)
    }

    /// Validate and run the body with command-line-named values
    pub fn call(&self, ctx: &mut Context, params: IndexMap<String, Value>) -> Result<Value> {
        self.inner.bridge.call(ctx, params)
    }

    /// Parse `args` (without the program name) and run
    ///
    /// # Errors
    ///
    /// [`DecreeError::Parse`] for anything clap rejects, including `--help`,
    /// then whatever the bridge or the body report.
    pub fn run<I, T>(&self, args: I) -> Result<Value>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let mut cmd = self.to_clap();
        let argv = std::iter::once(OsString::from(self.name())).chain(args.into_iter().map(Into::into));
        let matches = cmd.try_get_matches_from_mut(argv)?;
        self.execute(&mut Context::new(self.name()), &matches, &mut cmd)
    }

    /// Run against matches clap already produced for this command
    pub(crate) fn execute(&self, ctx: &mut Context, matches: &ArgMatches, cmd: &mut clap::Command) -> Result<Value> {
        let params = host::extract(&self.inner.params, matches, cmd)?;
        ctx.set_params(params.clone());
        self.call(ctx, params).map_err(|err| match err {
            DecreeError::Usage { .. } => err.with_usage(cmd.render_usage().to_string()),
            other => other,
        })
    }
}

pub(crate) fn first_paragraph(help: &str) -> String {
    help.split("\n\n").next().unwrap_or(help).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::{Param, Signature};
    use crate::typing::TypeHint;
    use serde_json::json;

    fn echo(name: &str, params: Vec<Param>) -> FunctionSpec {
        FunctionSpec::new(name, Signature::new(params).unwrap(), |_, call| Ok(call.to_value()))
    }

    #[test]
    fn test_name_resolution() {
        let f = echo("make_thing", vec![]);
        assert_eq!(Command::new(f.clone()).unwrap().name(), "make-thing");
        assert_eq!(
            Command::builder(f.clone()).name("mk").build().unwrap().name(),
            "mk"
        );
        let renamed = f.rename(Some("build"), Vec::<(String, String)>::new()).unwrap();
        assert_eq!(
            Command::builder(renamed).name("mk").build().unwrap().name(),
            "build"
        );
    }

    #[test]
    fn test_help_from_settings_or_docstring() {
        let f = echo("f", vec![]).doc("Short.\n\nLonger text.");
        let cmd = Command::new(f.clone()).unwrap();
        assert!(cmd.help().unwrap().starts_with("Short."));
        assert!(cmd.help().unwrap().ends_with("Longer text."));
        assert_eq!(
            Command::builder(f).help("Explicit.").build().unwrap().help(),
            Some("Explicit.")
        );
    }

    #[test]
    fn test_overrides_keep_their_position() {
        let f = echo(
            "f",
            vec![
                Param::context(),
                Param::positional("a", TypeHint::Int),
                Param::positional("b", TypeHint::Int),
                Param::keyword("c", TypeHint::Int),
            ],
        )
        .with_override(crate::metadata::ParamOverride::new(clap::Arg::new("b")))
        .with_override(crate::metadata::ParamOverride::new(
            clap::Arg::new("extra").long("extra"),
        ));
        let cmd = Command::new(f).unwrap();
        let names: Vec<&str> = cmd.params().iter().map(HostParam::name).collect();
        assert_eq!(names, vec!["a", "b", "c", "extra"]);
        assert_eq!(cmd.arguments().count(), 1);
        assert!(cmd.passes_context());
    }

    #[test]
    fn test_run_and_usage_errors() {
        let f = echo(
            "f",
            vec![
                Param::positional("n", TypeHint::Int),
                Param::keyword("limit", TypeHint::positive_int()).with_default(1),
            ],
        );
        let cmd = Command::new(f).unwrap();
        assert_eq!(cmd.run(["3"]).unwrap(), json!({"n": 3, "limit": 1}));

        let err = cmd.run(["3", "--limit", "0"]).unwrap_err();
        assert!(matches!(err, DecreeError::Parse(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_renamed_copy_is_independent() {
        let cmd = Command::new(echo("f", vec![Param::positional("n", TypeHint::Int)])).unwrap();
        let copy = cmd.renamed("g");
        assert_eq!(cmd.name(), "f");
        assert_eq!(copy.name(), "g");
        assert_eq!(copy.to_clap().get_name(), "g");
        assert_eq!(copy.run(["1"]).unwrap(), json!({"n": 1}));
    }

    #[test]
    fn test_with_defaults() {
        let cmd = Command::new(echo(
            "f",
            vec![
                Param::keyword("tags", TypeHint::list(TypeHint::Str)).with_default(json!(["x"])),
                Param::keyword("v", TypeHint::counter()),
            ],
        ))
        .unwrap();
        let filled = cmd.with_defaults(IndexMap::new());
        assert_eq!(filled["tags"], json!(["x"]));
        assert_eq!(filled["v"], json!(0));
    }
}
