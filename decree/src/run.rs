//! Running functions, commands and groups
//!
//! [`run`] is the single entry point: it takes anything that can be turned
//! into a [`Target`], compiles it if needed and hands it the arguments.
//! [`run_standalone`] does the same but reports errors the way a
//! command-line program should and returns the process exit code.

use serde_json::Value;
use std::ffi::OsString;
use std::io::Write;
use tracing::{debug, info};

use decree_config::{Config, Styling};

use crate::command::Command;
use crate::error::{DecreeError, Result};
use crate::group::{Group, GroupSettings, Runnable};
use crate::metadata::FunctionSpec;
use crate::styling;

/// Anything [`run`] accepts
#[derive(Debug, Clone)]
pub enum Target {
    Runnable(Runnable),
    /// Named members, compiled into an anonymous group
    Map(Vec<(String, Runnable)>),
    /// Members named after themselves, compiled into an anonymous group
    List(Vec<Runnable>),
}

impl From<Runnable> for Target {
    fn from(runnable: Runnable) -> Self {
        Target::Runnable(runnable)
    }
}

impl From<FunctionSpec> for Target {
    fn from(function: FunctionSpec) -> Self {
        Target::Runnable(Runnable::Function(function))
    }
}

impl From<Command> for Target {
    fn from(command: Command) -> Self {
        Target::Runnable(Runnable::Command(command))
    }
}

impl From<Group> for Target {
    fn from(group: Group) -> Self {
        Target::Runnable(Runnable::Group(group))
    }
}

impl From<Vec<Runnable>> for Target {
    fn from(items: Vec<Runnable>) -> Self {
        Target::List(items)
    }
}

impl<K: Into<String>> From<Vec<(K, Runnable)>> for Target {
    fn from(entries: Vec<(K, Runnable)>) -> Self {
        Target::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl<K: Into<String>> From<indexmap::IndexMap<K, Runnable>> for Target {
    fn from(entries: indexmap::IndexMap<K, Runnable>) -> Self {
        Target::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// How a target is run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Configuration for functions and anonymous groups compiled by the run
    pub config: Option<Config>,
    /// Styling applied to every command for the duration of the run
    pub styling: Option<Styling>,
    /// Name of an anonymous group
    pub name: Option<String>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn styling(mut self, styling: Styling) -> Self {
        self.styling = Some(styling);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Run with default options
///
/// ```
/// use decree::{run, FunctionSpec, Param, Signature, TypeHint};
///
/// let f = FunctionSpec::new(
///     "func",
///     Signature::new(vec![Param::keyword("opt", TypeHint::Int)]).unwrap(),
///     |_, call| Ok(call.value("opt").cloned().unwrap_or_default()),
/// );
/// assert_eq!(run(f, ["--opt", "3"]).unwrap(), 3);
/// ```
pub fn run<I, T>(target: impl Into<Target>, args: I) -> Result<Value>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    run_with(target, args, &RunOptions::default())
}

/// Run `target` with `args` (without the program name)
///
/// # Errors
///
/// Compilation and registration errors of anything compiled on the way,
/// then whatever running the command reports.
pub fn run_with<I, T>(target: impl Into<Target>, args: I, options: &RunOptions) -> Result<Value>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let _restore = options.styling.clone().map(styling::override_styling);
    let config = options.config.clone().unwrap_or_default();
    let settings = options
        .name
        .clone()
        .map_or_else(GroupSettings::default, |name| GroupSettings::new().name(name));

    match target.into() {
        Target::Runnable(Runnable::Function(function)) => {
            debug!(function = %function.name(), "running function");
            Command::builder(function).config(config).build()?.run(args)
        }
        Target::Runnable(Runnable::Command(command)) => command.run(args),
        Target::Runnable(Runnable::Group(group)) => group.run(args),
        Target::Map(entries) => Group::from_dict(entries, settings, Some(config))?.run(args),
        Target::List(items) => Group::from_iter(items, settings, Some(config))?.run(args),
    }
}

/// Run like a command-line program
///
/// Help and version output go to stdout, errors to stderr. The return
/// value is the process exit code.
pub fn run_standalone<I, T>(target: impl Into<Target>, args: I, options: &RunOptions) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match run_with(target, args, options) {
        Ok(value) => {
            info!(result = %value, "command finished");
            0
        }
        Err(err) => {
            report(&err);
            err.exit_code()
        }
    }
}

/// Print an error the way the host toolkit would
pub fn report(err: &DecreeError) {
    if let DecreeError::Parse(parse) = err {
        let _ = parse.print();
        return;
    }
    let mut stderr = std::io::stderr().lock();
    let _ = stderr.write_all(render_error(err).as_bytes());
}

/// Text printed for an error
pub fn render_error(err: &DecreeError) -> String {
    match err {
        DecreeError::Parse(parse) => parse.render().to_string(),
        DecreeError::Usage {
            message,
            usage: Some(usage),
        } => format!("{}\n\nError: {message}\n", usage.trim_end()),
        DecreeError::Handler(source) => format!("Error: {source:#}\n"),
        other => format!("Error: {other}\n"),
    }
}
