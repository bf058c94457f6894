//! The host toolkit boundary
//!
//! Compiled parameters become clap arguments here, and clap's matches come
//! back out as JSON values keyed by command-line name. Nothing outside this
//! module builds `clap::Arg`s for classified parameters.

pub mod matches;
pub mod parser;
pub mod render;

use clap::{Arg, ArgAction};
use std::collections::HashSet;

use crate::classify::ParameterSpec;
use crate::error::CompilationError;
use crate::metadata::ParamOverride;

pub use matches::extract;
pub use parser::HostValueParser;

/// Id of the explicit `--help` switch every command carries
pub const HELP_ID: &str = "help";

/// One parameter of a compiled command, in the order it is shown
#[derive(Debug, Clone)]
pub enum HostParam {
    Classified(ParameterSpec),
    /// A pre-built clap argument, used verbatim
    Override(ParamOverride),
}

impl HostParam {
    /// Command-line name (clap id)
    pub fn name(&self) -> &str {
        match self {
            HostParam::Classified(spec) => &spec.name,
            HostParam::Override(over) => over.name(),
        }
    }

    /// Name in the function signature
    pub fn param(&self) -> &str {
        match self {
            HostParam::Classified(spec) => &spec.param,
            HostParam::Override(over) => over.name(),
        }
    }

    pub fn spec(&self) -> Option<&ParameterSpec> {
        match self {
            HostParam::Classified(spec) => Some(spec),
            HostParam::Override(_) => None,
        }
    }

    pub fn is_sensitive(&self) -> bool {
        match self {
            HostParam::Classified(spec) => spec.is_sensitive(),
            HostParam::Override(over) => over.is_sensitive(),
        }
    }

    /// Positional in the rendered command
    pub fn is_argument(&self) -> bool {
        match self {
            HostParam::Classified(spec) => spec.is_argument(),
            HostParam::Override(over) => over.arg.is_positional(),
        }
    }

    /// How validation errors refer to this parameter
    pub fn label(&self) -> String {
        match self {
            HostParam::Classified(spec) => spec.label(),
            HostParam::Override(over) => {
                let arg = &over.arg;
                if let Some(long) = arg.get_long() {
                    format!("--{long}")
                } else if let Some(short) = arg.get_short() {
                    format!("-{short}")
                } else {
                    arg.get_value_names()
                        .and_then(|names| names.first())
                        .map(ToString::to_string)
                        .unwrap_or_else(|| over.name().to_uppercase())
                }
            }
        }
    }
}

/// Build the clap command for a parameter list
///
/// Auto-generated help is replaced by an explicit long `--help` so that `-h`
/// stays free for aliases.
///
/// # Errors
///
/// A variadic argument that is not the last argument, a parameter named
/// `help`, or two parameters claiming the same flag.
pub fn command(name: &str, params: &[HostParam]) -> Result<clap::Command, CompilationError> {
    check_arguments(name, params)?;

    let mut cmd = clap::Command::new(name.to_string())
        .disable_help_flag(true)
        .arg(
            Arg::new(HELP_ID)
                .long("help")
                .action(ArgAction::Help)
                .help("Show this message and exit."),
        );
    let mut args = Vec::new();
    for param in params {
        if param.name() == HELP_ID {
            return Err(CompilationError::new(format!(
                "Parameter 'help' of command '{name}' collides with the '--help' option."
            )));
        }
        match param {
            HostParam::Classified(spec) => {
                let (rendered, group) = render::render(spec)?;
                args.extend(rendered);
                if let Some(group) = group {
                    cmd = cmd.group(group);
                }
            }
            HostParam::Override(over) => args.push(over.arg.clone()),
        }
    }
    check_flags(name, &args)?;
    Ok(cmd.args(args))
}

fn check_arguments(name: &str, params: &[HostParam]) -> Result<(), CompilationError> {
    let arguments: Vec<&ParameterSpec> = params
        .iter()
        .filter_map(HostParam::spec)
        .filter(|spec| spec.is_argument())
        .collect();
    if let Some((_, init)) = arguments.split_last() {
        if let Some(variadic) = init.iter().find(|spec| spec.variadic) {
            return Err(CompilationError::new(format!(
                "Variadic argument '{}' must be the last argument of command '{name}'.",
                variadic.name
            )));
        }
    }
    Ok(())
}

fn check_flags(name: &str, args: &[Arg]) -> Result<(), CompilationError> {
    let mut seen: HashSet<String> = HashSet::from(["--help".to_string()]);
    for arg in args {
        let longs = arg
            .get_long()
            .into_iter()
            .chain(arg.get_all_aliases().into_iter().flatten())
            .map(|long| format!("--{long}"));
        let shorts = arg
            .get_short()
            .into_iter()
            .chain(arg.get_all_short_aliases().into_iter().flatten())
            .map(|short| format!("-{short}"));
        for flag in longs.chain(shorts) {
            if !seen.insert(flag.clone()) {
                return Err(CompilationError::new(format!(
                    "Option '{flag}' is declared more than once in command '{name}'."
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::metadata::FunctionSpec;
    use crate::signature::{Param, Signature};
    use crate::typing::{resolve, TypeHint};
    use decree_config::Config;
    use serde_json::Value;

    fn params(function: &FunctionSpec) -> Vec<HostParam> {
        let config = Config::default();
        classify(function, &config)
            .unwrap()
            .parameters
            .into_iter()
            .map(|mut spec| {
                spec.host_type = resolve(&spec.hint, &config);
                HostParam::Classified(spec)
            })
            .collect()
    }

    fn function(params: Vec<Param>) -> FunctionSpec {
        FunctionSpec::new("f", Signature::new(params).unwrap(), |_, _| Ok(Value::Null))
    }

    #[test]
    fn test_help_is_long_only() {
        let f = function(vec![Param::keyword("host", TypeHint::Str).with_default("x")])
            .alias("host", ["-h"])
            .unwrap();
        let mut cmd = command("f", &params(&f)).unwrap();
        let help = cmd.render_help().to_string();
        assert!(help.contains("--help"));
        assert!(help.contains("-h, --host <TEXT>"));
        let err = cmd.try_get_matches_from_mut(["f", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_parameter_named_help_is_rejected() {
        let f = function(vec![Param::keyword("help", TypeHint::Str)]);
        assert!(command("f", &params(&f)).is_err());
    }

    #[test]
    fn test_duplicate_flags_are_rejected() {
        let f = function(vec![Param::keyword("dry_run", TypeHint::Str)])
            .with_override(ParamOverride::new(Arg::new("extra").long("dry-run")));
        let mut params = params(&f);
        params.extend(f.overrides().iter().cloned().map(HostParam::Override));
        let err = command("f", &params).unwrap_err();
        assert_eq!(
            err.message(),
            "Option '--dry-run' is declared more than once in command 'f'."
        );
    }

    #[test]
    fn test_variadic_argument_must_be_last() {
        let f = function(vec![
            Param::positional("files", TypeHint::list(TypeHint::Str)),
            Param::positional("dest", TypeHint::Str).with_default("."),
        ]);
        let err = command("cp", &params(&f)).unwrap_err();
        assert!(err.message().starts_with("Variadic argument 'files' must be the last"));
    }

    #[test]
    fn test_override_labels() {
        let long = HostParam::Override(ParamOverride::new(Arg::new("x").long("ex")));
        let short = HostParam::Override(ParamOverride::new(Arg::new("y").short('y')));
        let positional = HostParam::Override(ParamOverride::new(Arg::new("z")));
        assert_eq!(long.label(), "--ex");
        assert_eq!(short.label(), "-y");
        assert_eq!(positional.label(), "Z");
    }
}
