//! Rendering classified parameters as clap arguments

use clap::builder::BoolishValueParser;
use clap::{Arg, ArgAction, ArgGroup};

use crate::classify::ParameterSpec;
use crate::error::CompilationError;
use crate::typing::{default_label, HostType};

use super::parser::HostValueParser;

/// Id of the negated half of a `--x/--no-x` pair
pub fn negated_id(name: &str) -> String {
    format!("{name}:negated")
}

/// Id of the group tying a required `--x/--no-x` pair together
pub fn flag_group_id(name: &str) -> String {
    format!("{name}:flag")
}

/// clap arguments for one classified parameter
///
/// A negatable flag renders as two switches that override each other, plus a
/// required group when neither side has a default.
pub fn render(spec: &ParameterSpec) -> Result<(Vec<Arg>, Option<ArgGroup>), CompilationError> {
    if spec.is_argument() {
        return Ok((vec![argument(spec)?], None));
    }
    if spec.is_negatable() {
        return Ok(negatable(spec));
    }
    Ok((vec![option(spec)], None))
}

fn argument(spec: &ParameterSpec) -> Result<Arg, CompilationError> {
    let arity = spec.arity();
    if spec.variadic && arity != 1 {
        return Err(CompilationError::new(format!(
            "Variadic argument '{}' cannot take tuple values.",
            spec.name
        )));
    }

    let value_name = spec.metavar.clone().unwrap_or_else(|| {
        spec.host_type
            .as_ref()
            .and_then(HostType::metavar)
            .unwrap_or_else(|| spec.name.to_uppercase())
    });
    let mut arg = Arg::new(spec.name.clone())
        .required(spec.required)
        .value_parser(HostValueParser::new(spec.host_type.clone()));

    arg = if spec.variadic {
        arg.value_name(value_name)
            .action(ArgAction::Append)
            .num_args(if spec.required { 1.. } else { 0.. })
    } else if arity > 1 {
        arg.action(ArgAction::Set)
            .num_args(arity)
            .value_names(tuple_names(spec.host_type.as_ref()))
    } else {
        arg.value_name(value_name).action(ArgAction::Set)
    };
    if let Some(help) = &spec.help {
        arg = arg.help(help.clone());
    }
    Ok(finish(arg, spec))
}

fn option(spec: &ParameterSpec) -> Arg {
    let mut arg = declare(Arg::new(spec.name.clone()), spec);
    if spec.count {
        arg = arg.action(ArgAction::Count);
    } else {
        let arity = spec.arity();
        arg = arg
            .value_parser(HostValueParser::new(spec.host_type.clone()))
            .action(if spec.multiple {
                ArgAction::Append
            } else {
                ArgAction::Set
            })
            .num_args(arity)
            .required(spec.required);
        arg = if arity > 1 {
            arg.value_names(tuple_names(spec.host_type.as_ref()))
        } else {
            arg.value_name(
                spec.host_type
                    .as_ref()
                    .map_or_else(|| "TEXT".to_string(), HostType::value_name),
            )
        };
        if spec.host_type.as_ref().and_then(HostType::choices).is_some() {
            arg = arg.hide_possible_values(true);
        }
    }
    if let Some(env) = &spec.envvar {
        arg = arg.env(env.clone()).hide_env(true).hide_env_values(true);
    }
    if let Some(help) = help_text(spec) {
        arg = arg.help(help);
    }
    finish(arg, spec)
}

fn negatable(spec: &ParameterSpec) -> (Vec<Arg>, Option<ArgGroup>) {
    let negated = negated_id(&spec.name);
    let mut positive = declare(Arg::new(spec.name.clone()), spec)
        .action(ArgAction::SetTrue)
        .value_parser(BoolishValueParser::new())
        .overrides_with(negated.clone());
    if let Some(env) = &spec.envvar {
        positive = positive.env(env.clone()).hide_env(true).hide_env_values(true);
    }
    if let Some(help) = help_text(spec) {
        positive = positive.help(help);
    }

    let mut negative = Arg::new(negated.clone())
        .action(ArgAction::SetTrue)
        .overrides_with(spec.name.clone());
    for (i, negation) in spec.secondary_opts().into_iter().enumerate() {
        let long = negation.trim_start_matches('-').to_string();
        negative = if i == 0 {
            negative.long(long)
        } else {
            negative.visible_alias(long)
        };
    }
    if let Some(flag) = spec.opts().first() {
        negative = negative.help(format!("Negate {flag}"));
    }

    let group = spec.required.then(|| {
        ArgGroup::new(flag_group_id(&spec.name))
            .args([spec.name.clone(), negated])
            .required(true)
    });
    (vec![finish(positive, spec), finish(negative, spec)], group)
}

/// Long flag plus short aliases
fn declare(mut arg: Arg, spec: &ParameterSpec) -> Arg {
    let mut short_seen = false;
    for flag in spec.opts() {
        if let Some(long) = flag.strip_prefix("--") {
            arg = arg.long(long.to_string());
        } else if let Some(c) = flag.strip_prefix('-').and_then(|s| s.chars().next()) {
            arg = if short_seen {
                arg.visible_short_alias(c)
            } else {
                arg.short(c)
            };
            short_seen = true;
        }
    }
    arg
}

fn finish(mut arg: Arg, spec: &ParameterSpec) -> Arg {
    if spec.host_type.as_ref().is_some_and(HostType::is_numeric) && !spec.count {
        arg = arg.allow_negative_numbers(true);
    }
    if let Some(section) = &spec.section {
        arg = arg.help_heading(section.clone());
    }
    arg
}

fn tuple_names(host: Option<&HostType>) -> Vec<String> {
    match host {
        Some(HostType::Tuple(members)) => members
            .iter()
            .map(|m| m.as_ref().map_or_else(|| "TEXT".to_string(), HostType::name))
            .collect(),
        _ => vec!["TEXT".to_string()],
    }
}

/// Help line with a trailing `[env var: X; default: 3; x>0; required]`
pub fn help_text(spec: &ParameterSpec) -> Option<String> {
    let mut extra = Vec::new();
    if let (Some(env), true) = (&spec.envvar, spec.show_envvar) {
        extra.push(format!("env var: {env}"));
    }
    if let (Some(default), true) = (&spec.default, spec.show_default) {
        extra.push(format!("default: {}", default_display(spec, default)));
    }
    if let Some(range) = spec.host_type.as_ref().and_then(HostType::range) {
        let counting_from_zero =
            spec.count && range.max.is_none() && range.min.is_some_and(|m| m.as_f64() == 0.0);
        let described = range.describe();
        if !counting_from_zero && !described.is_empty() {
            extra.push(described);
        }
    }
    if spec.required && !spec.count {
        extra.push("required".to_string());
    }

    let extra = (!extra.is_empty()).then(|| format!("[{}]", extra.join("; ")));
    match (spec.help.as_deref(), extra) {
        (Some(help), Some(extra)) => Some(format!("{help}  {extra}")),
        (Some(help), None) => Some(help.to_string()),
        (None, extra) => extra,
    }
}

/// A negatable flag shows which side is on by default
fn default_display(spec: &ParameterSpec, default: &serde_json::Value) -> String {
    if spec.is_negatable() {
        let side = match default.as_bool() {
            Some(true) => spec.opts().first().copied(),
            _ => spec.secondary_opts().first().copied(),
        };
        if let Some(side) = side {
            return side.trim_start_matches('-').to_string();
        }
    }
    default_label(default)
}
