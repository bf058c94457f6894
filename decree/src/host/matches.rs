//! Reading parsed values back out of clap

use clap::parser::ValueSource;
use clap::{ArgAction, ArgMatches};
use indexmap::IndexMap;
use serde_json::Value;

use crate::classify::ParameterSpec;
use crate::metadata::ParamOverride;

use super::parser::invalid_value;
use super::render::negated_id;
use super::HostParam;

/// Values keyed by command-line name, ready for the validation bridge
///
/// Values absent from the command line and the environment take the
/// parameter's default; repeatable and variadic parameters without one are
/// empty lists.
pub fn extract(
    params: &[HostParam],
    matches: &ArgMatches,
    cmd: &clap::Command,
) -> Result<IndexMap<String, Value>, clap::Error> {
    let mut values = IndexMap::new();
    for param in params {
        let value = match param {
            HostParam::Classified(spec) => classified(spec, matches, cmd)?,
            HostParam::Override(over) => overridden(over, matches),
        };
        if let Some(value) = value {
            values.insert(param.name().to_string(), value);
        }
    }
    Ok(values)
}

fn supplied(matches: &ArgMatches, id: &str) -> Option<ValueSource> {
    matches
        .value_source(id)
        .filter(|source| *source != ValueSource::DefaultValue)
}

fn classified(spec: &ParameterSpec, matches: &ArgMatches, cmd: &clap::Command) -> Result<Option<Value>, clap::Error> {
    let id = spec.name.as_str();

    if spec.count {
        return Ok(match supplied(matches, id) {
            Some(_) => Some(Value::from(matches.get_count(id))),
            None => Some(spec.default.clone().unwrap_or_else(|| Value::from(0))),
        });
    }

    if spec.is_negatable() {
        let negated = negated_id(id);
        let value = match (supplied(matches, id), supplied(matches, &negated)) {
            (Some(ValueSource::CommandLine), _) if matches.get_flag(id) => Some(Value::Bool(true)),
            (_, Some(ValueSource::CommandLine)) if matches.get_flag(&negated) => Some(Value::Bool(false)),
            (Some(ValueSource::EnvVariable), _) => Some(Value::Bool(matches.get_flag(id))),
            _ => spec.default.clone(),
        };
        return Ok(value);
    }

    if supplied(matches, id).is_none() {
        return Ok(match &spec.default {
            Some(default) => Some(default.clone()),
            None if spec.variadic || spec.multiple => Some(Value::Array(Vec::new())),
            None => None,
        });
    }

    let repeated = spec.variadic || spec.multiple;
    if spec.arity() > 1 {
        let Some(host) = &spec.host_type else {
            return Ok(None);
        };
        let arg = cmd.get_arguments().find(|a| a.get_id() == id);
        let mut tuples = Vec::new();
        for occurrence in matches.get_occurrences::<Value>(id).into_iter().flatten() {
            let tokens: Vec<&str> = occurrence.filter_map(Value::as_str).collect();
            let tuple = host
                .parse_tuple(&tokens)
                .map_err(|reason| invalid_value(cmd, arg, &tokens.join(" "), &reason))?;
            tuples.push(tuple);
        }
        return Ok(if repeated {
            Some(Value::Array(tuples))
        } else {
            tuples.into_iter().next()
        });
    }

    Ok(if repeated {
        Some(Value::Array(
            matches
                .get_many::<Value>(id)
                .into_iter()
                .flatten()
                .cloned()
                .collect(),
        ))
    } else {
        matches.get_one::<Value>(id).cloned()
    })
}

/// Overrides carry their own value parsers; the raw tokens are handed on
/// and left to validation
fn overridden(over: &ParamOverride, matches: &ArgMatches) -> Option<Value> {
    let id = over.name();
    match over.arg.get_action() {
        ArgAction::SetTrue | ArgAction::SetFalse => matches
            .try_get_one::<bool>(id)
            .ok()
            .flatten()
            .map(|flag| Value::Bool(*flag)),
        ArgAction::Count => matches
            .try_get_one::<u8>(id)
            .ok()
            .flatten()
            .map(|count| Value::from(*count)),
        action => {
            let raw: Vec<Value> = matches
                .get_raw(id)
                .into_iter()
                .flatten()
                .map(|token| Value::String(token.to_string_lossy().into_owned()))
                .collect();
            if raw.is_empty() {
                return None;
            }
            let many = matches!(action, ArgAction::Append)
                || over
                    .arg
                    .get_num_args()
                    .is_some_and(|range| range.max_values() > 1);
            if many {
                Some(Value::Array(raw))
            } else {
                raw.into_iter().next()
            }
        }
    }
}
