//! Token parsing for compiled parameters

use clap::builder::{PossibleValue, TypedValueParser};
use clap::error::ErrorKind;
use serde_json::Value;
use std::ffi::OsStr;

use crate::typing::HostType;

/// Parses one command-line token through a resolved [`HostType`]
///
/// Without a host type the token passes through as a string. Tuple types are
/// also passed through token by token; their members are converted once the
/// whole occurrence has been collected.
#[derive(Debug, Clone, Default)]
pub struct HostValueParser {
    host: Option<HostType>,
}

impl HostValueParser {
    pub fn new(host: Option<HostType>) -> Self {
        Self { host }
    }

    pub fn host(&self) -> Option<&HostType> {
        self.host.as_ref()
    }
}

impl TypedValueParser for HostValueParser {
    type Value = Value;

    fn parse_ref(
        &self,
        cmd: &clap::Command,
        arg: Option<&clap::Arg>,
        value: &OsStr,
    ) -> Result<Self::Value, clap::Error> {
        let raw = value
            .to_str()
            .ok_or_else(|| clap::Error::new(ErrorKind::InvalidUtf8).with_cmd(cmd))?;
        match &self.host {
            None | Some(HostType::Tuple(_)) => Ok(Value::String(raw.to_string())),
            Some(host) => host
                .parse(raw)
                .map_err(|reason| invalid_value(cmd, arg, raw, &reason)),
        }
    }

    fn possible_values(&self) -> Option<Box<dyn Iterator<Item = PossibleValue> + '_>> {
        let choices = self.host.as_ref()?.choices()?;
        Some(Box::new(
            choices.iter().map(|choice| PossibleValue::new(choice.clone())),
        ))
    }
}

/// A token the host type rejected, reported the way clap reports its own
pub fn invalid_value(cmd: &clap::Command, arg: Option<&clap::Arg>, raw: &str, reason: &str) -> clap::Error {
    let target = arg.map(ToString::to_string).unwrap_or_else(|| "...".to_string());
    clap::Error::raw(
        ErrorKind::ValueValidation,
        format!("invalid value '{raw}' for '{target}': {reason}\n"),
    )
    .with_cmd(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typing::{Numeric, NumericRange};
    use clap::{Arg, Command};
    use serde_json::json;

    fn parse(host: Option<HostType>, args: &[&str]) -> Result<Value, clap::Error> {
        let matches = Command::new("t")
            .arg(
                Arg::new("value")
                    .long("value")
                    .allow_negative_numbers(true)
                    .value_parser(HostValueParser::new(host)),
            )
            .try_get_matches_from(std::iter::once("t").chain(args.iter().copied()))?;
        Ok(matches.get_one::<Value>("value").cloned().unwrap_or(Value::Null))
    }

    #[test]
    fn test_untyped_tokens_pass_through() {
        assert_eq!(parse(None, &["--value", "abc"]).unwrap(), json!("abc"));
    }

    #[test]
    fn test_typed_tokens_are_converted() {
        assert_eq!(parse(Some(HostType::Int), &["--value", "-4"]).unwrap(), json!(-4));
        assert_eq!(parse(Some(HostType::Bool), &["--value", "yes"]).unwrap(), json!(true));
    }

    #[test]
    fn test_rejected_tokens_are_value_validation_errors() {
        let range = NumericRange {
            min: Some(Numeric::Int(0)),
            min_open: true,
            ..NumericRange::default()
        };
        let err = parse(Some(HostType::IntRange(range)), &["--value", "x"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        assert!(err.to_string().contains("invalid value 'x' for '--value <value>'"));
        assert!(err.to_string().contains("is not a valid integer"));
    }

    #[test]
    fn test_choices_are_possible_values() {
        let parser = HostValueParser::new(Some(HostType::Choice(vec!["a".into(), "b".into()])));
        let values: Vec<String> = parser
            .possible_values()
            .unwrap()
            .map(|v| v.get_name().to_string())
            .collect();
        assert_eq!(values, vec!["a", "b"]);
        assert!(HostValueParser::new(Some(HostType::Int)).possible_values().is_none());
    }
}
