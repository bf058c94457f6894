//! Call-time validation of parsed command-line values
//!
//! Every command body runs behind a [`Bridge`]. The bridge takes the values
//! the host parser produced (keyed by command-line name), puts them back into
//! the calling convention of the original signature, validates them, and only
//! then runs the body. Validation failures are rewritten for the terminal:
//! the banner names the command, each failing parameter is labelled the way
//! the user typed it, and sensitive inputs are redacted.

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt::Write as _;
use tracing::{debug, trace};

use decree_config::ValidationSettings;

use crate::context::{Call, Context};
use crate::error::{DecreeError, Result};
use crate::metadata::{CommandMetadata, FunctionSpec, Handler};
use crate::signature::{ParamKind, Signature};
use crate::typing::repr;
use crate::validation::error::plural;
use crate::validation::{ErrorDetail, LocItem, SchemaError, ValidationError, Validator};

/// Replaces the echoed input of sensitive parameters
pub const REDACTED: &str = "hidden";

pub struct Bridge {
    command: String,
    function: String,
    signature: Signature,
    metadata: CommandMetadata,
    handler: Handler,
    settings: ValidationSettings,
    /// Original parameter name to command-line label
    labels: IndexMap<String, String>,
    /// Original names of parameters whose input is never echoed
    sensitive: HashSet<String>,
    validator: OnceCell<std::result::Result<Validator, SchemaError>>,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("command", &self.command)
            .field("labels", &self.labels)
            .field("sensitive", &self.sensitive)
            .finish_non_exhaustive()
    }
}

impl Bridge {
    pub fn new(
        command: impl Into<String>,
        function: &FunctionSpec,
        settings: ValidationSettings,
        labels: IndexMap<String, String>,
        sensitive: HashSet<String>,
    ) -> Self {
        Self {
            command: command.into(),
            function: function.name().to_string(),
            signature: function.signature().clone(),
            metadata: function.metadata().clone(),
            handler: function.handler().clone(),
            settings,
            labels,
            sensitive,
            validator: OnceCell::new(),
        }
    }

    /// Same validation behavior under another command name
    pub fn renamed(&self, command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            function: self.function.clone(),
            signature: self.signature.clone(),
            metadata: self.metadata.clone(),
            handler: self.handler.clone(),
            settings: self.settings.clone(),
            labels: self.labels.clone(),
            sensitive: self.sensitive.clone(),
            validator: self.validator.clone(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    fn validator(&self) -> std::result::Result<&Validator, &SchemaError> {
        self.validator
            .get_or_init(|| Validator::build(&self.function, &self.signature, &self.settings))
            .as_ref()
    }

    /// Rebuild positional call order from command-line-named values
    ///
    /// Names are mapped back through the rename table. Positional parameters
    /// are taken in signature order until the first one that is absent; the
    /// variadic positional values follow only when none was absent.
    pub fn normalize(&self, params: IndexMap<String, Value>) -> (Vec<Value>, IndexMap<String, Value>) {
        let mut kwargs: IndexMap<String, Value> = params
            .into_iter()
            .map(|(name, value)| (self.metadata.original_name(&name).to_string(), value))
            .collect();

        let skip = usize::from(self.signature.passes_context());
        let mut args = Vec::new();
        let mut complete = true;
        for param in self.signature.iter().skip(skip) {
            match param.kind {
                ParamKind::PositionalOnly | ParamKind::PositionalOrKeyword if complete => {
                    match kwargs.shift_remove(&param.name) {
                        Some(value) => args.push(value),
                        None => complete = false,
                    }
                }
                ParamKind::VarPositional if complete => match kwargs.shift_remove(&param.name) {
                    Some(Value::Array(values)) => args.extend(values),
                    Some(value) => args.push(value),
                    None => {}
                },
                _ => {}
            }
        }
        (args, kwargs)
    }

    /// Validate and run the command body
    ///
    /// # Errors
    ///
    /// [`DecreeError::Cli`] when no validator can be built for the signature,
    /// [`DecreeError::Usage`] when the values do not validate, and
    /// [`DecreeError::Handler`] when the body fails.
    pub fn call(&self, ctx: &mut Context, params: IndexMap<String, Value>) -> Result<Value> {
        let call = self.validate(params)?;
        debug!(command = %self.command, "running command body");
        (self.handler)(ctx, &call).map_err(DecreeError::Handler)
    }

    /// Validate without running the body
    pub fn validate(&self, params: IndexMap<String, Value>) -> Result<Call> {
        let validator = self
            .validator()
            .map_err(|err| DecreeError::cli(self.schema_message(err)))?;
        let (args, kwargs) = self.normalize(params);
        trace!(command = %self.command, args = args.len(), kwargs = kwargs.len(), "validating call");
        validator
            .validate(args, kwargs)
            .map(Call::new)
            .map_err(|err| DecreeError::usage(self.usage_message(&err)))
    }

    fn schema_message(&self, err: &SchemaError) -> String {
        format!("Error building command '{}': {}", self.command, err.message)
    }

    /// Render a validation failure for the terminal
    pub fn usage_message(&self, err: &ValidationError) -> String {
        let count = err.errors.len();
        let mut out = format!(
            "{count} validation error{} for command '{}'",
            plural(count),
            self.command
        );
        for error in &err.errors {
            let _ = write!(out, "\n{}\n  {}", self.label(&error.loc), error.msg);
            if !self.settings.hide_input_in_errors {
                let _ = write!(out, " [input_value={}]", self.input_value(error));
            }
        }
        out
    }

    /// `--opt`, `NAME`, or `NAME [2]` for one element of a collection
    fn label(&self, loc: &[LocItem]) -> String {
        let mut label = match loc.first() {
            Some(LocItem::Key(name)) => self
                .labels
                .get(name)
                .cloned()
                .unwrap_or_else(|| self.metadata.param_name(name).to_string()),
            Some(LocItem::Index(index)) => format!("[{index}]"),
            None => String::new(),
        };
        if let Some(LocItem::Index(index)) = loc.get(1) {
            let _ = write!(label, " [{index}]");
        }
        label
    }

    fn input_value(&self, error: &ErrorDetail) -> String {
        let sensitive = matches!(error.loc.first(), Some(LocItem::Key(name)) if self.sensitive.contains(name));
        if sensitive {
            return REDACTED.to_string();
        }
        match error.kind {
            "missing_argument" | "missing_keyword_only_argument" if !self.sensitive.is_empty() => {
                repr(&self.redact_call(&error.input))
            }
            _ => repr(&error.input),
        }
    }

    /// Mask sensitive values inside an echoed `{args, kwargs}` call
    fn redact_call(&self, input: &Value) -> Value {
        let mut input = input.clone();
        let positional: Vec<&str> = self
            .signature
            .iter()
            .filter(|p| p.kind.is_positional() && p.hint != crate::typing::TypeHint::Context)
            .map(|p| p.name.as_str())
            .collect();
        if let Some(Value::Array(args)) = input.get_mut("args") {
            for (value, name) in args.iter_mut().zip(positional) {
                if self.sensitive.contains(name) {
                    *value = Value::String(REDACTED.to_string());
                }
            }
        }
        if let Some(Value::Object(kwargs)) = input.get_mut("kwargs") {
            for (name, value) in kwargs.iter_mut() {
                if self.sensitive.contains(name) {
                    *value = Value::String(REDACTED.to_string());
                }
            }
        }
        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Param;
    use crate::typing::{Constraints, TypeHint};
    use serde_json::json;

    fn bridge(function: FunctionSpec, labels: &[(&str, &str)], sensitive: &[&str]) -> Bridge {
        Bridge::new(
            "cmd",
            &function,
            ValidationSettings::default(),
            labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            sensitive.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn echo(params: Vec<Param>) -> FunctionSpec {
        FunctionSpec::new("echo", Signature::new(params).unwrap(), |_, call| Ok(call.to_value()))
    }

    fn params(pairs: &[(&str, Value)]) -> IndexMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_normalize_restores_call_order() {
        let f = echo(vec![
            Param::context(),
            Param::positional_only("a", TypeHint::Int),
            Param::positional("b", TypeHint::Int),
            Param::var_positional("rest", TypeHint::Int),
            Param::keyword("flag", TypeHint::Bool),
        ])
        .rename(None, [("b", "bee")])
        .unwrap();
        let bridge = bridge(f, &[], &[]);
        let (args, kwargs) = bridge.normalize(params(&[
            ("flag", json!(true)),
            ("bee", json!("2")),
            ("a", json!("1")),
            ("rest", json!(["3", "4"])),
        ]));
        assert_eq!(args, vec![json!("1"), json!("2"), json!("3"), json!("4")]);
        assert_eq!(kwargs, params(&[("flag", json!(true))]));
    }

    #[test]
    fn test_call_runs_body_with_validated_values() {
        let f = echo(vec![
            Param::positional("count", TypeHint::Int),
            Param::keyword("name", TypeHint::Str).with_default("x"),
        ]);
        let bridge = bridge(f, &[("count", "COUNT")], &[]);
        let mut ctx = Context::new("cmd");
        let out = bridge.call(&mut ctx, params(&[("count", json!("3"))])).unwrap();
        assert_eq!(out, json!({"count": 3, "name": "x"}));
    }

    #[test]
    fn test_usage_message_labels_and_indexes() {
        let f = echo(vec![
            Param::var_positional("values", TypeHint::Int),
            Param::keyword("limit", TypeHint::positive_int()),
        ]);
        let bridge = bridge(f, &[("values", "[VALUES]..."), ("limit", "--limit")], &[]);
        let err = bridge
            .validate(params(&[("values", json!(["1", "x"])), ("limit", json!(-1))]))
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(
            err.to_string(),
            "2 validation errors for command 'cmd'\n\
             [VALUES]... [1]\n  Input should be a valid integer, unable to parse string as an integer [input_value='x']\n\
             --limit\n  Input should be greater than 0 [input_value=-1]"
        );
    }

    #[test]
    fn test_sensitive_inputs_are_redacted() {
        let f = echo(vec![Param::keyword(
            "token",
            TypeHint::constr(Constraints::new().min_length(8)),
        )]);
        let bridge = bridge(f, &[("token", "--token")], &["token"]);
        let err = bridge.validate(params(&[("token", json!("abc"))])).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("[input_value=hidden]"), "{message}");
        assert!(!message.contains("abc"));
    }

    #[test]
    fn test_hide_input_in_errors_drops_input() {
        let f = echo(vec![Param::keyword("n", TypeHint::Int)]);
        let bridge = Bridge::new(
            "cmd",
            &f,
            ValidationSettings {
                strict: false,
                hide_input_in_errors: true,
            },
            IndexMap::new(),
            HashSet::new(),
        );
        let err = bridge.validate(params(&[("n", json!("x"))])).unwrap_err();
        assert!(!err.to_string().contains("input_value"));
        assert!(err.to_string().contains("\nn\n"));
    }

    #[test]
    fn test_schema_error_is_a_cli_error() {
        let f = echo(vec![Param::keyword(
            "n",
            TypeHint::annotated(TypeHint::Int, [crate::typing::Metadata::MinLength(2)]),
        )]);
        let bridge = bridge(f, &[], &[]);
        let err = bridge.validate(params(&[("n", json!(1))])).unwrap_err();
        assert!(matches!(err, DecreeError::Cli { .. }));
        assert!(err
            .to_string()
            .starts_with("Error building command 'cmd': parameter 'n'"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_renamed_bridge_keeps_behavior() {
        let f = echo(vec![Param::positional("n", TypeHint::Int)]);
        let original = bridge(f, &[("n", "N")], &[]);
        let copy = original.renamed("other");
        let err = copy.validate(params(&[("n", json!("x"))])).unwrap_err();
        assert!(err.to_string().contains("for command 'other'"));
        assert_eq!(original.command(), "cmd");
    }
}
