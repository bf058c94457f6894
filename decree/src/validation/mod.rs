//! Structural validation of calls against a [`Signature`]
//!
//! A [`Validator`] is built once per signature. Building checks that every
//! constraint makes sense for the type it annotates and compiles `pattern`
//! constraints; a broken declaration is a [`SchemaError`]. Validation binds
//! positional and keyword values to parameters the way a call would, then
//! checks each bound value against its hint.
//!
//! ```
//! use decree::validation::Validator;
//! use decree::{Param, Signature, TypeHint};
//! use decree_config::ValidationSettings;
//! use indexmap::IndexMap;
//! use serde_json::json;
//!
//! let signature = Signature::new([
//!     Param::positional("count", TypeHint::positive_int()),
//!     Param::keyword("name", TypeHint::Str).with_default("world"),
//! ])
//! .unwrap();
//! let validator = Validator::build("greet", &signature, &ValidationSettings::default()).unwrap();
//!
//! let call = validator.validate(vec![json!("3")], IndexMap::new()).unwrap();
//! assert_eq!(call["count"], json!(3));
//! assert_eq!(call["name"], json!("world"));
//!
//! let err = validator.validate(vec![json!(0)], IndexMap::new()).unwrap_err();
//! assert_eq!(err.errors[0].msg, "Input should be greater than 0");
//! ```

pub mod error;
mod types;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::trace;

use decree_config::ValidationSettings;

use crate::signature::{Param, ParamKind, Signature};
use crate::typing::{convert_default, Metadata, TypeHint};

pub use error::{ErrorDetail, LocItem, SchemaError, ValidationError};
use types::{Checker, Patterns};

/// Validated parameter values keyed by parameter name, in signature order
///
/// A variadic positional parameter maps to an array, a variadic keyword
/// parameter to an object.
pub type BoundCall = IndexMap<String, Value>;

#[derive(Debug, Clone)]
pub struct Validator {
    title: String,
    params: Vec<Param>,
    settings: ValidationSettings,
    patterns: Patterns,
}

impl Validator {
    /// Build a validator for every parameter except a leading context
    ///
    /// # Errors
    ///
    /// A constraint attached to a type it cannot apply to, or a `pattern`
    /// that is not a valid regular expression.
    pub fn build(
        title: impl Into<String>,
        signature: &Signature,
        settings: &ValidationSettings,
    ) -> Result<Self, SchemaError> {
        let title = title.into();
        let skip = usize::from(signature.passes_context());
        let params: Vec<Param> = signature.iter().skip(skip).cloned().collect();

        let mut patterns = Patterns::new();
        for param in &params {
            check_schema(&param.hint, &mut patterns).map_err(|message| SchemaError {
                title: title.clone(),
                message: format!("parameter '{}': {message}", param.name),
            })?;
        }

        Ok(Self {
            title,
            params,
            settings: settings.clone(),
            patterns,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Bind and validate one call
    ///
    /// # Errors
    ///
    /// Every binding problem and every failing value, in parameter order.
    pub fn validate(&self, args: Vec<Value>, kwargs: IndexMap<String, Value>) -> Result<BoundCall, ValidationError> {
        let mut checker = Checker::new(self.settings.strict, &self.patterns);
        let call_input = json!({ "args": args.clone(), "kwargs": kwargs.clone() });

        let mut args = args.into_iter().enumerate();
        let mut kwargs = kwargs;
        let mut bound = BoundCall::new();
        let mut extra_keywords = Map::new();

        for param in &self.params {
            let loc = [LocItem::Key(param.name.clone())];
            match param.kind {
                ParamKind::PositionalOnly | ParamKind::PositionalOrKeyword => {
                    let positional = args.next().map(|(_, value)| value);
                    let keyword = kwargs.shift_remove(&param.name);
                    let value = match (positional, keyword) {
                        (Some(_), Some(keyword)) => {
                            checker.errors.push(ErrorDetail::new(
                                loc.to_vec(),
                                "multiple_argument_values",
                                "Got multiple values for argument",
                                keyword,
                            ));
                            continue;
                        }
                        (None, Some(keyword)) if param.kind == ParamKind::PositionalOnly => {
                            checker.errors.push(ErrorDetail::new(
                                loc.to_vec(),
                                "positional_only_argument",
                                "Positional-only argument passed as keyword argument",
                                keyword,
                            ));
                            continue;
                        }
                        (Some(value), None) | (None, Some(value)) => value,
                        (None, None) => match &param.default {
                            Some(default) => {
                                bound.insert(param.name.clone(), convert_default(&param.hint, default));
                                continue;
                            }
                            None => {
                                checker.errors.push(ErrorDetail::new(
                                    loc.to_vec(),
                                    "missing_argument",
                                    "Missing required argument",
                                    call_input.clone(),
                                ));
                                continue;
                            }
                        },
                    };
                    if let Some(valid) = checker.check(&param.hint, &value, &loc) {
                        bound.insert(param.name.clone(), valid);
                    }
                }
                ParamKind::VarPositional => {
                    let mut items = Vec::new();
                    for (i, (_, value)) in args.by_ref().enumerate() {
                        let item_loc = [LocItem::Key(param.name.clone()), LocItem::Index(i)];
                        items.extend(checker.check(&param.hint, &value, &item_loc));
                    }
                    bound.insert(param.name.clone(), Value::Array(items));
                }
                ParamKind::KeywordOnly => match kwargs.shift_remove(&param.name) {
                    Some(value) => {
                        if let Some(valid) = checker.check(&param.hint, &value, &loc) {
                            bound.insert(param.name.clone(), valid);
                        }
                    }
                    None => match &param.default {
                        Some(default) => {
                            bound.insert(param.name.clone(), convert_default(&param.hint, default));
                        }
                        None => checker.errors.push(ErrorDetail::new(
                            loc.to_vec(),
                            "missing_keyword_only_argument",
                            "Missing required keyword only argument",
                            call_input.clone(),
                        )),
                    },
                },
                ParamKind::VarKeyword => {
                    for (key, value) in std::mem::take(&mut kwargs) {
                        let item_loc = [LocItem::Key(key.clone())];
                        if let Some(valid) = checker.check(&param.hint, &value, &item_loc) {
                            extra_keywords.insert(key, valid);
                        }
                    }
                    bound.insert(param.name.clone(), Value::Object(std::mem::take(&mut extra_keywords)));
                }
            }
        }

        for (index, value) in args {
            checker.errors.push(ErrorDetail::new(
                vec![LocItem::Index(index)],
                "unexpected_positional_argument",
                "Unexpected positional argument",
                value,
            ));
        }
        for (key, value) in kwargs {
            checker.errors.push(ErrorDetail::new(
                vec![LocItem::Key(key)],
                "unexpected_keyword_argument",
                "Unexpected keyword argument",
                value,
            ));
        }

        if checker.errors.is_empty() {
            trace!(function = %self.title, "call validated");
            Ok(bound)
        } else {
            Err(ValidationError {
                title: self.title.clone(),
                errors: checker.errors,
                hide_input: self.settings.hide_input_in_errors,
            })
        }
    }
}

fn is_numeric(hint: &TypeHint) -> bool {
    matches!(hint, TypeHint::Int | TypeHint::Float | TypeHint::Decimal)
}

fn is_sized(hint: &TypeHint) -> bool {
    matches!(hint, TypeHint::Str | TypeHint::Collection(..) | TypeHint::Tuple(_))
}

/// Reject constraints that cannot apply to their type; compile patterns
fn check_schema(hint: &TypeHint, patterns: &mut Patterns) -> Result<(), String> {
    match hint {
        TypeHint::Annotated(inner, metadata) => {
            for constraint in metadata {
                let applies = match constraint {
                    Metadata::Gt(_) | Metadata::Ge(_) | Metadata::Lt(_) | Metadata::Le(_) | Metadata::MultipleOf(_) => {
                        is_numeric(inner)
                    }
                    Metadata::MinLength(_) | Metadata::MaxLength(_) => is_sized(inner),
                    Metadata::Pattern(pattern) => {
                        if **inner == TypeHint::Str {
                            let regex = Regex::new(pattern)
                                .map_err(|e| format!("invalid pattern '{pattern}': {e}"))?;
                            patterns.insert(pattern.clone(), regex);
                            true
                        } else {
                            false
                        }
                    }
                    Metadata::Path(_) => **inner == TypeHint::Path,
                    Metadata::Past | Metadata::Future => matches!(**inner, TypeHint::Date | TypeHint::DateTime),
                    Metadata::Counter => **inner == TypeHint::Int,
                };
                if !applies {
                    let name = constraint.to_string();
                    let name = name.split('=').next().unwrap_or_default();
                    return Err(format!("unknown constraint '{name}' for type '{}'", inner.type_name()));
                }
            }
            check_schema(inner, patterns)
        }
        TypeHint::Union(members) | TypeHint::Tuple(members) => {
            members.iter().try_for_each(|m| check_schema(m, patterns))
        }
        TypeHint::Collection(_, Some(element)) => check_schema(element, patterns),
        TypeHint::NamedTuple(named) => named
            .fields
            .iter()
            .try_for_each(|(_, hint)| check_schema(hint, patterns)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typing::Constraints;
    use serde_json::json;

    fn signature() -> Signature {
        Signature::new([
            Param::context(),
            Param::positional("a", TypeHint::Int),
            Param::positional("b", TypeHint::Str).with_default("x"),
            Param::var_positional("rest", TypeHint::Float),
            Param::keyword("flag", TypeHint::Bool),
            Param::keyword("limit", TypeHint::positive_int()).with_default(10),
        ])
        .unwrap()
    }

    fn validator() -> Validator {
        Validator::build("f", &signature(), &ValidationSettings::default()).unwrap()
    }

    fn kwargs(pairs: &[(&str, Value)]) -> IndexMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_binds_and_fills_defaults() {
        let call = validator()
            .validate(vec![json!("1"), json!("y"), json!(1), json!("2.5")], kwargs(&[("flag", json!(true))]))
            .unwrap();
        let keys: Vec<&str> = call.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b", "rest", "flag", "limit"]);
        assert_eq!(call["a"], json!(1));
        assert_eq!(call["rest"], json!([1.0, 2.5]));
        assert_eq!(call["limit"], json!(10));
    }

    #[test]
    fn test_positional_by_keyword() {
        let call = validator()
            .validate(vec![], kwargs(&[("a", json!(1)), ("flag", json!(false))]))
            .unwrap();
        assert_eq!(call["a"], json!(1));
        assert_eq!(call["b"], json!("x"));
    }

    #[test]
    fn test_binding_errors() {
        let err = validator()
            .validate(vec![json!(1)], kwargs(&[("a", json!(2)), ("nope", json!(3))]))
            .unwrap_err();
        let summary: Vec<(String, &str)> = err.errors.iter().map(|e| (e.loc_path(), e.kind)).collect();
        assert_eq!(
            summary,
            vec![
                ("a".to_string(), "multiple_argument_values"),
                ("flag".to_string(), "missing_keyword_only_argument"),
                ("nope".to_string(), "unexpected_keyword_argument"),
            ]
        );

        let err = validator().validate(vec![], kwargs(&[("flag", json!(true))])).unwrap_err();
        assert_eq!(err.errors[0].msg, "Missing required argument");
    }

    #[test]
    fn test_unexpected_positional_without_variadic() {
        let signature = Signature::new([Param::positional("a", TypeHint::Int)]).unwrap();
        let validator = Validator::build("g", &signature, &ValidationSettings::default()).unwrap();
        let err = validator.validate(vec![json!(1), json!(2)], IndexMap::new()).unwrap_err();
        assert_eq!(err.errors[0].loc, vec![LocItem::Index(1)]);
        assert_eq!(err.errors[0].msg, "Unexpected positional argument");
    }

    #[test]
    fn test_variadic_item_locations() {
        let err = validator()
            .validate(vec![json!(1), json!("b"), json!(1), json!("x")], kwargs(&[("flag", json!(true))]))
            .unwrap_err();
        assert_eq!(err.errors[0].loc_path(), "rest.1");
    }

    #[test]
    fn test_var_keyword_collects_extras() {
        let signature = Signature::new([
            Param::keyword("a", TypeHint::Int),
            Param::var_keyword("extra", TypeHint::Int),
        ])
        .unwrap();
        let validator = Validator::build("g", &signature, &ValidationSettings::default()).unwrap();
        let call = validator
            .validate(vec![], kwargs(&[("a", json!(1)), ("b", json!("2"))]))
            .unwrap();
        assert_eq!(call["extra"], json!({"b": 2}));
    }

    #[test]
    fn test_error_rendering_and_hidden_inputs() {
        let err = validator()
            .validate(vec![json!(1)], kwargs(&[("flag", json!(true)), ("limit", json!(-1))]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "1 validation error for f\nlimit\n  Input should be greater than 0 \
             [type=greater_than, input_value=-1, input_type=int]"
        );

        let settings = ValidationSettings {
            strict: false,
            hide_input_in_errors: true,
        };
        let hidden = Validator::build("f", &signature(), &settings)
            .unwrap()
            .validate(vec![json!(1)], kwargs(&[("flag", json!(true)), ("limit", json!(-1))]))
            .unwrap_err();
        assert!(!hidden.to_string().contains("input_value"));
    }

    #[test]
    fn test_schema_errors() {
        let bad_pattern = Signature::new([Param::keyword(
            "code",
            TypeHint::constr(Constraints::new().pattern("(")),
        )])
        .unwrap();
        let err = Validator::build("g", &bad_pattern, &ValidationSettings::default()).unwrap_err();
        assert!(err.message.starts_with("parameter 'code': invalid pattern '('"));

        let misplaced = Signature::new([Param::keyword(
            "n",
            TypeHint::annotated(TypeHint::Int, [Metadata::MinLength(1)]),
        )])
        .unwrap();
        let err = Validator::build("g", &misplaced, &ValidationSettings::default()).unwrap_err();
        assert_eq!(err.message, "parameter 'n': unknown constraint 'min_length' for type 'int'");
        assert_eq!(
            err.to_string(),
            "Error building validator for function 'g': parameter 'n': unknown constraint \
             'min_length' for type 'int'"
        );
    }
}
