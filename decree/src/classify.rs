//! Parameter classification
//!
//! One pass over a [`Signature`] sorts every exposed parameter into a
//! command-line argument or option and records how the host toolkit should
//! treat it: required or defaulted, single or repeated, counted, negatable,
//! documented. Type resolution happens later; classification only decides
//! which hint drives it (the element hint for collections).

use serde::Serialize;
use serde_json::Value;
use tracing::trace;

use decree_config::Config;

use crate::docstring::Docstring;
use crate::error::CompilationError;
use crate::inflect::{negate_alias, negate_option, optionize};
use crate::metadata::FunctionSpec;
use crate::signature::{Param, ParamKind};
use crate::typing::{convert_default, HostType, TypeHint};

const COUNTER_ON_ARGUMENT: &str = "Counting may only be used in conjunction with keyword-only \
     function parameters (command-line options), not positional function parameters \
     (command-line arguments).";

/// Metavar shown for counting options
pub const COUNT_METAVAR: &str = "COUNT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Argument,
    Option,
}

/// One flag of an option, with its negated counterpart if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagDecl {
    pub flag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negation: Option<String>,
}

impl FlagDecl {
    /// `--name` or `--name/--no-name`
    pub fn declaration(&self) -> String {
        match &self.negation {
            Some(negation) => format!("{}/{}", self.flag, negation),
            None => self.flag.clone(),
        }
    }

    pub fn is_long(&self) -> bool {
        self.flag.starts_with("--")
    }
}

/// A classified parameter, ready for type resolution and rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSpec {
    pub kind: ParameterKind,
    /// Name in the function signature
    pub param: String,
    /// Name after any rename
    pub name: String,
    /// Hint that drives type resolution (element hint for collections)
    #[serde(rename = "type")]
    pub hint: TypeHint,
    #[serde(skip)]
    pub host_type: Option<HostType>,
    /// Option flags, primary long flag first; empty for arguments
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<FlagDecl>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Repeatable option
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub multiple: bool,
    /// Argument consuming every remaining positional token
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub variadic: bool,
    /// Repeat-to-increment option
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub count: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub envvar: Option<String>,
    #[serde(skip)]
    pub show_default: bool,
    #[serde(skip)]
    pub show_envvar: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metavar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

impl ParameterSpec {
    fn new(kind: ParameterKind, param: &Param, name: &str, hint: TypeHint) -> Self {
        Self {
            kind,
            param: param.name.clone(),
            name: name.to_string(),
            hint,
            host_type: None,
            flags: Vec::new(),
            required: false,
            default: None,
            multiple: false,
            variadic: false,
            count: false,
            help: None,
            envvar: None,
            show_default: false,
            show_envvar: false,
            metavar: None,
            section: None,
        }
    }

    pub fn is_argument(&self) -> bool {
        self.kind == ParameterKind::Argument
    }

    pub fn is_option(&self) -> bool {
        self.kind == ParameterKind::Option
    }

    /// Affirmative flags, primary first
    pub fn opts(&self) -> Vec<&str> {
        self.flags.iter().map(|f| f.flag.as_str()).collect()
    }

    /// Negated flags, in the order of their affirmative counterparts
    pub fn secondary_opts(&self) -> Vec<&str> {
        self.flags.iter().filter_map(|f| f.negation.as_deref()).collect()
    }

    /// Rendered as a `--x/--no-x` pair
    pub fn is_negatable(&self) -> bool {
        self.flags.iter().any(|f| f.negation.is_some())
    }

    /// A boolean switch that takes no value
    pub fn is_flag(&self) -> bool {
        self.is_negatable()
    }

    /// Tokens consumed by one occurrence
    pub fn arity(&self) -> usize {
        self.host_type.as_ref().map_or(1, HostType::arity)
    }

    /// Sensitive input is redacted from validation errors
    pub fn is_sensitive(&self) -> bool {
        self.envvar.is_some()
    }

    /// Argument metavar the way usage lines show it: `NAME`, `[NAME]...`
    pub fn make_metavar(&self) -> String {
        let mut var = self.metavar.clone().unwrap_or_else(|| {
            self.host_type
                .as_ref()
                .and_then(HostType::metavar)
                .unwrap_or_else(|| self.name.to_uppercase())
        });
        if !self.required {
            var = format!("[{var}]");
        }
        if self.variadic || self.arity() != 1 {
            var.push_str("...");
        }
        var
    }

    /// Label used for this parameter in validation errors
    pub fn label(&self) -> String {
        match self.kind {
            ParameterKind::Argument => self.make_metavar(),
            ParameterKind::Option => self
                .flags
                .first()
                .map(|f| f.flag.clone())
                .unwrap_or_else(|| self.name.clone()),
        }
    }
}

/// Result of classifying one function
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// The leading `ctx` parameter receives the invocation context
    pub pass_context: bool,
    /// Exposed parameters in signature order
    pub parameters: Vec<ParameterSpec>,
}

impl Classification {
    pub fn arguments(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters.iter().filter(|p| p.is_argument())
    }

    pub fn options(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters.iter().filter(|p| p.is_option())
    }

    pub fn get(&self, param: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.param == param)
    }
}

/// Classify every parameter of a function
///
/// The leading context parameter, variadic keyword parameters and parameters
/// claimed by an override are not classified.
///
/// # Errors
///
/// A counting hint on a positional or variadic positional parameter.
pub fn classify(function: &FunctionSpec, config: &Config) -> Result<Classification, CompilationError> {
    let signature = function.signature();
    let metadata = function.metadata();
    let doc = function
        .docstring()
        .map(Docstring::parse)
        .unwrap_or_default();
    let pass_context = signature.passes_context();

    let mut parameters = Vec::new();
    for (i, param) in signature.iter().enumerate() {
        if pass_context && i == 0 {
            continue;
        }
        if param.kind == ParamKind::VarKeyword || function.override_for(&param.name).is_some() {
            continue;
        }

        let name = metadata.param_name(&param.name);
        let mut spec = match param.kind {
            ParamKind::PositionalOnly | ParamKind::PositionalOrKeyword => {
                let (hint, variadic) = match param.hint.collection_element() {
                    Some(element) => (element, true),
                    None => (param.hint.clone(), false),
                };
                if hint.is_counter() {
                    return Err(CompilationError::new(COUNTER_ON_ARGUMENT));
                }
                let mut spec = ParameterSpec::new(ParameterKind::Argument, param, name, hint);
                spec.variadic = variadic;
                match &param.default {
                    None => spec.required = true,
                    Some(default) => spec.default = Some(convert_default(&param.hint, default)),
                }
                spec
            }
            ParamKind::VarPositional => {
                if param.hint.is_counter() {
                    return Err(CompilationError::new(COUNTER_ON_ARGUMENT));
                }
                let mut spec =
                    ParameterSpec::new(ParameterKind::Argument, param, name, param.hint.clone());
                spec.variadic = true;
                spec
            }
            ParamKind::KeywordOnly => {
                let (hint, multiple) = match param.hint.collection_element() {
                    Some(element) => (element, true),
                    None => (param.hint.clone(), false),
                };
                let mut spec = ParameterSpec::new(ParameterKind::Option, param, name, hint);
                spec.multiple = multiple;
                if spec.hint.is_counter() {
                    spec.count = true;
                    spec.metavar = Some(COUNT_METAVAR.to_string());
                }

                let negate = spec.hint.is_bool() && config.negate_flags();
                let option = optionize(name);
                spec.flags.push(FlagDecl {
                    negation: negate.then(|| negate_option(&option)),
                    flag: option,
                });
                for alias in metadata.aliases.get(&param.name).into_iter().flatten() {
                    spec.flags.push(FlagDecl {
                        flag: alias.clone(),
                        negation: negate.then(|| negate_alias(alias)),
                    });
                }

                if let Some(env) = metadata.envs.get(&param.name) {
                    spec.envvar = Some(env.clone());
                    spec.show_envvar = config.show_help_envvars();
                }

                match &param.default {
                    None => spec.required = true,
                    Some(default) => {
                        spec.show_default = config.show_help_defaults();
                        spec.default = Some(convert_default(&param.hint, default));
                    }
                }
                spec
            }
            ParamKind::VarKeyword => continue,
        };

        spec.help = doc.param(&param.name).map(str::to_string);
        spec.section = metadata.sections.get(&param.name).cloned();
        trace!(
            param = %param.name,
            kind = ?spec.kind,
            hint = %spec.hint,
            required = spec.required,
            "classified parameter"
        );
        parameters.push(spec);
    }

    Ok(Classification {
        pass_context,
        parameters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Signature;
    use crate::typing::{resolve, Constraints, EnumType};
    use decree_config::ConfigOverrides;
    use serde_json::json;

    fn function(params: Vec<Param>) -> FunctionSpec {
        FunctionSpec::new("f", Signature::new(params).unwrap(), |_, _| Ok(Value::Null))
    }

    fn classify_default(function: &FunctionSpec) -> Classification {
        classify(function, &Config::default()).unwrap()
    }

    #[test]
    fn test_arguments_and_options_in_signature_order() {
        let f = function(vec![
            Param::context(),
            Param::positional("arg1", TypeHint::Int),
            Param::keyword("arg2", TypeHint::Bool),
            Param::var_keyword("rest", TypeHint::Any),
        ]);
        let classified = classify_default(&f);
        assert!(classified.pass_context);
        assert_eq!(classified.arguments().count(), 1);
        assert_eq!(classified.options().count(), 1);

        let arg1 = classified.get("arg1").unwrap();
        assert!(arg1.required);
        assert_eq!(arg1.hint, TypeHint::Int);

        let arg2 = classified.get("arg2").unwrap();
        assert_eq!(arg2.flags[0].declaration(), "--arg2/--no-arg2");
        assert!(arg2.required);
        assert!(arg2.is_flag());
    }

    #[test]
    fn test_negation_can_be_disabled() {
        let f = function(vec![Param::keyword("dry_run", TypeHint::Bool).with_default(false)]);
        let config = Config::create(None, ConfigOverrides::new().negate_flags(false));
        let classified = classify(&f, &config).unwrap();
        let opt = classified.get("dry_run").unwrap();
        assert_eq!(opt.opts(), vec!["--dry-run"]);
        assert!(opt.secondary_opts().is_empty());
        assert!(!opt.is_flag());
    }

    #[test]
    fn test_aliases_are_negated_with_their_option() {
        let f = function(vec![Param::keyword("verbose", TypeHint::Bool).with_default(false)])
            .alias("verbose", ["-v"])
            .unwrap();
        let classified = classify_default(&f);
        let opt = classified.get("verbose").unwrap();
        let decls: Vec<String> = opt.flags.iter().map(FlagDecl::declaration).collect();
        assert_eq!(decls, vec!["--verbose/--no-verbose", "-v/--no-v"]);
        assert_eq!(opt.secondary_opts(), vec!["--no-verbose", "--no-v"]);
    }

    #[test]
    fn test_collections() {
        let f = function(vec![
            Param::positional("files", TypeHint::list(TypeHint::Path)),
            Param::keyword("tag", TypeHint::set(TypeHint::Str)).with_default(json!([])),
        ]);
        let classified = classify_default(&f);
        let files = classified.get("files").unwrap();
        assert!(files.variadic);
        assert_eq!(files.hint, TypeHint::Path);
        let tag = classified.get("tag").unwrap();
        assert!(tag.multiple);
        assert_eq!(tag.hint, TypeHint::Str);
        assert!(!tag.required);
    }

    #[test]
    fn test_counter_only_on_options() {
        let f = function(vec![Param::keyword("verbose", TypeHint::counter()).with_default(0)]);
        let classified = classify_default(&f);
        let opt = classified.get("verbose").unwrap();
        assert!(opt.count);
        assert_eq!(opt.metavar.as_deref(), Some("COUNT"));

        let f = function(vec![Param::positional("n", TypeHint::counter())]);
        let err = classify(&f, &Config::default()).unwrap_err();
        assert!(err.message().starts_with("Counting may only be used"));

        let f = function(vec![Param::var_positional(
            "n",
            TypeHint::concounter(Constraints::new().le(3)),
        )]);
        assert!(classify(&f, &Config::default()).is_err());
    }

    #[test]
    fn test_defaults_are_converted() {
        let level = TypeHint::Enum(
            EnumType::from_values("Level", Vec::<Value>::new())
                .with_member("LOW", "low")
                .with_member("HIGH", "high"),
        );
        let f = function(vec![Param::keyword("level", level).with_default("HIGH")]);
        let classified = classify_default(&f);
        let opt = classified.get("level").unwrap();
        assert_eq!(opt.default, Some(json!("high")));
        assert!(opt.show_default);

        let config = Config::create(None, ConfigOverrides::new().show_help_defaults(false));
        let classified = classify(&f, &config).unwrap();
        assert!(!classified.get("level").unwrap().show_default);
    }

    #[test]
    fn test_metadata_is_applied() {
        let f = function(vec![
            Param::positional("src", TypeHint::Str),
            Param::keyword("token", TypeHint::Str).with_default(""),
        ])
        .doc("Copy.\n\nArgs:\n    src: Source.\n    token: Secret.")
        .rename(None, [("src", "source"), ("token", "api_token")])
        .unwrap()
        .env("token", "API_TOKEN")
        .unwrap()
        .section("token", "Auth")
        .unwrap();
        let classified = classify_default(&f);

        let src = classified.get("src").unwrap();
        assert_eq!(src.name, "source");
        assert_eq!(src.help.as_deref(), Some("Source."));

        let token = classified.get("token").unwrap();
        assert_eq!(token.opts(), vec!["--api-token"]);
        assert_eq!(token.envvar.as_deref(), Some("API_TOKEN"));
        assert!(token.show_envvar);
        assert!(token.is_sensitive());
        assert_eq!(token.section.as_deref(), Some("Auth"));
        assert_eq!(token.help.as_deref(), Some("Secret."));
    }

    #[test]
    fn test_labels() {
        let f = function(vec![
            Param::positional("name", TypeHint::Str),
            Param::positional("mode", TypeHint::literal(["a", "b"])).with_default("a"),
            Param::var_positional("rest", TypeHint::Int),
            Param::keyword("limit", TypeHint::positive_int()),
        ]);
        let mut classified = classify_default(&f);
        for spec in &mut classified.parameters {
            spec.host_type = resolve(&spec.hint, &Config::default());
        }
        let labels: Vec<String> = classified.parameters.iter().map(ParameterSpec::label).collect();
        assert_eq!(labels, vec!["NAME", "[[a|b]]", "[REST]...", "--limit"]);
    }

    #[test]
    fn test_overridden_parameters_are_skipped() {
        let f = function(vec![
            Param::positional("n", TypeHint::counter()),
            Param::keyword("x", TypeHint::Int),
        ])
        .with_override(crate::metadata::ParamOverride::new(clap::Arg::new("n")));
        let classified = classify_default(&f);
        assert!(classified.get("n").is_none());
        assert!(classified.get("x").is_some());
    }
}
