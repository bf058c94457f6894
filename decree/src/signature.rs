//! Function signatures
//!
//! A [`Signature`] is the ordered parameter list of a command body. It follows
//! the usual calling-convention rules: positional parameters first, then an
//! optional variadic positional, keyword-only parameters, and an optional
//! variadic keyword parameter last.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CompilationError;
use crate::typing::TypeHint;

/// Name of the leading parameter that receives the invocation context
pub const CONTEXT_PARAM: &str = "ctx";

/// How a parameter may be supplied by a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    PositionalOnly,
    PositionalOrKeyword,
    VarPositional,
    KeywordOnly,
    VarKeyword,
}

impl ParamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::PositionalOnly => "positional-only",
            ParamKind::PositionalOrKeyword => "positional or keyword",
            ParamKind::VarPositional => "variadic positional",
            ParamKind::KeywordOnly => "keyword-only",
            ParamKind::VarKeyword => "variadic keyword",
        }
    }

    /// Accepts a value by position
    pub fn is_positional(&self) -> bool {
        matches!(self, ParamKind::PositionalOnly | ParamKind::PositionalOrKeyword)
    }

    pub fn is_variadic(&self) -> bool {
        matches!(self, ParamKind::VarPositional | ParamKind::VarKeyword)
    }
}

/// One parameter of a [`Signature`]
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
    pub hint: TypeHint,
    /// `None` means the parameter is required
    pub default: Option<Value>,
}

impl Param {
    pub fn new(name: impl Into<String>, kind: ParamKind, hint: TypeHint) -> Self {
        Self {
            name: name.into(),
            kind,
            hint,
            default: None,
        }
    }

    pub fn positional(name: impl Into<String>, hint: TypeHint) -> Self {
        Self::new(name, ParamKind::PositionalOrKeyword, hint)
    }

    pub fn positional_only(name: impl Into<String>, hint: TypeHint) -> Self {
        Self::new(name, ParamKind::PositionalOnly, hint)
    }

    pub fn var_positional(name: impl Into<String>, hint: TypeHint) -> Self {
        Self::new(name, ParamKind::VarPositional, hint)
    }

    pub fn keyword(name: impl Into<String>, hint: TypeHint) -> Self {
        Self::new(name, ParamKind::KeywordOnly, hint)
    }

    pub fn var_keyword(name: impl Into<String>, hint: TypeHint) -> Self {
        Self::new(name, ParamKind::VarKeyword, hint)
    }

    /// The leading `ctx` parameter
    pub fn context() -> Self {
        Self::new(CONTEXT_PARAM, ParamKind::PositionalOrKeyword, TypeHint::Context)
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none() && !self.kind.is_variadic()
    }
}

/// An ordered, validated parameter list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    params: Vec<Param>,
}

impl Signature {
    /// Validate and build a signature
    ///
    /// # Errors
    ///
    /// Returns a [`CompilationError`] for duplicate names, parameters out of
    /// kind order, a required positional after a defaulted one, or a default
    /// on a variadic parameter.
    pub fn new(params: impl IntoIterator<Item = Param>) -> Result<Self, CompilationError> {
        let params: Vec<Param> = params.into_iter().collect();

        let mut seen: Vec<&str> = Vec::new();
        let mut last_kind: Option<ParamKind> = None;
        let mut defaulted_positional = false;

        for param in &params {
            if param.name.is_empty() {
                return Err(CompilationError::new("Parameter names may not be empty."));
            }
            if seen.contains(&param.name.as_str()) {
                return Err(CompilationError::new(format!(
                    "Duplicate parameter name '{}'.",
                    param.name
                )));
            }
            seen.push(&param.name);

            if let Some(last) = last_kind {
                if param.kind < last {
                    return Err(CompilationError::new(format!(
                        "Wrong parameter order: {} parameter '{}' before {} parameter.",
                        last.as_str(),
                        param.name,
                        param.kind.as_str()
                    )));
                }
                if param.kind.is_variadic() && param.kind == last {
                    return Err(CompilationError::new(format!(
                        "More than one {} parameter.",
                        param.kind.as_str()
                    )));
                }
            }
            last_kind = Some(param.kind);

            if param.kind.is_variadic() && param.default.is_some() {
                return Err(CompilationError::new(format!(
                    "Variadic parameter '{}' cannot have a default.",
                    param.name
                )));
            }
            if param.kind.is_positional() {
                if param.default.is_some() {
                    defaulted_positional = true;
                } else if defaulted_positional {
                    return Err(CompilationError::new(format!(
                        "Non-default parameter '{}' follows a default parameter.",
                        param.name
                    )));
                }
            }
        }

        Ok(Self { params })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The first parameter is literally named `ctx`
    pub fn passes_context(&self) -> bool {
        self.params.first().is_some_and(|p| p.name == CONTEXT_PARAM)
    }

    /// Names of the positional parameters, in order
    pub fn positional_names(&self) -> Vec<&str> {
        self.params
            .iter()
            .filter(|p| p.kind.is_positional())
            .map(|p| p.name.as_str())
            .collect()
    }

    pub fn var_positional(&self) -> Option<&Param> {
        self.params.iter().find(|p| p.kind == ParamKind::VarPositional)
    }

    pub fn var_keyword(&self) -> Option<&Param> {
        self.params.iter().find(|p| p.kind == ParamKind::VarKeyword)
    }
}

impl<'a> IntoIterator for &'a Signature {
    type Item = &'a Param;
    type IntoIter = std::slice::Iter<'a, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_signature() {
        let sig = Signature::new([
            Param::context(),
            Param::positional("a", TypeHint::Int),
            Param::positional("b", TypeHint::Int).with_default(1),
            Param::var_positional("rest", TypeHint::Str),
            Param::keyword("opt", TypeHint::Bool),
            Param::var_keyword("extra", TypeHint::Any),
        ])
        .unwrap();
        assert!(sig.passes_context());
        assert_eq!(sig.positional_names(), vec!["ctx", "a", "b"]);
        assert_eq!(sig.var_positional().map(|p| p.name.as_str()), Some("rest"));
        assert!(sig.get("a").unwrap().is_required());
        assert!(!sig.get("rest").unwrap().is_required());
    }

    #[test]
    fn test_context_must_come_first() {
        let sig = Signature::new([
            Param::positional("a", TypeHint::Int),
            Param::positional("ctx", TypeHint::Context),
        ])
        .unwrap();
        assert!(!sig.passes_context());
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let err = Signature::new([
            Param::positional("a", TypeHint::Int),
            Param::keyword("a", TypeHint::Int),
        ])
        .unwrap_err();
        assert_eq!(err.message(), "Duplicate parameter name 'a'.");
    }

    #[test]
    fn test_rejects_wrong_order() {
        let err = Signature::new([
            Param::keyword("k", TypeHint::Int),
            Param::positional("p", TypeHint::Int),
        ])
        .unwrap_err();
        assert!(err.message().starts_with("Wrong parameter order"));
    }

    #[test]
    fn test_rejects_required_after_default() {
        let err = Signature::new([
            Param::positional("a", TypeHint::Int).with_default(0),
            Param::positional("b", TypeHint::Int),
        ])
        .unwrap_err();
        assert!(err.message().contains("follows a default"));

        // keyword-only parameters have no such restriction
        assert!(Signature::new([
            Param::keyword("a", TypeHint::Int).with_default(0),
            Param::keyword("b", TypeHint::Int),
        ])
        .is_ok());
    }

    #[test]
    fn test_rejects_second_variadic() {
        assert!(Signature::new([
            Param::var_positional("a", TypeHint::Int),
            Param::var_positional("b", TypeHint::Int),
        ])
        .is_err());
    }
}
