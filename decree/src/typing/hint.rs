//! Semantic type annotations for function parameters
//!
//! [`TypeHint`] is the annotation attached to every [`crate::Param`]. It is a
//! closed sum type: scalars, choices, fixed and variable collections, unions,
//! and `Annotated` wrappers carrying constraint [`Metadata`]. The resolver in
//! [`crate::typing::resolve`] turns a hint into a [`crate::HostType`] for
//! parsing, and the validator in [`crate::validation`] checks values against
//! the same hint.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::extra::ExtraType;

/// A numeric bound or step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Int(i64),
    Float(f64),
}

impl Numeric {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Numeric::Int(i) => i as f64,
            Numeric::Float(f) => f,
        }
    }

    pub fn to_value(&self) -> Value {
        match *self {
            Numeric::Int(i) => Value::from(i),
            Numeric::Float(f) => Value::from(f),
        }
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Numeric::Int(i) => write!(f, "{i}"),
            Numeric::Float(x) => write!(f, "{x:?}"),
        }
    }
}

impl From<i64> for Numeric {
    fn from(value: i64) -> Self {
        Numeric::Int(value)
    }
}

impl From<i32> for Numeric {
    fn from(value: i32) -> Self {
        Numeric::Int(i64::from(value))
    }
}

impl From<f64> for Numeric {
    fn from(value: f64) -> Self {
        Numeric::Float(value)
    }
}

/// Path existence requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathKind {
    /// Must exist and be a file
    File,
    /// Must exist and be a directory
    Directory,
    /// Must not exist yet
    New,
}

/// Constraint metadata carried by [`TypeHint::Annotated`]
#[derive(Debug, Clone, PartialEq)]
pub enum Metadata {
    Gt(Numeric),
    Ge(Numeric),
    Lt(Numeric),
    Le(Numeric),
    MultipleOf(Numeric),
    MinLength(usize),
    MaxLength(usize),
    Pattern(String),
    Path(PathKind),
    Past,
    Future,
    /// Marks an integer option as counting repeated flags
    Counter,
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metadata::Gt(n) => write!(f, "gt={n}"),
            Metadata::Ge(n) => write!(f, "ge={n}"),
            Metadata::Lt(n) => write!(f, "lt={n}"),
            Metadata::Le(n) => write!(f, "le={n}"),
            Metadata::MultipleOf(n) => write!(f, "multiple_of={n}"),
            Metadata::MinLength(n) => write!(f, "min_length={n}"),
            Metadata::MaxLength(n) => write!(f, "max_length={n}"),
            Metadata::Pattern(p) => write!(f, "pattern={}", quote(p)),
            Metadata::Path(PathKind::File) => f.write_str("file"),
            Metadata::Path(PathKind::Directory) => f.write_str("dir"),
            Metadata::Path(PathKind::New) => f.write_str("new"),
            Metadata::Past => f.write_str("past"),
            Metadata::Future => f.write_str("future"),
            Metadata::Counter => f.write_str("counter"),
        }
    }
}

/// Optional constraints for `conint`, `confloat`, `constr` and `concounter`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub gt: Option<Numeric>,
    pub ge: Option<Numeric>,
    pub lt: Option<Numeric>,
    pub le: Option<Numeric>,
    pub multiple_of: Option<Numeric>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gt(mut self, value: impl Into<Numeric>) -> Self {
        self.gt = Some(value.into());
        self
    }

    pub fn ge(mut self, value: impl Into<Numeric>) -> Self {
        self.ge = Some(value.into());
        self
    }

    pub fn lt(mut self, value: impl Into<Numeric>) -> Self {
        self.lt = Some(value.into());
        self
    }

    pub fn le(mut self, value: impl Into<Numeric>) -> Self {
        self.le = Some(value.into());
        self
    }

    pub fn multiple_of(mut self, value: impl Into<Numeric>) -> Self {
        self.multiple_of = Some(value.into());
        self
    }

    pub fn min_length(mut self, value: usize) -> Self {
        self.min_length = Some(value);
        self
    }

    pub fn max_length(mut self, value: usize) -> Self {
        self.max_length = Some(value);
        self
    }

    pub fn pattern(mut self, value: impl Into<String>) -> Self {
        self.pattern = Some(value.into());
        self
    }

    pub fn into_metadata(self) -> Vec<Metadata> {
        let mut metadata = Vec::new();
        metadata.extend(self.gt.map(Metadata::Gt));
        metadata.extend(self.ge.map(Metadata::Ge));
        metadata.extend(self.lt.map(Metadata::Lt));
        metadata.extend(self.le.map(Metadata::Le));
        metadata.extend(self.multiple_of.map(Metadata::MultipleOf));
        metadata.extend(self.min_length.map(Metadata::MinLength));
        metadata.extend(self.max_length.map(Metadata::MaxLength));
        metadata.extend(self.pattern.map(Metadata::Pattern));
        metadata
    }
}

/// One member of an enumeration
#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub name: String,
    pub value: Value,
}

/// An enumeration: choices are rendered from the member values
#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    pub name: String,
    pub members: Vec<EnumMember>,
}

impl EnumType {
    /// Build an enumeration whose members are named after their values
    pub fn from_values(name: impl Into<String>, values: impl IntoIterator<Item = Value>) -> Self {
        let members = values
            .into_iter()
            .map(|value| EnumMember {
                name: value_token(&value).to_uppercase(),
                value,
            })
            .collect();
        Self {
            name: name.into(),
            members,
        }
    }

    pub fn with_member(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members.push(EnumMember {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.members.iter().map(|m| &m.value)
    }
}

/// A fixed-size record whose fields are supplied positionally
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTupleType {
    pub name: String,
    pub fields: Vec<(String, TypeHint)>,
}

/// Variable-length collection kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    List,
    Set,
    FrozenSet,
    Deque,
    /// `tuple[T, ...]`
    VarTuple,
}

impl CollectionKind {
    pub fn name(&self) -> &'static str {
        match self {
            CollectionKind::List => "list",
            CollectionKind::Set => "set",
            CollectionKind::FrozenSet => "frozenset",
            CollectionKind::Deque => "deque",
            CollectionKind::VarTuple => "tuple",
        }
    }

    /// Duplicate values collapse after validation
    pub fn is_set(&self) -> bool {
        matches!(self, CollectionKind::Set | CollectionKind::FrozenSet)
    }
}

/// The annotation of a function parameter
#[derive(Debug, Clone, PartialEq)]
pub enum TypeHint {
    Any,
    None,
    Str,
    Int,
    Float,
    Decimal,
    Bool,
    Uuid,
    Path,
    Date,
    Time,
    DateTime,
    TimeDelta,
    Enum(EnumType),
    Literal(Vec<Value>),
    Union(Vec<TypeHint>),
    /// Fixed-size tuple, one hint per position
    Tuple(Vec<TypeHint>),
    /// Variable-length collection; `None` element means unparameterized
    Collection(CollectionKind, Option<Box<TypeHint>>),
    NamedTuple(NamedTupleType),
    Annotated(Box<TypeHint>, Vec<Metadata>),
    Extra(ExtraType),
    /// The ambient invocation context
    Context,
}

impl TypeHint {
    pub fn list(element: TypeHint) -> Self {
        TypeHint::Collection(CollectionKind::List, Some(Box::new(element)))
    }

    pub fn set(element: TypeHint) -> Self {
        TypeHint::Collection(CollectionKind::Set, Some(Box::new(element)))
    }

    pub fn frozenset(element: TypeHint) -> Self {
        TypeHint::Collection(CollectionKind::FrozenSet, Some(Box::new(element)))
    }

    pub fn deque(element: TypeHint) -> Self {
        TypeHint::Collection(CollectionKind::Deque, Some(Box::new(element)))
    }

    /// `tuple[T, ...]`
    pub fn var_tuple(element: TypeHint) -> Self {
        TypeHint::Collection(CollectionKind::VarTuple, Some(Box::new(element)))
    }

    pub fn tuple(members: impl IntoIterator<Item = TypeHint>) -> Self {
        TypeHint::Tuple(members.into_iter().collect())
    }

    pub fn union(members: impl IntoIterator<Item = TypeHint>) -> Self {
        TypeHint::Union(members.into_iter().collect())
    }

    /// `Optional[T]`, a two-member union with `None`
    pub fn optional(inner: TypeHint) -> Self {
        TypeHint::Union(vec![inner, TypeHint::None])
    }

    pub fn literal(values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        TypeHint::Literal(values.into_iter().map(Into::into).collect())
    }

    pub fn enumeration(enum_type: EnumType) -> Self {
        TypeHint::Enum(enum_type)
    }

    pub fn named_tuple(
        name: impl Into<String>,
        fields: impl IntoIterator<Item = (impl Into<String>, TypeHint)>,
    ) -> Self {
        TypeHint::NamedTuple(NamedTupleType {
            name: name.into(),
            fields: fields.into_iter().map(|(n, h)| (n.into(), h)).collect(),
        })
    }

    /// Wrap in constraint metadata; nested `Annotated` wrappers are flattened
    pub fn annotated(inner: TypeHint, metadata: impl IntoIterator<Item = Metadata>) -> Self {
        match inner {
            TypeHint::Annotated(base, mut existing) => {
                existing.extend(metadata);
                TypeHint::Annotated(base, existing)
            }
            other => TypeHint::Annotated(Box::new(other), metadata.into_iter().collect()),
        }
    }

    pub fn positive_int() -> Self {
        Self::annotated(TypeHint::Int, [Metadata::Gt(Numeric::Int(0))])
    }

    pub fn negative_int() -> Self {
        Self::annotated(TypeHint::Int, [Metadata::Lt(Numeric::Int(0))])
    }

    pub fn non_negative_int() -> Self {
        Self::annotated(TypeHint::Int, [Metadata::Ge(Numeric::Int(0))])
    }

    pub fn non_positive_int() -> Self {
        Self::annotated(TypeHint::Int, [Metadata::Le(Numeric::Int(0))])
    }

    pub fn positive_float() -> Self {
        Self::annotated(TypeHint::Float, [Metadata::Gt(Numeric::Int(0))])
    }

    pub fn negative_float() -> Self {
        Self::annotated(TypeHint::Float, [Metadata::Lt(Numeric::Int(0))])
    }

    pub fn non_negative_float() -> Self {
        Self::annotated(TypeHint::Float, [Metadata::Ge(Numeric::Int(0))])
    }

    pub fn non_positive_float() -> Self {
        Self::annotated(TypeHint::Float, [Metadata::Le(Numeric::Int(0))])
    }

    pub fn file_path() -> Self {
        Self::annotated(TypeHint::Path, [Metadata::Path(PathKind::File)])
    }

    pub fn directory_path() -> Self {
        Self::annotated(TypeHint::Path, [Metadata::Path(PathKind::Directory)])
    }

    pub fn new_path() -> Self {
        Self::annotated(TypeHint::Path, [Metadata::Path(PathKind::New)])
    }

    pub fn past_date() -> Self {
        Self::annotated(TypeHint::Date, [Metadata::Past])
    }

    pub fn future_date() -> Self {
        Self::annotated(TypeHint::Date, [Metadata::Future])
    }

    pub fn past_datetime() -> Self {
        Self::annotated(TypeHint::DateTime, [Metadata::Past])
    }

    pub fn future_datetime() -> Self {
        Self::annotated(TypeHint::DateTime, [Metadata::Future])
    }

    pub fn conint(constraints: Constraints) -> Self {
        Self::annotated(TypeHint::Int, constraints.into_metadata())
    }

    pub fn confloat(constraints: Constraints) -> Self {
        Self::annotated(TypeHint::Float, constraints.into_metadata())
    }

    pub fn constr(constraints: Constraints) -> Self {
        Self::annotated(TypeHint::Str, constraints.into_metadata())
    }

    /// An integer option incremented by each repetition of its flag
    pub fn counter() -> Self {
        Self::annotated(TypeHint::Int, [Metadata::Counter])
    }

    /// A constrained counter, e.g. `concounter(Constraints::new().le(3))`
    pub fn concounter(constraints: Constraints) -> Self {
        let mut metadata = constraints.into_metadata();
        metadata.push(Metadata::Counter);
        Self::annotated(TypeHint::Int, metadata)
    }

    /// The bare type and the metadata of the immediately enclosing wrapper
    pub fn unwrap_annotated(&self) -> (&TypeHint, Option<&[Metadata]>) {
        match self {
            TypeHint::Annotated(inner, metadata) => (inner.as_ref(), Some(metadata.as_slice())),
            other => (other, None),
        }
    }

    /// The bare type with any metadata stripped
    pub fn base(&self) -> &TypeHint {
        self.unwrap_annotated().0
    }

    /// Element hint of a variable-length collection, `None` for anything else
    ///
    /// Fixed-size tuples and named tuples are not collections. An
    /// unparameterized collection yields [`TypeHint::Any`].
    pub fn collection_element(&self) -> Option<TypeHint> {
        match self.base() {
            TypeHint::Collection(_, element) => Some(
                element
                    .as_deref()
                    .cloned()
                    .unwrap_or(TypeHint::Any),
            ),
            _ => None,
        }
    }

    pub fn is_counter(&self) -> bool {
        match self {
            TypeHint::Annotated(inner, metadata) => {
                **inner == TypeHint::Int && metadata.contains(&Metadata::Counter)
            }
            _ => false,
        }
    }

    pub fn is_bool(&self) -> bool {
        *self.base() == TypeHint::Bool
    }

    /// Short type name used in error messages
    pub fn type_name(&self) -> String {
        match self.base() {
            TypeHint::Enum(e) => e.name.clone(),
            TypeHint::NamedTuple(n) => n.name.clone(),
            TypeHint::Collection(kind, _) => kind.name().to_string(),
            TypeHint::Tuple(_) => "tuple".to_string(),
            TypeHint::Union(_) => "union".to_string(),
            TypeHint::Literal(_) => "literal".to_string(),
            other => other.to_string(),
        }
    }
}

/// Render a JSON value as a plain command-line token
pub fn value_token(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Render a value the way validation messages echo inputs: `'text'`, `3`, `True`
pub fn repr(value: &Value) -> String {
    match value {
        Value::String(s) => quote(s),
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(repr).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", quote(k), repr(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

pub(crate) fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(items: &[TypeHint]) -> String {
            items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        }

        match self {
            TypeHint::Any => f.write_str("Any"),
            TypeHint::None => f.write_str("None"),
            TypeHint::Str => f.write_str("str"),
            TypeHint::Int => f.write_str("int"),
            TypeHint::Float => f.write_str("float"),
            TypeHint::Decimal => f.write_str("Decimal"),
            TypeHint::Bool => f.write_str("bool"),
            TypeHint::Uuid => f.write_str("UUID"),
            TypeHint::Path => f.write_str("Path"),
            TypeHint::Date => f.write_str("date"),
            TypeHint::Time => f.write_str("time"),
            TypeHint::DateTime => f.write_str("datetime"),
            TypeHint::TimeDelta => f.write_str("timedelta"),
            TypeHint::Context => f.write_str("Context"),
            TypeHint::Enum(e) => {
                let values: Vec<String> = e.values().map(repr).collect();
                write!(f, "Enum[{}, {}]", e.name, values.join(", "))
            }
            TypeHint::Literal(values) => {
                let values: Vec<String> = values.iter().map(repr).collect();
                write!(f, "Literal[{}]", values.join(", "))
            }
            TypeHint::Union(members) => match members.as_slice() {
                [inner, TypeHint::None] | [TypeHint::None, inner] => write!(f, "Optional[{inner}]"),
                _ => write!(f, "Union[{}]", join(members)),
            },
            TypeHint::Tuple(members) => write!(f, "tuple[{}]", join(members)),
            TypeHint::Collection(CollectionKind::VarTuple, Some(element)) => {
                write!(f, "tuple[{element}, ...]")
            }
            TypeHint::Collection(kind, Some(element)) => write!(f, "{}[{element}]", kind.name()),
            TypeHint::Collection(kind, None) => f.write_str(kind.name()),
            TypeHint::NamedTuple(n) => {
                let fields: Vec<String> = n
                    .fields
                    .iter()
                    .map(|(name, hint)| format!("{name}: {hint}"))
                    .collect();
                write!(f, "NamedTuple[{}, {}]", n.name, fields.join(", "))
            }
            TypeHint::Annotated(inner, metadata) => {
                let metadata: Vec<String> = metadata.iter().map(ToString::to_string).collect();
                write!(f, "Annotated[{inner}, {}]", metadata.join(", "))
            }
            TypeHint::Extra(extra) => f.write_str(extra.name()),
        }
    }
}

impl FromStr for TypeHint {
    type Err = super::parse::HintParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        super::parse::parse_hint(s)
    }
}

impl Serialize for TypeHint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TypeHint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_annotated_flattens_nested_wrappers() {
        let hint = TypeHint::annotated(TypeHint::positive_int(), [Metadata::Counter]);
        assert_eq!(
            hint,
            TypeHint::Annotated(
                Box::new(TypeHint::Int),
                vec![Metadata::Gt(Numeric::Int(0)), Metadata::Counter]
            )
        );
        assert!(hint.is_counter());
    }

    #[test]
    fn test_concounter_is_counter() {
        assert!(TypeHint::concounter(Constraints::new().le(3)).is_counter());
        assert!(TypeHint::counter().is_counter());
        assert!(!TypeHint::positive_int().is_counter());
        assert!(!TypeHint::Int.is_counter());
    }

    #[test]
    fn test_collection_element() {
        assert_eq!(
            TypeHint::list(TypeHint::Int).collection_element(),
            Some(TypeHint::Int)
        );
        assert_eq!(
            TypeHint::Collection(CollectionKind::Set, None).collection_element(),
            Some(TypeHint::Any)
        );
        assert_eq!(
            TypeHint::annotated(TypeHint::var_tuple(TypeHint::Str), [Metadata::MinLength(1)])
                .collection_element(),
            Some(TypeHint::Str)
        );
        assert_eq!(TypeHint::tuple([TypeHint::Int, TypeHint::Int]).collection_element(), None);
        assert_eq!(TypeHint::Str.collection_element(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(TypeHint::list(TypeHint::Int).to_string(), "list[int]");
        assert_eq!(TypeHint::var_tuple(TypeHint::Float).to_string(), "tuple[float, ...]");
        assert_eq!(TypeHint::optional(TypeHint::Str).to_string(), "Optional[str]");
        assert_eq!(
            TypeHint::literal(["a", "b"]).to_string(),
            "Literal['a', 'b']"
        );
        assert_eq!(TypeHint::positive_int().to_string(), "Annotated[int, gt=0]");
        assert_eq!(
            TypeHint::constr(Constraints::new().min_length(2).pattern("^a")).to_string(),
            "Annotated[str, min_length=2, pattern='^a']"
        );
    }

    #[test]
    fn test_repr() {
        assert_eq!(repr(&json!("invalid")), "'invalid'");
        assert_eq!(repr(&json!(1)), "1");
        assert_eq!(repr(&json!(true)), "True");
        assert_eq!(repr(&json!(null)), "None");
        assert_eq!(repr(&json!(["a", 2])), "['a', 2]");
        assert_eq!(repr(&json!("it's")), "'it\\'s'");
    }

    #[test]
    fn test_enum_from_values() {
        let e = EnumType::from_values("Color", [json!("red"), json!("green")]);
        assert_eq!(e.members[0].name, "RED");
        assert_eq!(e.values().cloned().collect::<Vec<_>>(), vec![json!("red"), json!("green")]);
    }
}
