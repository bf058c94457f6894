//! Per-type value checks
//!
//! [`Checker`] walks a [`TypeHint`] alongside a JSON value, coercing where lax
//! mode allows it and recording an [`ErrorDetail`] for every failure. Each
//! check returns the normalized value, or `None` once an error was recorded.

use regex::Regex;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

use super::error::{plural, ErrorDetail, LocItem};
use crate::typing::temporal;
use crate::typing::{
    parse_bool, repr, value_token, CollectionKind, Metadata, NamedTupleType, Numeric, PathKind,
    TypeHint,
};

/// Compiled `pattern` constraints, keyed by their source
pub(crate) type Patterns = HashMap<String, Regex>;

pub(crate) struct Checker<'a> {
    strict: bool,
    patterns: &'a Patterns,
    pub(crate) errors: Vec<ErrorDetail>,
}

fn child(loc: &[LocItem], item: impl Into<LocItem>) -> Vec<LocItem> {
    let mut loc = loc.to_vec();
    loc.push(item.into());
    loc
}

fn float_value(x: f64) -> Option<Value> {
    serde_json::Number::from_f64(x).map(Value::Number)
}

/// `'a', 'b' or 'c'`
fn expected(values: &[Value]) -> String {
    let rendered: Vec<String> = values.iter().map(repr).collect();
    match rendered.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} or {last}", rest.join(", ")),
        Some((last, _)) => last.clone(),
        None => String::new(),
    }
}

fn capitalized(kind: CollectionKind) -> &'static str {
    match kind {
        CollectionKind::List => "List",
        CollectionKind::Set => "Set",
        CollectionKind::FrozenSet => "Frozenset",
        CollectionKind::Deque => "Deque",
        CollectionKind::VarTuple => "Tuple",
    }
}

impl<'a> Checker<'a> {
    pub(crate) fn new(strict: bool, patterns: &'a Patterns) -> Self {
        Self {
            strict,
            patterns,
            errors: Vec::new(),
        }
    }

    fn fail(&mut self, loc: &[LocItem], kind: &'static str, msg: impl Into<String>, input: &Value) -> Option<Value> {
        self.errors
            .push(ErrorDetail::new(loc.to_vec(), kind, msg, input.clone()));
        None
    }

    pub(crate) fn check(&mut self, hint: &TypeHint, value: &Value, loc: &[LocItem]) -> Option<Value> {
        match hint {
            TypeHint::Any | TypeHint::Context => Some(value.clone()),
            TypeHint::None => match value {
                Value::Null => Some(Value::Null),
                _ => self.fail(loc, "none_required", "Input should be None", value),
            },
            TypeHint::Str => self.string(value, loc),
            TypeHint::Int => self.int(value, loc),
            TypeHint::Float | TypeHint::Decimal => self.float(value, loc),
            TypeHint::Bool => self.bool(value, loc),
            TypeHint::Uuid => self.uuid(value, loc),
            TypeHint::Path => match value {
                Value::String(_) => Some(value.clone()),
                _ => self.fail(loc, "path_type", "Input is not a valid path", value),
            },
            TypeHint::Date => self.temporal(value, loc, "date_parsing", "Input should be a valid date", |raw| {
                temporal::parse_date(raw).map(temporal::date_value)
            }),
            TypeHint::Time => self.temporal(
                value,
                loc,
                "time_parsing",
                "Input should be in a valid time format",
                |raw| temporal::parse_time(raw).map(|t| temporal::time_value(&t)),
            ),
            TypeHint::DateTime => self.temporal(
                value,
                loc,
                "datetime_parsing",
                "Input should be a valid datetime",
                |raw| temporal::parse_datetime(raw).map(|dt| dt.to_value()),
            ),
            TypeHint::TimeDelta => self.timedelta(value, loc),
            TypeHint::Enum(e) => {
                let values: Vec<Value> = e.values().cloned().collect();
                self.choice(&values, value, loc, "enum")
            }
            TypeHint::Literal(values) => self.choice(values, value, loc, "literal_error"),
            TypeHint::Union(members) => self.union(members, value, loc),
            TypeHint::Tuple(members) => self.tuple(members, value, loc),
            TypeHint::Collection(kind, element) => {
                let element = element.as_deref().unwrap_or(&TypeHint::Any);
                self.collection(*kind, element, value, loc)
            }
            TypeHint::NamedTuple(named) => self.named_tuple(named, value, loc),
            TypeHint::Annotated(inner, metadata) => {
                let checked = self.check(inner, value, loc)?;
                self.constrain(inner, metadata, checked, loc)
            }
            TypeHint::Extra(extra) => match extra.validate(value) {
                Ok(valid) => Some(valid),
                Err(msg) => self.fail(loc, "value_error", msg, value),
            },
        }
    }

    fn string(&mut self, value: &Value, loc: &[LocItem]) -> Option<Value> {
        match value {
            Value::String(_) => Some(value.clone()),
            _ => self.fail(loc, "string_type", "Input should be a valid string", value),
        }
    }

    fn int(&mut self, value: &Value, loc: &[LocItem]) -> Option<Value> {
        match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(value.clone()),
            Value::Number(n) if !self.strict => {
                let x = n.as_f64().unwrap_or(f64::NAN);
                if !x.is_finite() || x < i64::MIN as f64 || x >= i64::MAX as f64 {
                    self.fail(
                        loc,
                        "int_parsing",
                        "Input should be a valid integer, unable to parse number as an integer",
                        value,
                    )
                } else if x.fract() == 0.0 {
                    Some(Value::from(x as i64))
                } else {
                    self.fail(
                        loc,
                        "int_from_float",
                        "Input should be a valid integer, got a number with a fractional part",
                        value,
                    )
                }
            }
            Value::String(s) if !self.strict => match s.trim().parse::<i64>() {
                Ok(i) => Some(Value::from(i)),
                Err(_) => self.fail(
                    loc,
                    "int_parsing",
                    "Input should be a valid integer, unable to parse string as an integer",
                    value,
                ),
            },
            Value::Bool(b) if !self.strict => Some(Value::from(i64::from(*b))),
            _ => self.fail(loc, "int_type", "Input should be a valid integer", value),
        }
    }

    fn float(&mut self, value: &Value, loc: &[LocItem]) -> Option<Value> {
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) if !self.strict => match s.trim().parse::<f64>() {
                Ok(x) => Some(x),
                Err(_) => {
                    return self.fail(
                        loc,
                        "float_parsing",
                        "Input should be a valid number, unable to parse string as a number",
                        value,
                    )
                }
            },
            Value::Bool(b) if !self.strict => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        };
        match parsed.and_then(float_value) {
            Some(valid) => Some(valid),
            None => self.fail(loc, "float_type", "Input should be a valid number", value),
        }
    }

    fn bool(&mut self, value: &Value, loc: &[LocItem]) -> Option<Value> {
        match value {
            Value::Bool(_) => Some(value.clone()),
            Value::Number(n) if !self.strict && (n.as_i64() == Some(0) || n.as_i64() == Some(1)) => {
                Some(Value::Bool(n.as_i64() == Some(1)))
            }
            Value::String(s) if !self.strict => match parse_bool(s) {
                Some(b) => Some(Value::Bool(b)),
                None => self.fail(
                    loc,
                    "bool_parsing",
                    "Input should be a valid boolean, unable to interpret input",
                    value,
                ),
            },
            Value::Number(_) if !self.strict => self.fail(
                loc,
                "bool_parsing",
                "Input should be a valid boolean, unable to interpret input",
                value,
            ),
            _ => self.fail(loc, "bool_type", "Input should be a valid boolean", value),
        }
    }

    fn uuid(&mut self, value: &Value, loc: &[LocItem]) -> Option<Value> {
        match value {
            Value::String(s) => match uuid::Uuid::parse_str(s.trim()) {
                Ok(u) => Some(Value::String(u.hyphenated().to_string())),
                Err(e) => self.fail(
                    loc,
                    "uuid_parsing",
                    format!("Input should be a valid UUID, {e}"),
                    value,
                ),
            },
            _ => self.fail(loc, "uuid_type", "UUID input should be a string", value),
        }
    }

    fn temporal<F>(&mut self, value: &Value, loc: &[LocItem], kind: &'static str, msg: &str, parse: F) -> Option<Value>
    where
        F: Fn(&str) -> Result<Value, String>,
    {
        match value {
            Value::String(s) => match parse(s) {
                Ok(valid) => Some(valid),
                Err(reason) => self.fail(loc, kind, format!("{msg}, {reason}"), value),
            },
            _ => self.fail(loc, kind, msg.to_string(), value),
        }
    }

    fn timedelta(&mut self, value: &Value, loc: &[LocItem]) -> Option<Value> {
        match value {
            Value::Number(n) => n.as_f64().and_then(float_value),
            Value::String(s) => match temporal::parse_timedelta(s) {
                Ok(seconds) => float_value(seconds),
                Err(reason) => self.fail(
                    loc,
                    "time_delta_parsing",
                    format!("Input should be a valid timedelta, {reason}"),
                    value,
                ),
            },
            _ => self.fail(loc, "time_delta_type", "Input should be a valid timedelta", value),
        }
    }

    fn choice(&mut self, values: &[Value], value: &Value, loc: &[LocItem], kind: &'static str) -> Option<Value> {
        if let Some(found) = values.iter().find(|v| *v == value) {
            return Some(found.clone());
        }
        if !self.strict {
            let token = value_token(value);
            if let Some(found) = values.iter().find(|v| value_token(v) == token) {
                return Some(found.clone());
            }
        }
        self.fail(loc, kind, format!("Input should be {}", expected(values)), value)
    }

    fn union(&mut self, members: &[TypeHint], value: &Value, loc: &[LocItem]) -> Option<Value> {
        let nullable = members.contains(&TypeHint::None);
        if nullable && value.is_null() {
            return Some(Value::Null);
        }
        let choices: Vec<&TypeHint> = members.iter().filter(|m| **m != TypeHint::None).collect();
        if let [only] = choices.as_slice() {
            return self.check(only, value, loc);
        }

        // exact matches first, then lax coercion in declaration order
        let modes: &[bool] = if self.strict { &[true] } else { &[true, false] };
        let mut failures = Vec::new();
        for &strict in modes {
            failures.clear();
            for member in &choices {
                let mut attempt = Checker::new(strict, self.patterns);
                match attempt.check(member, value, &child(loc, member.to_string().as_str())) {
                    Some(valid) => return Some(valid),
                    None => failures.extend(attempt.errors),
                }
            }
        }
        self.errors.extend(failures);
        None
    }

    fn items<'v>(&mut self, value: &'v Value, loc: &[LocItem], kind: &'static str, what: &str) -> Option<&'v [Value]> {
        match value {
            Value::Array(items) => Some(items),
            _ => {
                self.fail(loc, kind, format!("Input should be a valid {what}"), value);
                None
            }
        }
    }

    fn tuple(&mut self, members: &[TypeHint], value: &Value, loc: &[LocItem]) -> Option<Value> {
        let items = self.items(value, loc, "tuple_type", "tuple")?;
        if items.len() > members.len() {
            return self.fail(
                loc,
                "too_long",
                format!(
                    "Tuple should have at most {} item{} after validation, not {}",
                    members.len(),
                    plural(members.len()),
                    items.len()
                ),
                value,
            );
        }
        let before = self.errors.len();
        let mut output = Vec::with_capacity(members.len());
        for (i, member) in members.iter().enumerate() {
            match items.get(i) {
                Some(item) => output.extend(self.check(member, item, &child(loc, i))),
                None => {
                    self.fail(&child(loc, i), "missing", "Field required", value);
                }
            }
        }
        (self.errors.len() == before).then_some(Value::Array(output))
    }

    fn collection(&mut self, kind: CollectionKind, element: &TypeHint, value: &Value, loc: &[LocItem]) -> Option<Value> {
        let (error_kind, what) = match kind {
            CollectionKind::List => ("list_type", "list"),
            CollectionKind::Set => ("set_type", "set"),
            CollectionKind::FrozenSet => ("frozen_set_type", "frozenset"),
            CollectionKind::Deque => ("list_type", "list"),
            CollectionKind::VarTuple => ("tuple_type", "tuple"),
        };
        let items = self.items(value, loc, error_kind, what)?;
        let before = self.errors.len();
        let mut output: Vec<Value> = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            if let Some(valid) = self.check(element, item, &child(loc, i)) {
                if !kind.is_set() || !output.contains(&valid) {
                    output.push(valid);
                }
            }
        }
        (self.errors.len() == before).then_some(Value::Array(output))
    }

    fn named_tuple(&mut self, named: &NamedTupleType, value: &Value, loc: &[LocItem]) -> Option<Value> {
        let members: Vec<TypeHint> = named.fields.iter().map(|(_, hint)| hint.clone()).collect();
        let positional = match value {
            Value::Object(map) => Value::Array(
                named
                    .fields
                    .iter()
                    .map_while(|(name, _)| map.get(name).cloned())
                    .collect(),
            ),
            other => other.clone(),
        };
        let Value::Array(items) = self.tuple(&members, &positional, loc)? else {
            return None;
        };
        let record: Map<String, Value> = named
            .fields
            .iter()
            .map(|(name, _)| name.clone())
            .zip(items)
            .collect();
        Some(Value::Object(record))
    }

    fn constrain(&mut self, inner: &TypeHint, metadata: &[Metadata], value: Value, loc: &[LocItem]) -> Option<Value> {
        let before = self.errors.len();
        for constraint in metadata {
            match constraint {
                Metadata::Gt(bound) => self.bound(&value, loc, bound, Ordering::is_gt, "greater_than", "greater than"),
                Metadata::Ge(bound) => self.bound(
                    &value,
                    loc,
                    bound,
                    Ordering::is_ge,
                    "greater_than_equal",
                    "greater than or equal to",
                ),
                Metadata::Lt(bound) => self.bound(&value, loc, bound, Ordering::is_lt, "less_than", "less than"),
                Metadata::Le(bound) => self.bound(
                    &value,
                    loc,
                    bound,
                    Ordering::is_le,
                    "less_than_equal",
                    "less than or equal to",
                ),
                Metadata::MultipleOf(step) => {
                    let x = value.as_f64().unwrap_or(f64::NAN);
                    let divisor = step.as_f64();
                    let remainder = (x % divisor).abs();
                    if divisor != 0.0
                        && remainder > f64::EPSILON
                        && (divisor - remainder).abs() > f64::EPSILON
                    {
                        self.fail(
                            loc,
                            "multiple_of",
                            format!("Input should be a multiple of {step}"),
                            &value,
                        );
                    }
                }
                Metadata::MinLength(min) => self.length(inner, &value, loc, *min, true),
                Metadata::MaxLength(max) => self.length(inner, &value, loc, *max, false),
                Metadata::Pattern(pattern) => {
                    let text = value.as_str().unwrap_or_default();
                    if let Some(regex) = self.patterns.get(pattern) {
                        if !regex.is_match(text) {
                            self.fail(
                                loc,
                                "string_pattern_mismatch",
                                format!("String should match pattern '{pattern}'"),
                                &value,
                            );
                        }
                    }
                }
                Metadata::Path(kind) => self.path(*kind, &value, loc),
                Metadata::Past | Metadata::Future => self.moment(inner, constraint, &value, loc),
                Metadata::Counter => {}
            }
        }
        (self.errors.len() == before).then_some(value)
    }

    fn bound(
        &mut self,
        value: &Value,
        loc: &[LocItem],
        bound: &Numeric,
        holds: fn(Ordering) -> bool,
        kind: &'static str,
        relation: &str,
    ) {
        let ordering = match (value.as_i64(), bound) {
            (Some(i), Numeric::Int(b)) => Some(i.cmp(b)),
            _ => value.as_f64().unwrap_or(f64::NAN).partial_cmp(&bound.as_f64()),
        };
        let satisfied = ordering.is_some_and(holds);
        if !satisfied {
            self.fail(loc, kind, format!("Input should be {relation} {bound}"), value);
        }
    }

    fn length(&mut self, inner: &TypeHint, value: &Value, loc: &[LocItem], limit: usize, minimum: bool) {
        let (len, noun, text) = match (value, inner) {
            (Value::String(s), _) => (s.chars().count(), "String", true),
            (Value::Array(items), TypeHint::Collection(kind, _)) => (items.len(), capitalized(*kind), false),
            (Value::Array(items), _) => (items.len(), "Tuple", false),
            _ => return,
        };
        let violated = if minimum { len < limit } else { len > limit };
        if !violated {
            return;
        }
        let bound = if minimum { "at least" } else { "at most" };
        if text {
            let error_kind = if minimum { "string_too_short" } else { "string_too_long" };
            self.fail(
                loc,
                error_kind,
                format!("{noun} should have {bound} {limit} character{}", plural(limit)),
                value,
            );
        } else {
            let error_kind = if minimum { "too_short" } else { "too_long" };
            self.fail(
                loc,
                error_kind,
                format!(
                    "{noun} should have {bound} {limit} item{} after validation, not {len}",
                    plural(limit)
                ),
                value,
            );
        }
    }

    fn path(&mut self, kind: PathKind, value: &Value, loc: &[LocItem]) {
        let path = Path::new(value.as_str().unwrap_or_default());
        match kind {
            PathKind::File if !path.is_file() => {
                self.fail(loc, "path_not_file", "Path does not point to a file", value);
            }
            PathKind::Directory if !path.is_dir() => {
                self.fail(loc, "path_not_directory", "Path does not point to a directory", value);
            }
            PathKind::New if path.exists() => {
                self.fail(loc, "path_exists", "Path already exists", value);
            }
            PathKind::New => {
                let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
                if parent.is_some_and(|p| !p.is_dir()) {
                    self.fail(loc, "parent_does_not_exist", "Parent directory does not exist", value);
                }
            }
            _ => {}
        }
    }

    fn moment(&mut self, inner: &TypeHint, constraint: &Metadata, value: &Value, loc: &[LocItem]) {
        let text = value.as_str().unwrap_or_default();
        let ordering = match inner {
            TypeHint::Date => temporal::parse_date(text).ok().map(|d| d.cmp(&temporal::today())),
            TypeHint::DateTime => temporal::parse_datetime(text).ok().map(|dt| dt.cmp_now()),
            _ => None,
        };
        let Some(ordering) = ordering else {
            return;
        };
        let (noun, prefix) = match inner {
            TypeHint::Date => ("Date", "date"),
            _ => ("Input", "datetime"),
        };
        match constraint {
            Metadata::Past if !ordering.is_lt() => {
                let kind = if prefix == "date" { "date_past" } else { "datetime_past" };
                self.fail(loc, kind, format!("{noun} should be in the past"), value);
            }
            Metadata::Future if !ordering.is_gt() => {
                let kind = if prefix == "date" { "date_future" } else { "datetime_future" };
                self.fail(loc, kind, format!("{noun} should be in the future"), value);
            }
            _ => {}
        }
    }
}
