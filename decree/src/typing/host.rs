//! Command-line primitive types
//!
//! A [`HostType`] is what the host toolkit needs to turn one raw token into a
//! value: how to display it (`INTEGER`, `[a|b|c]`, `[YYYY-MM-DD]`), how to
//! parse it, and which bounds to enforce while parsing.

use serde_json::Value;
use std::path::Path;

use super::hint::Numeric;
use super::temporal::{self, DATETIME_FORMAT, DATE_FORMAT, TIMEDELTA_FORMATS, TIME_FORMAT};

/// The four temporal types with dedicated formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateTimeKind {
    Date,
    Time,
    DateTime,
    TimeDelta,
}

impl DateTimeKind {
    pub fn name(&self) -> &'static str {
        match self {
            DateTimeKind::Date => "date",
            DateTimeKind::Time => "time",
            DateTimeKind::DateTime => "datetime",
            DateTimeKind::TimeDelta => "timedelta",
        }
    }

    pub fn formats(&self) -> Vec<String> {
        match self {
            DateTimeKind::Date => vec![DATE_FORMAT.to_string()],
            DateTimeKind::Time => vec![TIME_FORMAT.to_string()],
            DateTimeKind::DateTime => vec![DATETIME_FORMAT.to_string()],
            DateTimeKind::TimeDelta => TIMEDELTA_FORMATS.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Parse and normalize a raw token
    pub fn parse(&self, raw: &str) -> Result<Value, String> {
        match self {
            DateTimeKind::Date => temporal::parse_date(raw).map(temporal::date_value),
            DateTimeKind::Time => temporal::parse_time(raw).map(|t| temporal::time_value(&t)),
            DateTimeKind::DateTime => temporal::parse_datetime(raw).map(|dt| dt.to_value()),
            DateTimeKind::TimeDelta => temporal::parse_timedelta(raw).map(Value::from),
        }
    }
}

/// Numeric bounds; an absent bound is unbounded in that direction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericRange {
    pub min: Option<Numeric>,
    pub max: Option<Numeric>,
    pub min_open: bool,
    pub max_open: bool,
}

impl NumericRange {
    pub fn contains(&self, x: f64) -> bool {
        let above = match self.min {
            Some(min) if self.min_open => x > min.as_f64(),
            Some(min) => x >= min.as_f64(),
            None => true,
        };
        let below = match self.max {
            Some(max) if self.max_open => x < max.as_f64(),
            Some(max) => x <= max.as_f64(),
            None => true,
        };
        above && below
    }

    /// `x>0`, `x<=10`, `0<=x<10`
    pub fn describe(&self) -> String {
        match (self.min, self.max) {
            (None, Some(max)) => {
                let op = if self.max_open { "<" } else { "<=" };
                format!("x{op}{max}")
            }
            (Some(min), None) => {
                let op = if self.min_open { ">" } else { ">=" };
                format!("x{op}{min}")
            }
            (Some(min), Some(max)) => {
                let lop = if self.min_open { "<" } else { "<=" };
                let rop = if self.max_open { "<" } else { "<=" };
                format!("{min}{lop}x{rop}{max}")
            }
            (None, None) => String::new(),
        }
    }
}

/// Existence requirements checked while parsing a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSpec {
    pub exists: bool,
    pub file_okay: bool,
    pub dir_okay: bool,
}

impl Default for PathSpec {
    fn default() -> Self {
        Self {
            exists: false,
            file_okay: true,
            dir_okay: true,
        }
    }
}

/// A command-line primitive type
#[derive(Debug, Clone, PartialEq)]
pub enum HostType {
    String,
    Int,
    Float,
    Bool,
    Uuid,
    Path(PathSpec),
    Choice(Vec<String>),
    IntRange(NumericRange),
    FloatRange(NumericRange),
    DateTime {
        kind: DateTimeKind,
        formats: Vec<String>,
        show_formats: bool,
    },
    /// First member that parses wins; `None` members accept any string
    Union(Vec<Option<HostType>>),
    /// One value per position
    Tuple(Vec<Option<HostType>>),
}

impl HostType {
    pub fn datetime(kind: DateTimeKind, show_formats: bool) -> Self {
        HostType::DateTime {
            kind,
            formats: kind.formats(),
            show_formats,
        }
    }

    /// Uppercase type name, e.g. `INTEGER` or `FLOAT RANGE`
    pub fn name(&self) -> String {
        match self {
            HostType::String => "TEXT".to_string(),
            HostType::Int => "INTEGER".to_string(),
            HostType::Float => "FLOAT".to_string(),
            HostType::Bool => "BOOLEAN".to_string(),
            HostType::Uuid => "UUID".to_string(),
            HostType::Path(_) => "PATH".to_string(),
            HostType::Choice(_) => "CHOICE".to_string(),
            HostType::IntRange(_) => "INTEGER RANGE".to_string(),
            HostType::FloatRange(_) => "FLOAT RANGE".to_string(),
            HostType::DateTime { kind, .. } => kind.name().to_uppercase(),
            HostType::Union(_) => "UNION".to_string(),
            HostType::Tuple(members) => {
                let names: Vec<String> = members.iter().map(member_name).collect();
                format!("<{}>", names.join(" "))
            }
        }
    }

    /// Custom metavar, only for types that render their own
    pub fn metavar(&self) -> Option<String> {
        match self {
            HostType::Choice(choices) => Some(format!("[{}]", choices.join("|"))),
            HostType::DateTime {
                kind,
                formats,
                show_formats,
            } => Some(if *show_formats {
                format!("[{}]", formats.join("|"))
            } else {
                kind.name().to_uppercase()
            }),
            HostType::Union(members) => {
                let mut seen: Vec<String> = Vec::new();
                for member in members.iter().flatten() {
                    let metavar = member.metavar().unwrap_or_else(|| member.name());
                    if !seen.contains(&metavar) {
                        seen.push(metavar);
                    }
                }
                Some(seen.join(" | "))
            }
            _ => None,
        }
    }

    /// Metavar if the type has one, otherwise its name
    pub fn value_name(&self) -> String {
        self.metavar().unwrap_or_else(|| self.name())
    }

    /// Number of tokens one occurrence consumes
    pub fn arity(&self) -> usize {
        match self {
            HostType::Tuple(members) => members.len(),
            _ => 1,
        }
    }

    /// Numeric types accept tokens that look like negative numbers
    pub fn is_numeric(&self) -> bool {
        match self {
            HostType::Int | HostType::Float | HostType::IntRange(_) | HostType::FloatRange(_) => true,
            HostType::Union(members) | HostType::Tuple(members) => {
                members.iter().flatten().any(HostType::is_numeric)
            }
            _ => false,
        }
    }

    pub fn range(&self) -> Option<&NumericRange> {
        match self {
            HostType::IntRange(range) | HostType::FloatRange(range) => Some(range),
            _ => None,
        }
    }

    pub fn choices(&self) -> Option<&[String]> {
        match self {
            HostType::Choice(choices) => Some(choices),
            _ => None,
        }
    }

    /// Convert one raw token, reporting a human readable reason on failure
    pub fn parse(&self, raw: &str) -> Result<Value, String> {
        match self {
            HostType::String => Ok(Value::String(raw.to_string())),
            HostType::Int => parse_int(raw),
            HostType::Float => parse_float(raw),
            HostType::Bool => parse_bool(raw)
                .map(Value::Bool)
                .ok_or_else(|| format!("{raw:?} is not a valid boolean.")),
            HostType::Uuid => uuid::Uuid::parse_str(raw.trim())
                .map(|u| Value::String(u.hyphenated().to_string()))
                .map_err(|_| format!("{raw:?} is not a valid UUID.")),
            HostType::Path(spec) => check_path(spec, raw).map(|()| Value::String(raw.to_string())),
            HostType::Choice(choices) => {
                if choices.iter().any(|c| c == raw) {
                    Ok(Value::String(raw.to_string()))
                } else {
                    let quoted: Vec<String> = choices.iter().map(|c| format!("{c:?}")).collect();
                    Err(format!("{raw:?} is not one of {}.", quoted.join(", ")))
                }
            }
            HostType::IntRange(range) => {
                let value = parse_int(raw)?;
                check_range(range, &value, raw)
            }
            HostType::FloatRange(range) => {
                let value = parse_float(raw)?;
                check_range(range, &value, raw)
            }
            HostType::DateTime { kind, formats, .. } => kind.parse(raw).map_err(|_| {
                let plural = if formats.len() == 1 { "" } else { "s" };
                format!(
                    "{raw:?} does not match the format{plural} {}.",
                    formats
                        .iter()
                        .map(|f| format!("{f:?}"))
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }),
            HostType::Union(members) => {
                for member in members {
                    match member {
                        None => return Ok(Value::String(raw.to_string())),
                        Some(host) => {
                            if let Ok(value) = host.parse(raw) {
                                return Ok(value);
                            }
                        }
                    }
                }
                Err(format!(
                    "{raw:?} does not match any of {}.",
                    self.metavar().unwrap_or_default()
                ))
            }
            HostType::Tuple(_) => self.parse_tuple(&[raw]),
        }
    }

    /// Convert one occurrence of a tuple-typed value, position by position
    pub fn parse_tuple(&self, raw: &[&str]) -> Result<Value, String> {
        let HostType::Tuple(members) = self else {
            return Err("not a tuple type".to_string());
        };
        if raw.len() != members.len() {
            return Err(format!(
                "{} values are required, but {} were given.",
                members.len(),
                raw.len()
            ));
        }
        members
            .iter()
            .zip(raw)
            .map(|(member, token)| match member {
                Some(host) => host.parse(token),
                None => Ok(Value::String(token.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }
}

fn member_name(member: &Option<HostType>) -> String {
    member
        .as_ref()
        .map(HostType::name)
        .unwrap_or_else(|| "TEXT".to_string())
}

fn parse_int(raw: &str) -> Result<Value, String> {
    raw.trim()
        .parse::<i64>()
        .map(Value::from)
        .map_err(|_| format!("{raw:?} is not a valid integer."))
}

fn parse_float(raw: &str) -> Result<Value, String> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(|f| serde_json::Number::from_f64(f).map(Value::Number))
        .ok_or_else(|| format!("{raw:?} is not a valid float."))
}

/// Boolean words accepted on the command line
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn check_range(range: &NumericRange, value: &Value, raw: &str) -> Result<Value, String> {
    let x = value.as_f64().unwrap_or(f64::NAN);
    if range.contains(x) {
        Ok(value.clone())
    } else {
        Err(format!("{} is not in the range {}.", raw.trim(), range.describe()))
    }
}

fn check_path(spec: &PathSpec, raw: &str) -> Result<(), String> {
    let path = Path::new(raw);
    if !path.exists() {
        if spec.exists {
            return Err(format!("Path {raw:?} does not exist."));
        }
        return Ok(());
    }
    if !spec.file_okay && path.is_file() {
        return Err(format!("Directory {raw:?} is a file."));
    }
    if !spec.dir_okay && path.is_dir() {
        return Err(format!("File {raw:?} is a directory."));
    }
    Ok(())
}
