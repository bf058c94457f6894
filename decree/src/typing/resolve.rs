//! Type resolution: [`TypeHint`] to [`HostType`]
//!
//! `None` means "no dedicated host type", in which case the token is passed
//! through as a string and left to the validator.

use decree_config::Config;

use super::hint::{Metadata, Numeric, PathKind, TypeHint};
use super::host::{DateTimeKind, HostType, NumericRange, PathSpec};

/// Resolve the host type used to parse a parameter's tokens
///
/// Fixed-size tuples and named tuples resolve to one host type per position.
/// Variable-length collections resolve to the host type of their element;
/// multiplicity is decided by the classifier, not here.
pub fn resolve(hint: &TypeHint, config: &Config) -> Option<HostType> {
    match hint.base() {
        TypeHint::Tuple(members) => Some(HostType::Tuple(
            members.iter().map(|m| resolve_type(m, config)).collect(),
        )),
        TypeHint::NamedTuple(named) => Some(HostType::Tuple(
            named
                .fields
                .iter()
                .map(|(_, field)| resolve_type(field, config))
                .collect(),
        )),
        TypeHint::Collection(_, Some(element)) => {
            resolve_type(element, config).or_else(|| resolve_type(hint, config))
        }
        _ => resolve_type(hint, config),
    }
}

/// Resolve a single (non-collection) hint
pub fn resolve_type(hint: &TypeHint, config: &Config) -> Option<HostType> {
    let (base, metadata) = hint.unwrap_annotated();
    if let Some(metadata) = metadata {
        if let Some(host) = resolve_annotated(base, metadata) {
            return Some(host);
        }
    }

    let show_formats = config.show_help_datetime_formats();
    match base {
        TypeHint::Literal(values) => Some(HostType::Choice(
            values.iter().map(super::hint::value_token).collect(),
        )),
        TypeHint::Union(members) => {
            if let [a, b] = members.as_slice() {
                match (a, b) {
                    (inner, TypeHint::None) | (TypeHint::None, inner) => {
                        return resolve(inner, config);
                    }
                    _ => {}
                }
            }
            Some(HostType::Union(
                members.iter().map(|m| resolve(m, config)).collect(),
            ))
        }
        TypeHint::Enum(e) => Some(HostType::Choice(
            e.values().map(super::hint::value_token).collect(),
        )),
        TypeHint::Date => Some(HostType::datetime(DateTimeKind::Date, show_formats)),
        TypeHint::Time => Some(HostType::datetime(DateTimeKind::Time, show_formats)),
        TypeHint::DateTime => Some(HostType::datetime(DateTimeKind::DateTime, show_formats)),
        TypeHint::TimeDelta => Some(HostType::datetime(DateTimeKind::TimeDelta, show_formats)),
        TypeHint::Extra(extra) => Some(extra.host_type()),
        TypeHint::Str => Some(HostType::String),
        TypeHint::Int => Some(HostType::Int),
        TypeHint::Float | TypeHint::Decimal => Some(HostType::Float),
        TypeHint::Bool => Some(HostType::Bool),
        TypeHint::Uuid => Some(HostType::Uuid),
        TypeHint::Path => Some(HostType::Path(PathSpec::default())),
        TypeHint::Any
        | TypeHint::None
        | TypeHint::Context
        | TypeHint::Tuple(_)
        | TypeHint::Collection(..)
        | TypeHint::NamedTuple(_)
        | TypeHint::Annotated(..) => None,
    }
}

/// Host types that only exist because of the enclosing metadata
fn resolve_annotated(base: &TypeHint, metadata: &[Metadata]) -> Option<HostType> {
    if let Some(range) = interval(metadata) {
        match base {
            TypeHint::Int => return Some(HostType::IntRange(range)),
            TypeHint::Float | TypeHint::Decimal => return Some(HostType::FloatRange(range)),
            _ => {}
        }
    }

    if *base == TypeHint::Path {
        let spec = metadata.iter().find_map(|m| match m {
            Metadata::Path(PathKind::File) => Some(PathSpec {
                exists: true,
                file_okay: true,
                dir_okay: false,
            }),
            Metadata::Path(PathKind::Directory) => Some(PathSpec {
                exists: true,
                file_okay: false,
                dir_okay: true,
            }),
            _ => None,
        });
        return Some(HostType::Path(spec.unwrap_or_default()));
    }

    None
}

/// Collapse bound metadata into one range: a closed bound replaces an open one
fn interval(metadata: &[Metadata]) -> Option<NumericRange> {
    let mut gt: Option<Numeric> = None;
    let mut ge: Option<Numeric> = None;
    let mut lt: Option<Numeric> = None;
    let mut le: Option<Numeric> = None;
    for m in metadata {
        match m {
            Metadata::Gt(n) => gt = Some(*n),
            Metadata::Ge(n) => ge = Some(*n),
            Metadata::Lt(n) => lt = Some(*n),
            Metadata::Le(n) => le = Some(*n),
            _ => {}
        }
    }
    if gt.is_none() && ge.is_none() && lt.is_none() && le.is_none() {
        return None;
    }

    let mut range = NumericRange::default();
    if let Some(n) = gt {
        range.min = Some(n);
        range.min_open = true;
    }
    if let Some(n) = ge {
        range.min = Some(n);
        range.min_open = false;
    }
    if let Some(n) = lt {
        range.max = Some(n);
        range.max_open = true;
    }
    if let Some(n) = le {
        range.max = Some(n);
        range.max_open = false;
    }
    Some(range)
}
