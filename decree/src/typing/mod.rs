//! The type model
//!
//! Annotations ([`TypeHint`]) on one side, command-line primitives
//! ([`HostType`]) on the other, and the resolver between them.

pub mod defaults;
pub mod extra;
pub mod hint;
pub mod host;
pub mod parse;
pub mod resolve;
pub mod temporal;

pub use defaults::{convert_default, default_label};
pub use extra::ExtraType;
pub use hint::{
    repr, value_token, CollectionKind, Constraints, EnumMember, EnumType, Metadata,
    NamedTupleType, Numeric, PathKind, TypeHint,
};
pub use host::{parse_bool, DateTimeKind, HostType, NumericRange, PathSpec};
pub use parse::{parse_hint, HintParseError};
pub use resolve::{resolve, resolve_type};
