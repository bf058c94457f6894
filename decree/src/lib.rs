//! # Decree
//!
//! Decree compiles typed function signatures into validated command-line
//! interfaces built on clap.
//!
//! A command body is described by a [`FunctionSpec`]: a [`Signature`] of
//! typed parameters, an optional docstring, and a handler. Compiling it into
//! a [`Command`] classifies each parameter as a positional argument or an
//! option, resolves its [`TypeHint`] to a command-line [`HostType`], and
//! wraps the handler so every call is structurally validated against the
//! original signature before the body runs. Commands are collected into
//! [`Group`]s, which can register other groups as sub-groups.
//!
//! ```
//! use decree::{Command, FunctionSpec, Param, Signature, TypeHint};
//! use serde_json::json;
//!
//! let f = FunctionSpec::new(
//!     "f",
//!     Signature::new(vec![
//!         Param::positional("arg1", TypeHint::Int),
//!         Param::keyword("arg2", TypeHint::Bool),
//!     ])
//!     .unwrap(),
//!     |_, call| Ok(json!([call.value("arg1"), call.value("arg2")])),
//! );
//! let command = Command::new(f).unwrap();
//! assert_eq!(command.run(["3", "--arg2"]).unwrap(), json!([3, true]));
//! ```
//!
//! ## Modules
//!
//! - [`signature`] and [`typing`] - the declaration model
//! - [`classify`] - arguments versus options
//! - [`validation`] and [`bridge`] - call-time validation and error rewriting
//! - [`command`] and [`group`] - compilation into clap commands
//! - [`run`] - entry points

pub mod bridge;
pub mod classify;
pub mod command;
pub mod context;
pub mod docstring;
pub mod error;
pub mod group;
pub mod host;
pub mod inflect;
pub mod metadata;
pub mod run;
pub mod signature;
pub mod styling;
pub mod typing;
pub mod validation;

pub use classify::{classify, Classification, ParameterSpec};
pub use command::{compile, Command, CommandBuilder, CommandSettings};
pub use context::{Call, Context};
pub use error::{CompilationError, DecreeError, RegistrationError, Result};
pub use group::{Descendant, Group, GroupBuilder, GroupSettings, RegistrationOutcome, Runnable};
pub use metadata::{CommandMetadata, FunctionSpec, Handler, ParamOverride};
pub use run::{run, run_standalone, run_with, RunOptions, Target};
pub use signature::{Param, ParamKind, Signature};
pub use typing::{parse_hint, Constraints, HintParseError, HostType, Metadata, TypeHint};

pub use decree_config::{config, Config, ConfigOverrides};
