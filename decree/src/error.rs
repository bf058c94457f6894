//! Error types for signature compilation and command invocation
//!
//! Declaration problems ([`CompilationError`], [`RegistrationError`]) surface
//! immediately where a command or group is built. Everything that can go wrong
//! while a command runs is a [`DecreeError`], whose [`DecreeError::exit_code`]
//! follows the clap conventions: `0` for help, `2` for usage errors, `1` for
//! everything else.

use decree_common::{ErrorSeverity, Severity};
use thiserror::Error;

/// A function, decorator or group declaration cannot be compiled
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CompilationError {
    message: String,
}

impl CompilationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A sub-group registration would make the group graph cyclic
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RegistrationError {
    message: String,
}

impl RegistrationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors raised while building or running a command
#[derive(Debug, Error)]
pub enum DecreeError {
    #[error(transparent)]
    Compilation(#[from] CompilationError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// The user supplied input that did not validate
    #[error("{message}")]
    Usage {
        message: String,
        /// Rendered usage line of the command that rejected the input
        usage: Option<String>,
    },

    /// The command itself is mis-declared (validator could not be built)
    #[error("{message}")]
    Cli { message: String },

    /// Raised by the host parser, including `--help` display
    #[error(transparent)]
    Parse(#[from] clap::Error),

    /// The command body returned an error
    #[error(transparent)]
    Handler(anyhow::Error),
}

impl DecreeError {
    pub fn usage(message: impl Into<String>) -> Self {
        DecreeError::Usage {
            message: message.into(),
            usage: None,
        }
    }

    pub fn cli(message: impl Into<String>) -> Self {
        DecreeError::Cli {
            message: message.into(),
        }
    }

    /// Attach the usage line of the command that produced a usage error
    pub fn with_usage(self, rendered: impl Into<String>) -> Self {
        match self {
            DecreeError::Usage { message, usage: None } => DecreeError::Usage {
                message,
                usage: Some(rendered.into()),
            },
            other => other,
        }
    }

    /// Process exit code following the host toolkit's conventions
    pub fn exit_code(&self) -> i32 {
        match self {
            DecreeError::Usage { .. } => 2,
            DecreeError::Parse(err) => err.exit_code(),
            DecreeError::Compilation(_)
            | DecreeError::Registration(_)
            | DecreeError::Cli { .. }
            | DecreeError::Handler(_) => 1,
        }
    }

    /// True for `--help` (and other informational displays) raised by clap
    pub fn is_display(&self) -> bool {
        matches!(self, DecreeError::Parse(err) if err.exit_code() == 0)
    }
}

impl Severity for CompilationError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Critical
    }
}

impl Severity for RegistrationError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Critical
    }
}

impl Severity for DecreeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            DecreeError::Compilation(_) | DecreeError::Registration(_) | DecreeError::Cli { .. } => {
                ErrorSeverity::Critical
            }
            DecreeError::Parse(err) if err.exit_code() == 0 => ErrorSeverity::Warning,
            DecreeError::Usage { .. } | DecreeError::Parse(_) | DecreeError::Handler(_) => {
                ErrorSeverity::Error
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, DecreeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(DecreeError::usage("bad").exit_code(), 2);
        assert_eq!(DecreeError::cli("broken").exit_code(), 1);
        assert_eq!(DecreeError::Handler(anyhow::anyhow!("boom")).exit_code(), 1);
        assert_eq!(
            DecreeError::from(CompilationError::new("nope")).exit_code(),
            1
        );
    }

    #[test]
    fn test_with_usage_only_applies_once() {
        let err = DecreeError::usage("bad").with_usage("Usage: f ARG").with_usage("other");
        match err {
            DecreeError::Usage { usage, .. } => assert_eq!(usage.as_deref(), Some("Usage: f ARG")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_severity() {
        assert_eq!(
            CompilationError::new("x").severity(),
            ErrorSeverity::Critical
        );
        assert_eq!(DecreeError::usage("x").severity(), ErrorSeverity::Error);
    }
}
