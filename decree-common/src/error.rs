//! Error severity classification for Decree
//!
//! Every public error type in the workspace implements [`Severity`] so that
//! callers (the CLI binary in particular) can pick a log level and an exit
//! strategy without matching on concrete variants.

/// Severity levels for error classification
///
/// - **Warning**: the operation was skipped or ignored, nothing failed.
///   Re-registering an already registered sub-group is a warning.
/// - **Error**: the operation failed but the process can continue, for example
///   a command-line value that did not validate.
/// - **Critical**: a declaration is broken and nothing built from it can run,
///   for example a counting marker on a positional parameter.
///
/// ```rust
/// use decree_common::ErrorSeverity;
///
/// let bad_input = ErrorSeverity::Error;
/// let bad_declaration = ErrorSeverity::Critical;
/// assert!(bad_declaration > bad_input);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Potential issue but operation can proceed
    Warning,

    /// Operation failed but the system can continue
    Error,

    /// Declaration is unusable, requires a code change
    Critical,
}

impl ErrorSeverity {
    /// Lowercase label used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Warning => "warning",
            ErrorSeverity::Error => "error",
            ErrorSeverity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for error types that have severity levels
///
/// ```rust
/// use decree_common::{ErrorSeverity, Severity};
///
/// #[derive(Debug)]
/// enum ManifestError {
///     Missing,
///     Malformed,
/// }
///
/// impl Severity for ManifestError {
///     fn severity(&self) -> ErrorSeverity {
///         match self {
///             ManifestError::Missing => ErrorSeverity::Error,
///             ManifestError::Malformed => ErrorSeverity::Critical,
///         }
///     }
/// }
///
/// assert_eq!(ManifestError::Malformed.severity(), ErrorSeverity::Critical);
/// ```
pub trait Severity {
    /// Get the severity level of this error
    fn severity(&self) -> ErrorSeverity;

    /// Whether the error indicates a broken declaration rather than bad input
    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(ErrorSeverity);

    impl Severity for Fixed {
        fn severity(&self) -> ErrorSeverity {
            self.0
        }
    }

    #[test]
    fn test_severity_ordering() {
        assert!(ErrorSeverity::Warning < ErrorSeverity::Error);
        assert!(ErrorSeverity::Error < ErrorSeverity::Critical);
    }

    #[test]
    fn test_is_critical_default_method() {
        assert!(Fixed(ErrorSeverity::Critical).is_critical());
        assert!(!Fixed(ErrorSeverity::Warning).is_critical());
    }

    #[test]
    fn test_display_uses_lowercase_label() {
        assert_eq!(ErrorSeverity::Warning.to_string(), "warning");
        assert_eq!(ErrorSeverity::Critical.to_string(), "critical");
    }
}
