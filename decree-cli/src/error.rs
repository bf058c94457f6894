//! Errors raised while loading and compiling a manifest

use std::path::PathBuf;

use decree::{CompilationError, DecreeError, HintParseError, RegistrationError};
use decree_common::{ErrorSeverity, Severity};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("unsupported manifest format '{extension}', use .yaml, .yml, .json or .toml")]
    UnsupportedFormat { extension: String },

    #[error("invalid manifest {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<figment::Error>,
    },

    #[error("parameter '{param}' of '{command}': {source}")]
    Hint {
        command: String,
        param: String,
        #[source]
        source: HintParseError,
    },

    #[error("manifest declares neither a command nor any commands or groups")]
    Empty,

    #[error(transparent)]
    Compilation(#[from] CompilationError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

impl Severity for ManifestError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Critical
    }
}

impl From<ManifestError> for DecreeError {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::Compilation(err) => DecreeError::Compilation(err),
            ManifestError::Registration(err) => DecreeError::Registration(err),
            other => DecreeError::cli(other.to_string()),
        }
    }
}

pub type ManifestResult<T> = Result<T, ManifestError>;
