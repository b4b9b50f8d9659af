//! Error types shared by every layer of the crate.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A source specifier could not be located.
    #[error("cannot resolve configuration source '{spec}': {reason}")]
    SourceResolution { spec: String, reason: String },

    /// A located source could not be parsed.
    #[error("cannot parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("cannot serialize namespace to {}: {reason}", path.display())]
    Serialize { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Mutation of a frozen namespace.
    #[error("cannot modify '{path}': namespace is frozen")]
    ImmutableModification { path: String },

    #[error("key '{path}' not found")]
    MissingKey { path: String },

    /// A namespace was expected at `path` but a plain value lives there.
    #[error("'{path}' holds a value that is not a namespace")]
    MergeConflict { path: String },

    #[error("registry key '{key}' not found in environment or {}", registry.display())]
    RegistryKeyNotFound { key: String, registry: PathBuf },

    #[error("cannot format '{template}': {reason}")]
    Format { template: String, reason: String },

    /// Malformed command line or an explicit help/version request.
    #[error(transparent)]
    Usage(#[from] clap::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }

    pub(crate) fn resolution(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::SourceResolution { spec: spec.into(), reason: reason.into() }
    }

    pub(crate) fn frozen(path: impl Into<String>) -> Self {
        Error::ImmutableModification { path: path.into() }
    }

    pub(crate) fn missing(path: impl Into<String>) -> Self {
        Error::MissingKey { path: path.into() }
    }

    pub(crate) fn conflict(path: impl Into<String>) -> Self {
        Error::MergeConflict { path: path.into() }
    }
}
