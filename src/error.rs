use std::path::PathBuf;

use thiserror::Error;

/// The primary error type for all operations in the `bethpack` crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The input bytes could not be classified as any known archive family.
    #[error("'{}' is not a recognized archive format", path.display())]
    FormatUnrecognized { path: PathBuf },

    /// A file object was offered to an archive of a different representation.
    #[error("cannot add a {file} file to a {archive} archive")]
    TypeMismatch {
        archive: &'static str,
        file: &'static str,
    },

    /// The stored version, the requested native token, and the held representation disagree.
    #[error("version {version} cannot be resolved as {requested} for a {archive} archive")]
    ConsistencyViolation {
        version: &'static str,
        requested: &'static str,
        archive: &'static str,
    },

    /// Reading an archive or a loose file failed.
    #[error("read failure on path '{}': {source}", path.display())]
    Read {
        source: std::io::Error,
        path: PathBuf,
    },

    /// Writing an archive or an extracted file failed.
    #[error("write failure on path '{}': {source}", path.display())]
    Write {
        source: std::io::Error,
        path: PathBuf,
    },

    /// The archive parsed as a known family but its contents are malformed.
    #[error("corrupt archive data: {0}")]
    InvalidData(String),

    /// A file offered for insertion does not live under the given root.
    #[error("could not strip prefix '{}' from path '{}'", prefix.display(), path.display())]
    StripPrefix { prefix: PathBuf, path: PathBuf },

    /// Walking a source directory failed.
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

/// Concrete failure kind, one per [`Error`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    FormatUnrecognized,
    TypeMismatch,
    ConsistencyViolation,
    ReadFailure,
    WriteFailure,
    InvalidData,
    StripPrefix,
    Walk,
}

/// Coarse classification of where a failure comes from.
///
/// Lets callers tell "bad archive or bad request" apart from "environment or library fault"
/// without matching every [`ErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureSource {
    /// The caller asked for something invalid, or handed us invalid data.
    BadUserInput,
    /// The system (filesystem, OS) failed, or an internal invariant broke.
    SystemError,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::FormatUnrecognized { .. } => ErrorKind::FormatUnrecognized,
            Error::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Error::ConsistencyViolation { .. } => ErrorKind::ConsistencyViolation,
            Error::Read { .. } => ErrorKind::ReadFailure,
            Error::Write { .. } => ErrorKind::WriteFailure,
            Error::InvalidData(_) => ErrorKind::InvalidData,
            Error::StripPrefix { .. } => ErrorKind::StripPrefix,
            Error::Walk(_) => ErrorKind::Walk,
        }
    }

    pub fn source_class(&self) -> FailureSource {
        match self.kind() {
            ErrorKind::FormatUnrecognized
            | ErrorKind::TypeMismatch
            | ErrorKind::InvalidData
            | ErrorKind::StripPrefix => FailureSource::BadUserInput,
            ErrorKind::ConsistencyViolation
            | ErrorKind::ReadFailure
            | ErrorKind::WriteFailure
            | ErrorKind::Walk => FailureSource::SystemError,
        }
    }

    pub(crate) fn read(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Error::Read {
            source,
            path: path.into(),
        }
    }

    pub(crate) fn write(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Error::Write {
            source,
            path: path.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
