//! Error taxonomy for all repository operations.
//!
//! Each subsystem has its own error enum so callers can match narrowly;
//! everything converts into [`Error`] so they can also catch broadly.
//! Certain message substrings are part of the observable contract and
//! must not change: `"does not appear to be a git repository"`,
//! `"HEAD is not set"`, `"Failed to parse revision"`, and
//! `"Invalid object ID"`.

use std::path::PathBuf;

use thiserror::Error;

use crate::object::ParseIdError;

/// Umbrella error for every fallible operation in this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Object(#[from] ObjectError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Revision(#[from] RevisionError),
}

/// A specialized `Result` type for repository operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True if the error means "the thing you asked for does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::Object(ObjectError::NotFound(_)) | Error::Reference(ReferenceError::NotFound(_))
        )
    }

    /// True if the error means a writer lost a compare-and-set race.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Reference(ReferenceError::AlreadyExists(_)))
    }
}

/// Failures opening, initializing, or querying a repository as a whole.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("'{}' does not appear to be a git repository", .0.display())]
    NotARepository(PathBuf),

    #[error("HEAD is not set")]
    HeadNotSet,

    #[error("'{}' is already initialized with a different layout", .0.display())]
    LayoutMismatch(PathBuf),

    #[error("background task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures reading or writing objects in the object database.
#[derive(Debug, Error)]
pub enum ObjectError {
    #[error("object {0} not found")]
    NotFound(String),

    #[error("Invalid object ID: {0}")]
    InvalidId(#[from] ParseIdError),

    #[error("malformed object {id}: {reason}")]
    Malformed { id: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures resolving or mutating references.
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("reference '{0}' not found")]
    NotFound(String),

    #[error("reference cycle while resolving '{0}'")]
    Cycle(String),

    #[error("invalid reference name '{0}'")]
    InvalidName(String),

    #[error("invalid reference target '{0}'")]
    InvalidTarget(String),

    #[error("reference '{0}' already exists")]
    AlreadyExists(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures coercing configuration values to a requested type.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid boolean value '{value}' for key '{key}'")]
    InvalidBoolean { key: String, value: String },

    #[error("invalid integer value '{value}' for key '{key}'")]
    InvalidInteger { key: String, value: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures parsing revision specifiers or walking commit ancestry.
#[derive(Debug, Error)]
pub enum RevisionError {
    #[error("Failed to parse revision '{spec}': {reason}")]
    Parse { spec: String, reason: String },

    #[error("Invalid object ID: {0}")]
    InvalidId(String),

    #[error("no merge base found")]
    NoMergeBase,

    #[error("no commits provided")]
    EmptyInput,
}

impl RevisionError {
    pub(crate) fn parse(spec: &str, reason: impl Into<String>) -> RevisionError {
        RevisionError::Parse {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }
}
