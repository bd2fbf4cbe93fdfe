use std::path::PathBuf;

use thiserror::Error;

/// A rule annotation that cannot be turned into guards.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleError {
    #[error("`nullable` and `not_null` cannot be combined")]
    ConflictingNullability,
    #[error("`{0}` is declared more than once")]
    Duplicate(&'static str),
    #[error("`{rule}` does not apply to type `{ty}`")]
    UnsupportedType { rule: &'static str, ty: String },
    #[error("`{rule}` needs at least one bound")]
    MissingBounds { rule: &'static str },
    #[error("`{rule}` bound {value} is not a valid {ty} value")]
    InvalidBound { rule: &'static str, ty: String, value: f64 },
    #[error("`{rule}` min {min} exceeds max {max}")]
    InvertedBounds { rule: &'static str, min: f64, max: f64 },
    #[error("`throw` and `return` cannot be combined")]
    ConflictingMarkers,
    #[error("exception type `{0}` is not a legal qualified name")]
    MalformedException(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("cannot parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// A host failed to honour an id it handed out itself.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    #[error("no type with id {0}")]
    UnknownType(usize),
    #[error("type #{ty} has no method #{index}")]
    UnknownMethod { ty: usize, index: usize },
    #[error("method {0} has no body to replace")]
    NoBody(String),
}

/// Unrecoverable for the compilation unit being processed.
#[derive(Debug, Error)]
pub enum SynthError {
    #[error("host inconsistency while processing {element}: {source}")]
    Host { element: String, source: HostError },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Synth(#[from] SynthError),
}

pub type Result<T> = std::result::Result<T, Error>;
