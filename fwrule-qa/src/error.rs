//! Error types for rule validation

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, QaError>;

#[derive(Debug, Error)]
pub enum QaError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Failed to load config from {path}: {source}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to load records from {path}: {source}")]
    RecordLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse records in {path}: {source}")]
    RecordParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize report: {0}")]
    ReportSerialize(#[from] toml::ser::Error),

    #[error("Failed to write report to {path}: {source}")]
    ReportWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Preconditions that must hold before any candidate is evaluated
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("No protected supernets configured")]
    EmptySupernets,

    #[error("Invalid protected supernet: {cidr}")]
    InvalidSupernet { cidr: String },

    #[error("Reference rule set is empty ({loaded} rows loaded, {skipped} skipped)")]
    EmptyReferenceSet { loaded: usize, skipped: usize },

    #[error("No reference rule file configured")]
    MissingReference,

    #[error("Exempt protocol names must not be empty")]
    EmptyExemptProtocol,

    #[error("Column name {name:?} is used for more than one field")]
    DuplicateColumn { name: String },
}

/// Failure to turn one raw record into a rule. Recovered per row.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("{field}: column missing")]
    MissingField { field: String },

    #[error("{field}: field is empty")]
    EmptyField { field: String },

    #[error("{field}: invalid network {token:?}")]
    InvalidNetwork { field: String, token: String },

    #[error("{field}: {token:?} does not match the address family of the rest of the rule")]
    MixedFamily { field: String, token: String },

    #[error("{field}: invalid port {token:?}")]
    InvalidPort { field: String, token: String },

    #[error("{field}: port range {token:?} has low > high")]
    InvertedRange { field: String, token: String },
}
