use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to open dataset at {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed dataset row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: csv::Error,
    },
    #[error("dataset contains no listings")]
    Empty,
    #[error("no listing found for model {0:?}")]
    UnknownModel(String),
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("feature length mismatch: got {got}, expected {expected}")]
    Shape { got: usize, expected: usize },
    #[error("feature {index} ({name}) expects {expected}, got {got}")]
    Type {
        index: usize,
        name: String,
        expected: &'static str,
        got: &'static str,
    },
    #[error("feature order mismatch at position {index}: model declares {declared:?}, dashboard sends {sent:?}")]
    Order {
        index: usize,
        declared: String,
        sent: String,
    },
    #[error("model produced a non-finite score")]
    NonFinite,
    #[error("model backend failed: {0}")]
    Backend(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum SelectionError {
    #[error("kms_driven {0} is outside {min}..={max}", min = crate::types::KMS_MIN, max = crate::types::KMS_MAX)]
    KmsOutOfRange(u32),
    #[error("kms_driven {0} is not a multiple of {step}", step = crate::types::KMS_STEP)]
    KmsOffStep(u32),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not a valid {expected}: {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}
