use std::fmt::{Display, Formatter};

use roster_states::AsyncResult;
use thiserror::Error;
use tokio::task::JoinError;

/// A single rejected form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Validation failed for {} field(s)", .0.len())]
    ValidationFailed(Vec<FieldError>),
    #[error("Communication error: {0}")]
    Communication(String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_argument(what: impl Into<String>) -> Self {
        Self::InvalidArgument(what.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Text shown to the user: field messages one per line for validation
    /// failures, the generic `fallback` for everything else.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::ValidationFailed(fields) => fields
                .iter()
                .map(|field| field.message.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            _ => fallback.to_owned(),
        }
    }
}

impl From<JoinError> for Error {
    fn from(e: JoinError) -> Self {
        Self::Communication(format!("Background task failed: {e}"))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(e.to_string())
        } else {
            Self::Communication(e.to_string())
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Deferred work of the data and use-case layers.
pub type Deferred<T> = AsyncResult<T, Error>;
