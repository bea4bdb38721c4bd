use thiserror::Error;
use ulid::Ulid;

use crate::catalog::CatalogError;
use crate::model::AppointmentStatus;

/// Message shown to callers in place of server-side failures.
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("appointment not found: {0}")]
    AppointmentNotFound(Ulid),
    #[error("book not found: {0}")]
    BookNotFound(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("book catalog failure: {0}")]
    Collaborator(CatalogError),
}

/// Coarse error taxonomy a transport layer maps to status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    LimitExceeded,
    InvalidArgument,
    CollaboratorFailure,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::LimitExceeded => "limit_exceeded",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::CollaboratorFailure => "collaborator_failure",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Client,
    Server,
}

impl EngineError {
    pub(crate) fn book_unavailable() -> Self {
        EngineError::InvalidState("book not available".into())
    }

    pub(crate) fn wrong_status(op: &str, status: AppointmentStatus) -> Self {
        EngineError::InvalidState(format!("cannot {op} appointment in status {status}"))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::AppointmentNotFound(_) | EngineError::BookNotFound(_) => ErrorKind::NotFound,
            EngineError::InvalidState(_) => ErrorKind::InvalidState,
            EngineError::LimitExceeded(_) => ErrorKind::LimitExceeded,
            EngineError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            EngineError::Collaborator(_) => ErrorKind::CollaboratorFailure,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self.kind() {
            ErrorKind::CollaboratorFailure => ErrorClass::Server,
            _ => ErrorClass::Client,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::InvalidState | ErrorKind::LimitExceeded => 409,
            ErrorKind::InvalidArgument => 400,
            ErrorKind::CollaboratorFailure => 500,
        }
    }

    /// Client errors surface verbatim; server errors become a generic message.
    pub fn public_message(&self) -> String {
        match self.class() {
            ErrorClass::Client => self.to_string(),
            ErrorClass::Server => UNEXPECTED_ERROR_MESSAGE.to_string(),
        }
    }
}

impl From<CatalogError> for EngineError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NotFound(id) => EngineError::BookNotFound(id),
            other => EngineError::Collaborator(other),
        }
    }
}
