use serde::Serialize;

use crate::engine::EngineError;

/// Response body shape shared by every endpoint: `{ status, message, data }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(status: u16, data: T) -> Self {
        Self {
            status,
            message: "success".to_string(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            data: None,
        }
    }

    /// Server-side failures are reported with a generic message.
    pub fn from_error(err: &EngineError) -> Self {
        Self::error(err.status_code(), err.public_message())
    }
}
