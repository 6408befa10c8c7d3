use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Conflict,
    NotFound,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Failures reported by the identity store and the session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Email already in use")]
    DuplicateEmail,
    #[error("User not found")]
    UserNotFound,
    #[error("No user logged in")]
    NotAuthenticated,
}

impl AuthError {
    pub fn code(self) -> ErrorCode {
        match self {
            Self::InvalidCredentials | Self::NotAuthenticated => ErrorCode::Unauthorized,
            Self::DuplicateEmail => ErrorCode::Conflict,
            Self::UserNotFound => ErrorCode::NotFound,
        }
    }
}
