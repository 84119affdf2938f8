//! Error vocabulary shared by every Attest crate.

use thiserror::Error;

/// Result carrying an `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Boundary error for callers of the approval engine.
///
/// Domain crates keep their own typed errors and convert into this
/// vocabulary at the boundary.
#[derive(Debug, Error)]
pub enum AppError {
    /// The user may not perform the approval action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// An approval, level or workflow does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input such as an out-of-range level number.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A concurrent write or a vetoed delete.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The approval store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything else.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP-style status code.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::Conflict(_) => 409,
            Self::Storage(_) | Self::Config(_) | Self::Internal(_) => 500,
        }
    }

    /// Stable machine-readable code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
