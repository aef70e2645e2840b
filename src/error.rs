use thiserror::Error;

/// Errors produced by the device lifecycle.
///
/// Every variant is surfaced unchanged to the caller; the HTTP layer maps
/// each one to a status code in `handlers::ApiError`.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Device not found with id: {0}")]
    NotFound(i64),

    #[error("Invalid device state: {0}")]
    InvalidState(String),

    #[error("{0}")]
    InvalidTransition(String),

    /// Another writer committed first. Callers may re-fetch and retry.
    #[error("Device {id} was modified concurrently (stale version {version})")]
    VersionConflict { id: i64, version: i64 },

    #[error("Repository error: {0}")]
    Repository(#[from] anyhow::Error),
}

impl From<sqlx::Error> for DeviceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(err.into())
    }
}

pub type DeviceResult<T> = Result<T, DeviceError>;
