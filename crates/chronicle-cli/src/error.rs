//! CLI error types.

use chronicle_core::error::DomainError;
use thiserror::Error;
use uuid::Uuid;

/// Failures surfaced by the `chronicle` binary.
#[derive(Debug, Error)]
pub enum AppError {
    /// The store rejected the request or could not be read.
    #[error(transparent)]
    Store(#[from] DomainError),

    /// No record carries the requested event id.
    #[error("no event record with id {0}")]
    RecordNotFound(Uuid),

    /// The result could not be rendered as JSON.
    #[error("output error: {0}")]
    Output(#[from] serde_json::Error),
}
