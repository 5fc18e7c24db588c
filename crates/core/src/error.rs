// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for tl-core operations.

use thiserror::Error;

/// All possible errors that can occur in tl-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid reservation status: '{0}'\n  hint: valid statuses are: pending, accepted, wrapping, completed, rejected, timeout, canceled, rescinded")]
    InvalidReservationStatus(String),

    #[error("invalid task status: '{0}'\n  hint: valid statuses are: pending, reserved, assigned, wrapping, completed, canceled")]
    InvalidTaskStatus(String),

    #[error("invalid transfer status: '{0}'\n  hint: valid statuses are: initiated, failed, completed, canceled")]
    InvalidTransferStatus(String),

    #[error("invalid transfer mode: '{0}'\n  hint: valid modes are: WARM, COLD")]
    InvalidTransferMode(String),

    #[error("unknown event type: '{0}'")]
    UnknownEventType(String),

    #[error("malformed {event_type} payload: {reason}")]
    MalformedPayload { event_type: String, reason: String },

    #[error("{0}")]
    InvalidArgument(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for tl-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
