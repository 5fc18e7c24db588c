// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use thiserror::Error;
use tl_core::EntityKind;

use crate::session::TransportError;

/// Distinguished kinds of remote rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// The reservation was already accepted, here or elsewhere.
    AlreadyAccepted,
    /// The token presented with the request is no longer valid.
    StaleToken,
    /// Any other refusal.
    Other,
}

/// Broad category of an [`Error`], for callers that branch on failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected locally before anything was sent.
    InvalidArgument,
    /// The network or transport failed.
    Connectivity,
    /// The service refused the request.
    RemoteRejection,
    /// Something arrived that could not be understood.
    Protocol,
    /// Bad configuration or local I/O.
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::Connectivity => "connectivity",
            ErrorKind::RemoteRejection => "remote rejection",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Config => "config",
        };
        write!(f, "{}", s)
    }
}

/// All possible errors that can occur in the taskline runtime.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{kind} {sid} is {status}\n  hint: no further actions are possible once a {kind} is {status}")]
    TerminalState {
        kind: EntityKind,
        sid: String,
        status: String,
    },

    #[error("{kind} not found: {sid}")]
    NotFound { kind: EntityKind, sid: String },

    #[error("connection failed: {0}")]
    Connectivity(String),

    #[error("request rejected with status {status}{}: {message}", code.map(|c| format!(" (code {})", c)).unwrap_or_default())]
    RemoteRejection {
        status: u16,
        code: Option<u32>,
        message: String,
        kind: RejectionKind,
    },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Core(#[from] tl_core::Error),
}

impl Error {
    /// Returns the broad category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument(_) | Error::TerminalState { .. } | Error::NotFound { .. } => {
                ErrorKind::InvalidArgument
            }
            Error::Connectivity(_) => ErrorKind::Connectivity,
            Error::RemoteRejection { .. } => ErrorKind::RemoteRejection,
            Error::Protocol(_) | Error::Json(_) => ErrorKind::Protocol,
            Error::Config(_) | Error::Io(_) | Error::Toml(_) => ErrorKind::Config,
            Error::Transport(TransportError::Malformed(_)) => ErrorKind::Protocol,
            Error::Transport(_) => ErrorKind::Connectivity,
            Error::Core(tl_core::Error::InvalidArgument(_)) => ErrorKind::InvalidArgument,
            Error::Core(_) => ErrorKind::Protocol,
        }
    }

    /// Returns true if the service reported the reservation as already accepted.
    pub fn is_already_accepted(&self) -> bool {
        matches!(
            self,
            Error::RemoteRejection {
                kind: RejectionKind::AlreadyAccepted,
                ..
            }
        )
    }

    /// Returns true if the service refused the token.
    pub fn is_stale_token(&self) -> bool {
        matches!(
            self,
            Error::RemoteRejection {
                kind: RejectionKind::StaleToken,
                ..
            }
        )
    }
}

/// A specialized Result type for taskline operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
