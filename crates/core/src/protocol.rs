// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Signaling protocol frames for worker-service communication.
//!
//! The protocol is simple:
//! - The service pushes `{event_type, payload}` frames describing entity changes
//! - The worker sends a handshake on connect and in-band token updates
//! - `heartbeat` and `disconnect` frames are session control and never reach
//!   entity stores

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::descriptor::{
    ChannelDescriptor, Descriptor, EntityKind, ReservationDescriptor, TaskDescriptor,
    TransferDescriptor, WorkerDescriptor,
};
use crate::error::{Error, Result};

/// A raw inbound frame as received from the push channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushFrame {
    /// Discriminator, e.g. `reservation.created`.
    #[serde(alias = "eventType")]
    pub event_type: String,
    /// Event-specific body, usually an entity descriptor.
    #[serde(default)]
    pub payload: Value,
}

impl PushFrame {
    /// Creates a frame.
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        PushFrame {
            event_type: event_type.into(),
            payload,
        }
    }

    /// Serializes the frame to JSON.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the frame from JSON.
    pub fn from_json(s: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Messages sent from the worker to the service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// First frame after the transport opens.
    Init {
        token: String,
        worker_sid: String,
        /// Ask the service to drop every other session for this identity.
        close_existing_sessions: bool,
    },

    /// Replace the token of the current session without reconnecting.
    TokenUpdate { token: String },
}

impl ClientFrame {
    /// Creates an Init message.
    pub fn init(
        token: impl Into<String>,
        worker_sid: impl Into<String>,
        close_existing_sessions: bool,
    ) -> Self {
        ClientFrame::Init {
            token: token.into(),
            worker_sid: worker_sid.into(),
            close_existing_sessions,
        }
    }

    /// Creates a TokenUpdate message.
    pub fn token_update(token: impl Into<String>) -> Self {
        ClientFrame::TokenUpdate {
            token: token.into(),
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Why the service closed the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The session token is no longer valid.
    TokenExpired,
    /// Another session for the same identity took over.
    SessionReplaced,
    /// Anything else; treated as an ordinary connection loss.
    Other(String),
}

impl DisconnectReason {
    fn parse(reason: &str) -> Self {
        match reason {
            "token_expired" => DisconnectReason::TokenExpired,
            "session_replaced" => DisconnectReason::SessionReplaced,
            other => DisconnectReason::Other(other.to_string()),
        }
    }
}

/// Frames handled by the session itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlFrame {
    Heartbeat,
    Disconnect(DisconnectReason),
}

impl ControlFrame {
    /// Returns the control meaning of a frame, or `None` for entity events.
    pub fn from_frame(frame: &PushFrame) -> Option<Self> {
        match frame.event_type.as_str() {
            "heartbeat" => Some(ControlFrame::Heartbeat),
            "disconnect" => {
                let reason = frame
                    .payload
                    .get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                Some(ControlFrame::Disconnect(DisconnectReason::parse(reason)))
            }
            _ => None,
        }
    }
}

/// Reservation lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationEvent {
    Created,
    Accepted,
    Rejected,
    Timeout,
    Canceled,
    Rescinded,
    Wrapup,
    Completed,
}

/// Task lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvent {
    Updated,
    Canceled,
    Completed,
    Wrapup,
}

/// Transfer lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEvent {
    Initiated,
    AttemptFailed,
    Completed,
    Canceled,
    Failed,
}

impl TransferEvent {
    /// Returns true if the transfer is over and must be detached from its task.
    pub fn ends_transfer(&self) -> bool {
        matches!(
            self,
            TransferEvent::Completed | TransferEvent::Canceled | TransferEvent::Failed
        )
    }
}

/// Changes pushed for the worker itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerChange {
    Activity,
    Attributes,
}

/// Changes pushed for one of the worker's channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelChange {
    Capacity,
    Availability,
}

/// A typed entity event decoded from a [`PushFrame`].
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Reservation {
        event: ReservationEvent,
        reservation: ReservationDescriptor,
    },
    Task {
        event: TaskEvent,
        task: TaskDescriptor,
    },
    Transfer {
        event: TransferEvent,
        transfer: TransferDescriptor,
    },
    Worker {
        change: WorkerChange,
        worker: WorkerDescriptor,
    },
    Channel {
        change: ChannelChange,
        channel: ChannelDescriptor,
    },
}

impl PushEvent {
    /// Decodes an entity event from a raw frame.
    ///
    /// Unknown event types and payloads that do not decode into the expected
    /// descriptor are errors; the caller drops such frames.
    pub fn from_frame(frame: &PushFrame) -> Result<Self> {
        use ReservationEvent as R;
        use TaskEvent as T;
        use TransferEvent as X;

        match frame.event_type.as_str() {
            "reservation.created" => reservation(frame, R::Created),
            "reservation.accepted" => reservation(frame, R::Accepted),
            "reservation.rejected" => reservation(frame, R::Rejected),
            "reservation.timeout" => reservation(frame, R::Timeout),
            "reservation.canceled" => reservation(frame, R::Canceled),
            "reservation.rescinded" => reservation(frame, R::Rescinded),
            "reservation.wrapup" => reservation(frame, R::Wrapup),
            "reservation.completed" => reservation(frame, R::Completed),
            "task.updated" => task(frame, T::Updated),
            "task.canceled" => task(frame, T::Canceled),
            "task.completed" => task(frame, T::Completed),
            "task.wrapup" => task(frame, T::Wrapup),
            "task.transfer-initiated" => transfer(frame, X::Initiated),
            "task.transfer-attempt-failed" => transfer(frame, X::AttemptFailed),
            "task.transfer-completed" => transfer(frame, X::Completed),
            "task.transfer-canceled" => transfer(frame, X::Canceled),
            "task.transfer-failed" => transfer(frame, X::Failed),
            "worker.activity.update" => Ok(PushEvent::Worker {
                change: WorkerChange::Activity,
                worker: decode(frame)?,
            }),
            "worker.attributes.update" => Ok(PushEvent::Worker {
                change: WorkerChange::Attributes,
                worker: decode(frame)?,
            }),
            "worker.capacity.update" => Ok(PushEvent::Channel {
                change: ChannelChange::Capacity,
                channel: decode(frame)?,
            }),
            "worker.channel.availability.update" => Ok(PushEvent::Channel {
                change: ChannelChange::Availability,
                channel: decode(frame)?,
            }),
            other => Err(Error::UnknownEventType(other.to_string())),
        }
    }

    /// The kind of entity this event is about.
    pub fn kind(&self) -> EntityKind {
        match self {
            PushEvent::Reservation { .. } => EntityKind::Reservation,
            PushEvent::Task { .. } => EntityKind::Task,
            PushEvent::Transfer { .. } => EntityKind::Transfer,
            PushEvent::Worker { .. } => EntityKind::Worker,
            PushEvent::Channel { .. } => EntityKind::Channel,
        }
    }

    /// The identifier of the entity this event is about.
    pub fn sid(&self) -> &str {
        match self {
            PushEvent::Reservation { reservation, .. } => reservation.sid(),
            PushEvent::Task { task, .. } => task.sid(),
            PushEvent::Transfer { transfer, .. } => transfer.sid(),
            PushEvent::Worker { worker, .. } => worker.sid(),
            PushEvent::Channel { channel, .. } => channel.sid(),
        }
    }
}

fn decode<D: Descriptor>(frame: &PushFrame) -> Result<D> {
    serde_json::from_value(frame.payload.clone()).map_err(|e| Error::MalformedPayload {
        event_type: frame.event_type.clone(),
        reason: e.to_string(),
    })
}

fn reservation(frame: &PushFrame, event: ReservationEvent) -> Result<PushEvent> {
    Ok(PushEvent::Reservation {
        event,
        reservation: decode(frame)?,
    })
}

fn task(frame: &PushFrame, event: TaskEvent) -> Result<PushEvent> {
    Ok(PushEvent::Task {
        event,
        task: decode(frame)?,
    })
}

fn transfer(frame: &PushFrame, event: TransferEvent) -> Result<PushEvent> {
    Ok(PushEvent::Transfer {
        event,
        transfer: decode(frame)?,
    })
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
