// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle statuses for reservations, tasks and transfers.
//!
//! Statuses only ever change when the remote service says so. The transition
//! rules here are used to classify an incoming status against the one held
//! locally, so that late or reordered updates are not applied over newer
//! state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// How an incoming status relates to the status currently held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Same status; only attributes may have changed.
    Unchanged,
    /// A legal step along the lifecycle graph.
    Advance,
    /// Not an edge of the graph but not older either (e.g. intermediate
    /// events were missed while disconnected). Applied, since the remote
    /// side is authoritative.
    Skip,
    /// Older than what is held locally, or leaving a terminal state.
    /// Not applied.
    Stale,
}

impl Transition {
    /// Returns true if the incoming snapshot should replace the held one.
    pub fn applies(&self) -> bool {
        !matches!(self, Transition::Stale)
    }
}

/// Status of a reservation (an offer of a task to this worker).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Offered, awaiting accept or reject.
    Pending,
    /// Accepted by this worker.
    Accepted,
    /// Work done, worker in wrap-up.
    Wrapping,
    /// Finished.
    Completed,
    /// Declined by this worker.
    Rejected,
    /// Not answered in time.
    Timeout,
    /// Withdrawn because the task was canceled.
    Canceled,
    /// Withdrawn because the task was assigned elsewhere.
    Rescinded,
}

impl ReservationStatus {
    /// Returns the string representation used on the wire and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Accepted => "accepted",
            ReservationStatus::Wrapping => "wrapping",
            ReservationStatus::Completed => "completed",
            ReservationStatus::Rejected => "rejected",
            ReservationStatus::Timeout => "timeout",
            ReservationStatus::Canceled => "canceled",
            ReservationStatus::Rescinded => "rescinded",
        }
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Completed
                | ReservationStatus::Rejected
                | ReservationStatus::Timeout
                | ReservationStatus::Canceled
                | ReservationStatus::Rescinded
        )
    }

    /// Check if `target` is an edge of the lifecycle graph from this status.
    pub fn can_transition_to(&self, target: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (self, target),
            (Pending, Accepted)
                | (Pending, Rejected)
                | (Pending, Timeout)
                | (Pending, Canceled)
                | (Pending, Rescinded)
                | (Accepted, Wrapping)
                | (Accepted, Completed)
                | (Wrapping, Completed)
        )
    }

    /// Get valid transition targets as a formatted string.
    pub fn valid_targets(&self) -> String {
        match self {
            ReservationStatus::Pending => {
                "accepted, rejected, timeout, canceled, rescinded".to_string()
            }
            ReservationStatus::Accepted => "wrapping, completed".to_string(),
            ReservationStatus::Wrapping => "completed".to_string(),
            _ => "none (terminal)".to_string(),
        }
    }

    /// Position along the main lifecycle line, used to detect stale updates.
    fn rank(&self) -> u8 {
        match self {
            ReservationStatus::Pending => 0,
            ReservationStatus::Accepted => 1,
            ReservationStatus::Wrapping => 2,
            _ => 3,
        }
    }

    /// Classify a status reported by the remote side against this one.
    pub fn transition(&self, incoming: ReservationStatus) -> Transition {
        if *self == incoming {
            Transition::Unchanged
        } else if self.is_terminal() || incoming.rank() < self.rank() {
            Transition::Stale
        } else if self.can_transition_to(incoming) {
            Transition::Advance
        } else {
            Transition::Skip
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ReservationStatus::Pending),
            "accepted" => Ok(ReservationStatus::Accepted),
            "wrapping" => Ok(ReservationStatus::Wrapping),
            "completed" => Ok(ReservationStatus::Completed),
            "rejected" => Ok(ReservationStatus::Rejected),
            "timeout" => Ok(ReservationStatus::Timeout),
            "canceled" => Ok(ReservationStatus::Canceled),
            "rescinded" => Ok(ReservationStatus::Rescinded),
            _ => Err(Error::InvalidReservationStatus(s.to_string())),
        }
    }
}

/// Assignment status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting in a queue for a worker.
    Pending,
    /// Offered to a worker through a reservation.
    Reserved,
    /// Accepted by a worker.
    Assigned,
    /// Worker in wrap-up.
    Wrapping,
    /// Finished.
    Completed,
    /// Removed from the system before completion.
    Canceled,
}

impl TaskStatus {
    /// Returns the string representation used on the wire and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Reserved => "reserved",
            TaskStatus::Assigned => "assigned",
            TaskStatus::Wrapping => "wrapping",
            TaskStatus::Completed => "completed",
            TaskStatus::Canceled => "canceled",
        }
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Canceled)
    }

    /// Check if `target` is an edge of the lifecycle graph from this status.
    ///
    /// `reserved -> pending` is legal: a rejected or timed out reservation
    /// puts the task back in its queue.
    pub fn can_transition_to(&self, target: TaskStatus) -> bool {
        use TaskStatus::*;
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, target),
            (_, Canceled)
                | (Pending, Reserved)
                | (Reserved, Pending)
                | (Reserved, Assigned)
                | (Assigned, Wrapping)
                | (Assigned, Completed)
                | (Wrapping, Completed)
        )
    }

    /// Get valid transition targets as a formatted string.
    pub fn valid_targets(&self) -> String {
        match self {
            TaskStatus::Pending => "reserved, canceled".to_string(),
            TaskStatus::Reserved => "pending, assigned, canceled".to_string(),
            TaskStatus::Assigned => "wrapping, completed, canceled".to_string(),
            TaskStatus::Wrapping => "completed, canceled".to_string(),
            _ => "none (terminal)".to_string(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::Reserved => 1,
            TaskStatus::Assigned => 2,
            TaskStatus::Wrapping => 3,
            TaskStatus::Completed | TaskStatus::Canceled => 4,
        }
    }

    /// Classify a status reported by the remote side against this one.
    pub fn transition(&self, incoming: TaskStatus) -> Transition {
        if *self == incoming {
            Transition::Unchanged
        } else if self.is_terminal() {
            Transition::Stale
        } else if self.can_transition_to(incoming) {
            Transition::Advance
        } else if incoming.rank() < self.rank() {
            Transition::Stale
        } else {
            Transition::Skip
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "reserved" => Ok(TaskStatus::Reserved),
            "assigned" => Ok(TaskStatus::Assigned),
            "wrapping" => Ok(TaskStatus::Wrapping),
            "completed" => Ok(TaskStatus::Completed),
            "canceled" => Ok(TaskStatus::Canceled),
            _ => Err(Error::InvalidTaskStatus(s.to_string())),
        }
    }
}

/// Status of a task transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Initiated,
    Failed,
    Completed,
    Canceled,
}

impl TransferStatus {
    /// Returns the string representation used on the wire and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Initiated => "initiated",
            TransferStatus::Failed => "failed",
            TransferStatus::Completed => "completed",
            TransferStatus::Canceled => "canceled",
        }
    }

    /// Returns true once the transfer no longer belongs on its task.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransferStatus::Initiated)
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransferStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "initiated" => Ok(TransferStatus::Initiated),
            "failed" => Ok(TransferStatus::Failed),
            "completed" => Ok(TransferStatus::Completed),
            "canceled" => Ok(TransferStatus::Canceled),
            _ => Err(Error::InvalidTransferStatus(s.to_string())),
        }
    }
}

/// Whether the initiating worker stays on the interaction during a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransferMode {
    Warm,
    Cold,
}

impl TransferMode {
    /// Returns the string representation used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferMode::Warm => "WARM",
            TransferMode::Cold => "COLD",
        }
    }
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransferMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "WARM" => Ok(TransferMode::Warm),
            "COLD" => Ok(TransferMode::Cold),
            _ => Err(Error::InvalidTransferMode(s.to_string())),
        }
    }
}

/// Target kind of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferType {
    Worker,
    Queue,
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
