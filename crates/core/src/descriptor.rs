// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Entity descriptors: plain snapshots of last-known remote state.
//!
//! A descriptor is never mutated field by field once it is handed to a store.
//! Newer remote state arrives as a whole new descriptor that replaces the old
//! one.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::Result;
use crate::status::{ReservationStatus, TaskStatus, TransferMode, TransferStatus, TransferType};

/// The kinds of entity the runtime keeps track of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Activity,
    Channel,
    Worker,
    TaskQueue,
    Task,
    Reservation,
    Transfer,
}

impl EntityKind {
    /// Returns the string representation used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Activity => "activity",
            EntityKind::Channel => "channel",
            EntityKind::Worker => "worker",
            EntityKind::TaskQueue => "task_queue",
            EntityKind::Task => "task",
            EntityKind::Reservation => "reservation",
            EntityKind::Transfer => "transfer",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shape shared by every descriptor kind.
pub trait Descriptor: Clone + fmt::Debug + DeserializeOwned + Send + Sync + 'static {
    /// Which kind of entity this describes.
    const KIND: EntityKind;

    /// The immutable remote identifier.
    fn sid(&self) -> &str;

    /// When the remote side last changed this entity.
    fn date_updated(&self) -> DateTime<Utc>;

    /// Monotonic revision counter, for kinds that carry one.
    fn version(&self) -> Option<u64> {
        None
    }

    /// Decodes a raw record as returned by the service.
    fn from_value(raw: Value) -> Result<Self> {
        Ok(serde_json::from_value(raw)?)
    }
}

/// An activity a worker can be in (e.g. "Available", "Offline").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityDescriptor {
    pub sid: String,
    pub friendly_name: String,
    /// Whether workers in this activity can receive reservations.
    pub available: bool,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

/// A worker's capacity on one task channel (voice, chat, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    pub sid: String,
    pub task_channel_sid: String,
    pub task_channel_unique_name: String,
    pub available: bool,
    /// Tasks this channel may hold at once.
    pub capacity: u32,
    #[serde(default)]
    pub configured_capacity: u32,
    #[serde(default)]
    pub available_capacity_percentage: u32,
    #[serde(default)]
    pub assigned_tasks: u32,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

/// A worker, usually the one this process signs in as.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerDescriptor {
    pub sid: String,
    pub friendly_name: String,
    pub workspace_sid: String,
    pub activity_sid: String,
    pub activity_name: String,
    pub available: bool,
    /// Free-form routing attributes.
    #[serde(default)]
    pub attributes: Value,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

/// A queue tasks wait in before being reserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskQueueDescriptor {
    pub sid: String,
    pub friendly_name: String,
    /// Expression selecting eligible workers.
    #[serde(default)]
    pub target_workers: Option<String>,
    #[serde(default)]
    pub max_reserved_workers: Option<u32>,
    #[serde(default)]
    pub task_order: Option<String>,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

/// A transfer of a task from one worker to another worker or queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferDescriptor {
    pub sid: String,
    pub task_sid: String,
    pub reservation_sid: String,
    /// Worker that initiated the transfer.
    pub worker_sid: String,
    /// Target worker or queue sid.
    pub to: String,
    pub transfer_type: TransferType,
    pub mode: TransferMode,
    pub transfer_status: TransferStatus,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

/// The transfers currently attached to a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskTransfers {
    /// A transfer of this task towards this worker.
    #[serde(default)]
    pub incoming: Option<TransferDescriptor>,
    /// A transfer this worker initiated away from itself.
    #[serde(default)]
    pub outgoing: Option<TransferDescriptor>,
}

/// A unit of work routed through the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub sid: String,
    #[serde(default)]
    pub queue_sid: Option<String>,
    #[serde(default)]
    pub queue_name: Option<String>,
    #[serde(default)]
    pub workflow_sid: Option<String>,
    #[serde(default)]
    pub workflow_name: Option<String>,
    #[serde(default)]
    pub task_channel_unique_name: Option<String>,
    #[serde(default)]
    pub priority: i64,
    /// Seconds since the task was created.
    #[serde(default)]
    pub age: u64,
    /// Seconds the task may live before it is canceled.
    #[serde(default)]
    pub timeout: u64,
    /// Reason given when the task was completed, canceled or wrapped.
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(rename = "assignment_status")]
    pub status: TaskStatus,
    #[serde(default)]
    pub attributes: Value,
    #[serde(default)]
    pub version: Option<u64>,
    /// Attached transfers. `None` when the record did not say; an explicit
    /// value, even an empty one, is authoritative.
    #[serde(default)]
    pub transfers: Option<TaskTransfers>,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

impl TaskDescriptor {
    /// A transfer of this task towards this worker.
    pub fn incoming_transfer(&self) -> Option<&TransferDescriptor> {
        self.transfers.as_ref()?.incoming.as_ref()
    }

    /// A transfer this worker initiated away from itself.
    pub fn outgoing_transfer(&self) -> Option<&TransferDescriptor> {
        self.transfers.as_ref()?.outgoing.as_ref()
    }

    /// Returns a copy of this snapshot with the given transfer attached in
    /// the slot matching its direction relative to `worker_sid`.
    pub fn with_transfer(&self, transfer: TransferDescriptor, worker_sid: &str) -> Self {
        let mut next = self.clone();
        let slots = next.transfers.get_or_insert_with(TaskTransfers::default);
        if transfer.worker_sid == worker_sid {
            slots.outgoing = Some(transfer);
        } else {
            slots.incoming = Some(transfer);
        }
        next
    }

    /// Returns a copy of this snapshot with the transfer `transfer_sid`
    /// detached, whichever slot it was in.
    pub fn without_transfer(&self, transfer_sid: &str) -> Self {
        let mut next = self.clone();
        if let Some(slots) = next.transfers.as_mut() {
            if slots.incoming.as_ref().is_some_and(|t| t.sid == transfer_sid) {
                slots.incoming = None;
            }
            if slots.outgoing.as_ref().is_some_and(|t| t.sid == transfer_sid) {
                slots.outgoing = None;
            }
        }
        next
    }
}

/// Compares two snapshots of the same entity by version, falling back to
/// `date_updated` when either side has no version.
pub fn is_older<D: Descriptor>(incoming: &D, held: &D) -> bool {
    match (incoming.version(), held.version()) {
        (Some(incoming), Some(held)) => incoming < held,
        _ => incoming.date_updated() < held.date_updated(),
    }
}

/// An offer of a task to a specific worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationDescriptor {
    pub sid: String,
    pub worker_sid: String,
    #[serde(default)]
    pub workspace_sid: Option<String>,
    pub task_sid: String,
    #[serde(rename = "reservation_status")]
    pub status: ReservationStatus,
    /// Seconds the worker has to answer a pending reservation.
    #[serde(default)]
    pub timeout: u64,
    #[serde(default)]
    pub canceled_reason: Option<String>,
    /// The task as it was when this reservation changed, if included.
    #[serde(default)]
    pub task: Option<TaskDescriptor>,
    #[serde(default)]
    pub version: Option<u64>,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

macro_rules! impl_descriptor {
    ($ty:ty, $kind:expr) => {
        impl Descriptor for $ty {
            const KIND: EntityKind = $kind;

            fn sid(&self) -> &str {
                &self.sid
            }

            fn date_updated(&self) -> DateTime<Utc> {
                self.date_updated
            }
        }
    };
    ($ty:ty, $kind:expr, versioned) => {
        impl Descriptor for $ty {
            const KIND: EntityKind = $kind;

            fn sid(&self) -> &str {
                &self.sid
            }

            fn date_updated(&self) -> DateTime<Utc> {
                self.date_updated
            }

            fn version(&self) -> Option<u64> {
                self.version
            }
        }
    };
}

impl_descriptor!(ActivityDescriptor, EntityKind::Activity);
impl_descriptor!(ChannelDescriptor, EntityKind::Channel);
impl_descriptor!(WorkerDescriptor, EntityKind::Worker);
impl_descriptor!(TaskQueueDescriptor, EntityKind::TaskQueue);
impl_descriptor!(TransferDescriptor, EntityKind::Transfer);
impl_descriptor!(TaskDescriptor, EntityKind::Task, versioned);
impl_descriptor!(ReservationDescriptor, EntityKind::Reservation, versioned);

#[cfg(test)]
#[path = "descriptor_tests.rs"]
mod tests;
