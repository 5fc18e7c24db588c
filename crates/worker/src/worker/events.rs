// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use tl_core::protocol::TransferEvent;
use tl_core::{
    ActivityDescriptor, ChannelDescriptor, EntityKind, ReservationDescriptor, ReservationStatus,
    TaskDescriptor, TaskQueueDescriptor, TaskStatus, TransferDescriptor, WorkerDescriptor,
};

use crate::store::Live;

/// A live entity of any kind.
#[derive(Debug, Clone)]
pub enum Entity {
    Activity(Live<ActivityDescriptor>),
    Channel(Live<ChannelDescriptor>),
    Worker(Live<WorkerDescriptor>),
    TaskQueue(Live<TaskQueueDescriptor>),
    Task(Live<TaskDescriptor>),
    Reservation(Live<ReservationDescriptor>),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Activity(_) => EntityKind::Activity,
            Entity::Channel(_) => EntityKind::Channel,
            Entity::Worker(_) => EntityKind::Worker,
            Entity::TaskQueue(_) => EntityKind::TaskQueue,
            Entity::Task(_) => EntityKind::Task,
            Entity::Reservation(_) => EntityKind::Reservation,
        }
    }

    pub fn sid(&self) -> &str {
        match self {
            Entity::Activity(live) => live.sid(),
            Entity::Channel(live) => live.sid(),
            Entity::Worker(live) => live.sid(),
            Entity::TaskQueue(live) => live.sid(),
            Entity::Task(live) => live.sid(),
            Entity::Reservation(live) => live.sid(),
        }
    }
}

/// Everything a worker reports to its caller, in the order it happened.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// The first signaling connection is up.
    Ready,
    /// The connection came back and local state was re-read.
    Reconnected,
    /// The connection is down; retry `attempt` runs after `delay`.
    Disconnected { attempt: u32, delay: Duration },
    /// No signal from the service for too long.
    Asleep,
    /// Signals are arriving again.
    Awake,
    /// The token is about to expire; call `update_token`.
    TokenWillExpire,
    /// The service rejected the token.
    TokenExpired,
    /// The session is closed for good.
    Closed { reason: String },

    /// A new entity was discovered.
    Added(Entity),
    /// A known entity has a new snapshot.
    Updated(Entity),
    /// An entity left the local view.
    Removed(Entity),

    ReservationCreated(Live<ReservationDescriptor>),
    ReservationTransitioned {
        reservation: Live<ReservationDescriptor>,
        from: ReservationStatus,
        to: ReservationStatus,
    },
    TaskTransitioned {
        task: Live<TaskDescriptor>,
        from: TaskStatus,
        to: TaskStatus,
    },
    TransferInitiated {
        task: Live<TaskDescriptor>,
        transfer: TransferDescriptor,
    },
    TransferAttemptFailed {
        task: Live<TaskDescriptor>,
        transfer: TransferDescriptor,
    },
    /// A transfer completed, failed or was canceled and is detached.
    TransferEnded {
        task: Live<TaskDescriptor>,
        transfer: TransferDescriptor,
        event: TransferEvent,
    },
}
