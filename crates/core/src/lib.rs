// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tl-core: Shared data model for the taskline worker runtime
//!
//! This crate provides entity descriptors, status state machines, the
//! signaling wire protocol and the reconnect backoff policy. It does no I/O.

pub mod backoff;
pub mod descriptor;
pub mod error;
pub mod protocol;
pub mod status;

pub use backoff::BackoffPolicy;
pub use descriptor::{
    is_older, ActivityDescriptor, ChannelDescriptor, Descriptor, EntityKind, ReservationDescriptor,
    TaskDescriptor, TaskQueueDescriptor, TaskTransfers, TransferDescriptor, WorkerDescriptor,
};
pub use error::{Error, Result};
pub use protocol::{
    ChannelChange, ClientFrame, ControlFrame, DisconnectReason, PushEvent, PushFrame,
    ReservationEvent, TaskEvent, TransferEvent, WorkerChange,
};
pub use status::{
    ReservationStatus, TaskStatus, Transition, TransferMode, TransferStatus, TransferType,
};
