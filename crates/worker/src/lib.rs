// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! taskline - worker-side session and state-sync runtime.
//!
//! A [`Worker`] keeps a persistent signaling session with the
//! task-distribution service and mirrors the worker's activities, channels,
//! reservations and tasks in local stores.
//!
//! # Main Components
//!
//! - [`SignalingSession`] - push connection with backoff, liveness and token refresh
//! - [`EntityStore`] - identity-preserving store of [`Live`] entities
//! - [`ReservationIndex`] - which reservations hold which task
//! - [`Worker`] - owns all of the above and routes push events into the stores
//! - [`WorkerConfig`] - TOML configuration
//!
//! ```rust,ignore
//! use taskline::{Worker, WorkerConfig, WorkerEvent};
//!
//! let config = WorkerConfig::load(Path::new("taskline.toml"))?;
//! let mut worker = Worker::new(&config, &token)?;
//! worker.start().await?;
//! while let Some(event) = worker.next_event().await {
//!     if let WorkerEvent::ReservationCreated(reservation) = event {
//!         worker.reservation(&reservation).accept().await?;
//!     }
//! }
//! ```

mod cli;

pub mod api;
pub mod config;
pub mod error;
pub mod session;
pub mod store;
pub mod worker;

#[cfg(test)]
mod test_helpers;

pub use cli::{Cli, Command, RunArgs};
pub use config::WorkerConfig;
pub use error::{Error, ErrorKind, RejectionKind, Result};
pub use session::{SessionConfig, SessionEvent, SessionState, SignalingSession};
pub use store::{Change, EntityStore, Live, ReservationIndex};
pub use worker::{Entity, ReservationActions, TaskActions, Worker, WorkerEvent, WorkerOptions};
