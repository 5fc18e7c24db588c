// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Signaling session for real-time push events.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ SignalingSession │────►│  Transport  │────►│   Event     │
//! │  (phase machine) │◄────│   (trait)   │◄────│   Bridge    │
//! └──────────────────┘     └─────────────┘     └─────────────┘
//!        ▲
//!        │ asleep / awake
//! ┌─────────────┐
//! │  Heartbeat  │  (liveness monitor)
//! └─────────────┘
//! ```
//!
//! # Features
//!
//! - WebSocket connection to the event bridge
//! - Automatic reconnect with exponential backoff and jitter
//! - Half-open connection detection via the liveness monitor
//! - In-band token rotation and planned reconnect before expiry
//! - Injectable transport trait for testing

mod heartbeat;
mod signaling;
mod transport;

pub use heartbeat::Heartbeat;
pub use signaling::{SessionConfig, SessionEvent, SessionState, SignalingSession};
pub use transport::{Transport, TransportError, TransportResult, WebSocketTransport};
