// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The persistent signaling session.
//!
//! One logical connection per session. The session reconnects with backoff
//! when the transport fails, when the liveness monitor reports silence, or
//! when the service invalidates the token. Everything that can happen to the
//! session is surfaced through [`SignalingSession::next_event`], which is
//! also the only place timers and inbound frames are multiplexed.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use tl_core::protocol::{ClientFrame, ControlFrame, DisconnectReason, PushFrame};
use tl_core::BackoffPolicy;

use super::heartbeat::Heartbeat;
use super::transport::{Transport, TransportError, TransportResult, WebSocketTransport};
use crate::error::{Error, Result};

/// Configuration for a signaling session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Event bridge URL.
    pub url: String,
    /// Identity announced in the handshake.
    pub worker_sid: String,
    /// Ask the service to close other sessions for the same identity.
    pub close_existing_sessions: bool,
    pub backoff: BackoffPolicy,
    /// How often the liveness monitor checks for silence.
    pub heartbeat_interval: Duration,
    /// Silence after which the connection is considered dead.
    pub sleep_after: Duration,
    /// How long before token expiry `TokenWillExpire` is raised.
    pub token_refresh_margin: Duration,
}

impl SessionConfig {
    /// Rejects settings the liveness monitor cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_interval.is_zero() {
            return Err(Error::InvalidArgument(
                "heartbeat interval must be greater than zero".to_string(),
            ));
        }
        if self.sleep_after < self.heartbeat_interval {
            return Err(Error::InvalidArgument(format!(
                "sleep_after ({:?}) must not be below the heartbeat interval ({:?})",
                self.sleep_after, self.heartbeat_interval
            )));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            url: "ws://localhost:7890".to_string(),
            worker_sid: String::new(),
            close_existing_sessions: false,
            backoff: BackoffPolicy::default(),
            heartbeat_interval: Duration::from_secs(5),
            sleep_after: Duration::from_secs(30),
            token_refresh_margin: Duration::from_secs(60),
        }
    }
}

/// Externally visible state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Never connected.
    Idle,
    /// Handshake in progress.
    Connecting,
    /// Connected and receiving.
    Open,
    /// Waiting to retry after a failure.
    Reconnecting { attempt: u32 },
    /// Explicitly closed; no further reconnects.
    Closed,
}

/// What happened on the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A handshake succeeded. `resumed` is false only for the first one.
    Connected { resumed: bool },
    /// An entity frame, in arrival order.
    Frame(PushFrame),
    /// The connection is down; the next attempt runs after `delay`.
    ReconnectScheduled { attempt: u32, delay: Duration },
    /// The liveness monitor detected silence.
    Asleep,
    /// Signals are arriving again after silence.
    Awake,
    /// The token is about to expire; call `update_token` soon.
    TokenWillExpire,
    /// The service rejected the token; a reconnect is already scheduled.
    TokenExpired,
    /// The session is closed for good.
    Closed { reason: String },
}

#[derive(Debug, Clone, Copy)]
enum Liveness {
    Asleep,
    Awake,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Connecting,
    Open,
    Reconnecting { attempt: u32, deadline: Instant },
    Closed,
}

enum Step {
    Liveness(Liveness),
    RefreshDue,
    Received(TransportResult<Option<PushFrame>>),
    RetryDue,
}

/// A signaling session over an injectable transport.
pub struct SignalingSession<T: Transport = WebSocketTransport> {
    config: SessionConfig,
    transport: T,
    token: String,
    phase: Phase,
    /// Failed attempts since the last successful handshake.
    attempt: u32,
    has_connected: bool,
    asleep: bool,
    heartbeat: Option<Heartbeat>,
    liveness_tx: mpsc::UnboundedSender<Liveness>,
    liveness_rx: mpsc::UnboundedReceiver<Liveness>,
    refresh_deadline: Option<Instant>,
    refresh_pending: bool,
    events: VecDeque<SessionEvent>,
}

impl SignalingSession<WebSocketTransport> {
    /// Create a session with the default WebSocket transport.
    pub fn new(config: SessionConfig, token: impl Into<String>) -> Self {
        Self::with_transport(config, WebSocketTransport::new(), token)
    }
}

impl<T: Transport> SignalingSession<T> {
    /// Create a session with a custom transport (for testing).
    pub fn with_transport(config: SessionConfig, transport: T, token: impl Into<String>) -> Self {
        let (liveness_tx, liveness_rx) = mpsc::unbounded_channel();
        SignalingSession {
            config,
            transport,
            token: token.into(),
            phase: Phase::Idle,
            attempt: 0,
            has_connected: false,
            asleep: false,
            heartbeat: None,
            liveness_tx,
            liveness_rx,
            refresh_deadline: None,
            refresh_pending: false,
            events: VecDeque::new(),
        }
    }

    /// Get the current session state.
    pub fn state(&self) -> SessionState {
        match self.phase {
            Phase::Idle => SessionState::Idle,
            Phase::Connecting => SessionState::Connecting,
            Phase::Open => SessionState::Open,
            Phase::Reconnecting { attempt, .. } => SessionState::Reconnecting { attempt },
            Phase::Closed => SessionState::Closed,
        }
    }

    /// Check if the session is open.
    pub fn is_open(&self) -> bool {
        self.phase == Phase::Open && self.transport.is_connected()
    }

    /// Failed attempts since the last successful handshake.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Returns true if a token refresh was requested and not yet supplied.
    pub fn refresh_pending(&self) -> bool {
        self.refresh_pending
    }

    /// Opens the session.
    ///
    /// Idempotent: does nothing while connecting, open or waiting to
    /// reconnect. A failed first attempt is not an error; it schedules a
    /// reconnect and is reported through [`next_event`](Self::next_event).
    pub async fn connect(&mut self) -> Result<()> {
        match self.phase {
            Phase::Idle => {
                self.config.validate()?;
                self.handshake().await;
                Ok(())
            }
            Phase::Closed => Err(Error::InvalidArgument(
                "session is closed; create a new one to reconnect".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Replaces the token.
    ///
    /// While open, the new token is sent in-band. If the lifetime timer asked
    /// for a refresh, a planned reconnect with the new token is made instead.
    pub async fn update_token(&mut self, token: impl Into<String>) -> Result<()> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(Error::InvalidArgument("token must not be empty".to_string()));
        }
        self.token = token;
        let planned = std::mem::take(&mut self.refresh_pending);

        if self.phase != Phase::Open {
            // The next handshake picks it up.
            return Ok(());
        }

        if planned {
            info!("token refreshed, reconnecting with new token");
            self.stop_heartbeat();
            let _ = self.transport.disconnect().await;
            self.handshake().await;
        } else if let Err(e) = self
            .transport
            .send(ClientFrame::token_update(self.token.clone()))
            .await
        {
            warn!(error = %e, "failed to send token update");
            self.lose_connection().await;
        }
        Ok(())
    }

    /// Arms the token lifetime timer.
    ///
    /// `TokenWillExpire` is raised `token_refresh_margin` before the token
    /// expires, or immediately if the lifetime is shorter than the margin.
    pub fn set_lifetime(&mut self, seconds: u64) -> Result<()> {
        if seconds == 0 {
            return Err(Error::InvalidArgument(
                "token lifetime must be greater than zero".to_string(),
            ));
        }
        let lead = Duration::from_secs(seconds).saturating_sub(self.config.token_refresh_margin);
        let Some(deadline) = Instant::now().checked_add(lead) else {
            return Err(Error::InvalidArgument(format!(
                "token lifetime of {seconds}s is out of range"
            )));
        };
        self.refresh_deadline = Some(deadline);
        Ok(())
    }

    /// Closes the session for good.
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.phase == Phase::Closed {
            return Ok(());
        }
        self.close("client disconnect").await
    }

    /// Waits for the next session event.
    ///
    /// Returns `None` once the session is idle or closed and every pending
    /// event has been handed out.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            if let Some(event) = self.events.pop_front() {
                return Some(event);
            }

            let step = match self.phase {
                Phase::Idle | Phase::Closed => return None,
                Phase::Connecting => {
                    // A previous handshake was abandoned mid-way.
                    self.handshake().await;
                    continue;
                }
                Phase::Open => {
                    let refresh = self.refresh_deadline;
                    tokio::select! {
                        Some(signal) = self.liveness_rx.recv() => Step::Liveness(signal),
                        _ = sleep_until_opt(refresh) => Step::RefreshDue,
                        received = self.transport.recv() => Step::Received(received),
                    }
                }
                Phase::Reconnecting { deadline, .. } => {
                    let refresh = self.refresh_deadline;
                    tokio::select! {
                        _ = sleep_until_opt(refresh) => Step::RefreshDue,
                        _ = sleep_until(deadline) => Step::RetryDue,
                    }
                }
            };

            self.apply(step).await;
        }
    }

    async fn apply(&mut self, step: Step) {
        match step {
            Step::Liveness(Liveness::Asleep) => {
                warn!(
                    silent_for = ?self.config.sleep_after,
                    "no signal from service, dropping connection"
                );
                self.asleep = true;
                self.events.push_back(SessionEvent::Asleep);
                self.lose_connection().await;
            }
            Step::Liveness(Liveness::Awake) => self.events.push_back(SessionEvent::Awake),
            Step::RefreshDue => {
                info!("token will expire soon");
                self.refresh_deadline = None;
                self.refresh_pending = true;
                self.events.push_back(SessionEvent::TokenWillExpire);
            }
            Step::RetryDue => self.handshake().await,
            Step::Received(Ok(Some(frame))) => {
                if let Some(heartbeat) = &self.heartbeat {
                    heartbeat.beat();
                }
                self.on_frame(frame).await;
            }
            Step::Received(Ok(None)) => {
                info!("signaling connection closed by service");
                self.lose_connection().await;
            }
            Step::Received(Err(TransportError::Malformed(reason))) => {
                if let Some(heartbeat) = &self.heartbeat {
                    heartbeat.beat();
                }
                warn!(%reason, "dropping malformed frame");
            }
            Step::Received(Err(e)) => {
                warn!(error = %e, "signaling connection failed");
                self.lose_connection().await;
            }
        }
    }

    async fn on_frame(&mut self, frame: PushFrame) {
        match ControlFrame::from_frame(&frame) {
            None => self.events.push_back(SessionEvent::Frame(frame)),
            Some(ControlFrame::Heartbeat) => debug!("heartbeat"),
            Some(ControlFrame::Disconnect(DisconnectReason::TokenExpired)) => {
                warn!("service rejected token, reconnecting");
                self.events.push_back(SessionEvent::TokenExpired);
                self.lose_connection().await;
            }
            Some(ControlFrame::Disconnect(DisconnectReason::SessionReplaced)) => {
                warn!("session replaced by another connection for this worker");
                // Already gone on the service side; nothing left to report.
                let _ = self.close("session_replaced").await;
            }
            Some(ControlFrame::Disconnect(DisconnectReason::Other(reason))) => {
                info!(%reason, "service requested disconnect");
                self.lose_connection().await;
            }
        }
    }

    /// One connection attempt: open the transport and send the init frame.
    async fn handshake(&mut self) {
        self.phase = Phase::Connecting;
        match self.open_transport().await {
            Ok(()) => {
                let resumed = self.has_connected;
                self.has_connected = true;
                self.attempt = 0;
                self.phase = Phase::Open;
                self.restart_heartbeat();
                info!(url = %self.config.url, resumed, "signaling session open");

                if std::mem::take(&mut self.asleep) {
                    self.events.push_back(SessionEvent::Awake);
                }
                self.events.push_back(SessionEvent::Connected { resumed });
            }
            Err(e) => {
                warn!(error = %e, attempt = self.attempt, "signaling handshake failed");
                let _ = self.transport.disconnect().await;
                self.schedule_reconnect();
            }
        }
    }

    async fn open_transport(&mut self) -> TransportResult<()> {
        self.transport.connect(&self.config.url).await?;
        let init = ClientFrame::init(
            self.token.clone(),
            self.config.worker_sid.clone(),
            self.config.close_existing_sessions,
        );
        self.transport.send(init).await
    }

    async fn lose_connection(&mut self) {
        let _ = self.transport.disconnect().await;
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        self.stop_heartbeat();
        let attempt = self.attempt;
        let delay = self.config.backoff.next_delay(attempt);
        self.attempt = self.attempt.saturating_add(1);
        self.phase = Phase::Reconnecting {
            attempt,
            deadline: Instant::now() + delay,
        };
        info!(attempt, ?delay, "reconnect scheduled");
        self.events
            .push_back(SessionEvent::ReconnectScheduled { attempt, delay });
    }

    async fn close(&mut self, reason: &str) -> Result<()> {
        self.phase = Phase::Closed;
        self.stop_heartbeat();
        self.refresh_deadline = None;
        self.refresh_pending = false;
        info!(%reason, "signaling session closed");
        self.events.push_back(SessionEvent::Closed {
            reason: reason.to_string(),
        });
        self.transport.disconnect().await?;
        Ok(())
    }

    fn restart_heartbeat(&mut self) {
        self.stop_heartbeat();
        let asleep = self.liveness_tx.clone();
        let awake = self.liveness_tx.clone();
        let started = Heartbeat::start(
            self.config.heartbeat_interval,
            self.config.sleep_after,
            move || {
                let _ = asleep.send(Liveness::Asleep);
            },
            move || {
                let _ = awake.send(Liveness::Awake);
            },
        );
        match started {
            Ok(heartbeat) => self.heartbeat = Some(heartbeat),
            Err(e) => warn!(error = %e, "liveness monitor not started"),
        }
    }

    fn stop_heartbeat(&mut self) {
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.stop();
        }
        // Signals from a stopped monitor describe a connection that is gone.
        while self.liveness_rx.try_recv().is_ok() {}
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "signaling_tests.rs"]
mod tests;
