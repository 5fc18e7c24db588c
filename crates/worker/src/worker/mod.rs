// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The session owner.
//!
//! A [`Worker`] owns one signaling session, the REST requester and every
//! entity store for a single worker identity. Push frames and action
//! responses both go through the same apply functions, so the stores change
//! in exactly one way regardless of where a snapshot came from.
//!
//! Everything is driven from [`Worker::next_event`] and the action methods,
//! which take `&mut self`; no two handlers ever run at the same time.

mod actions;
mod events;

pub use actions::{ReservationActions, TaskActions};
pub use events::{Entity, WorkerEvent};

use std::collections::{HashSet, VecDeque};

use tracing::{debug, info, warn};

use tl_core::{
    ActivityDescriptor, ChannelDescriptor, Descriptor, PushEvent, ReservationDescriptor,
    TaskDescriptor, TaskQueueDescriptor, TransferDescriptor, TransferEvent, Transition,
    WorkerDescriptor,
};

use crate::api::{fetch_pages, params, HttpRequester, Params, Requester, Routes};
use crate::config::WorkerConfig;
use crate::error::{Error, Result};
use crate::session::{
    SessionConfig, SessionEvent, SessionState, SignalingSession, Transport, WebSocketTransport,
};
use crate::store::{Change, EntityStore, Live, ReservationIndex};

/// Identity and tuning a [`Worker`] needs besides its transport and requester.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    pub workspace_sid: String,
    pub worker_sid: String,
    /// Records per page for bulk reads.
    pub page_size: u32,
    pub session: SessionConfig,
}

impl WorkerOptions {
    pub fn from_config(config: &WorkerConfig) -> Result<Self> {
        Ok(WorkerOptions {
            workspace_sid: config.workspace_sid.clone(),
            worker_sid: config.worker_sid.clone(),
            page_size: config.page_size,
            session: config.session_config()?,
        })
    }
}

/// Local view and control surface of one worker.
pub struct Worker<T: Transport = WebSocketTransport, R: Requester = HttpRequester> {
    session: SignalingSession<T>,
    requester: R,
    routes: Routes,
    worker_sid: String,
    page_size: u32,
    activities: EntityStore<ActivityDescriptor>,
    channels: EntityStore<ChannelDescriptor>,
    workers: EntityStore<WorkerDescriptor>,
    task_queues: EntityStore<TaskQueueDescriptor>,
    reservations: EntityStore<ReservationDescriptor>,
    tasks: EntityStore<TaskDescriptor>,
    index: ReservationIndex,
    pending: VecDeque<WorkerEvent>,
}

impl Worker<WebSocketTransport, HttpRequester> {
    /// Creates a worker that talks to the configured services.
    pub fn new(config: &WorkerConfig, token: &str) -> Result<Self> {
        config.validate()?;
        let requester = HttpRequester::new(&config.api_base_url, token, config.request_timeout())?;
        let options = WorkerOptions::from_config(config)?;
        Ok(Self::with_parts(
            options,
            WebSocketTransport::new(),
            requester,
            token,
        ))
    }
}

impl<T: Transport, R: Requester> Worker<T, R> {
    /// Creates a worker over the given transport and requester.
    pub fn with_parts(
        options: WorkerOptions,
        transport: T,
        requester: R,
        token: impl Into<String>,
    ) -> Self {
        Worker {
            session: SignalingSession::with_transport(options.session, transport, token),
            requester,
            routes: Routes::new(options.workspace_sid, options.worker_sid.clone()),
            worker_sid: options.worker_sid,
            page_size: options.page_size,
            activities: EntityStore::new(),
            channels: EntityStore::new(),
            workers: EntityStore::new(),
            task_queues: EntityStore::new(),
            reservations: EntityStore::new(),
            tasks: EntityStore::new(),
            index: ReservationIndex::new(),
            pending: VecDeque::new(),
        }
    }

    pub fn worker_sid(&self) -> &str {
        &self.worker_sid
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn activities(&self) -> &EntityStore<ActivityDescriptor> {
        &self.activities
    }

    pub fn channels(&self) -> &EntityStore<ChannelDescriptor> {
        &self.channels
    }

    pub fn workers(&self) -> &EntityStore<WorkerDescriptor> {
        &self.workers
    }

    pub fn task_queues(&self) -> &EntityStore<TaskQueueDescriptor> {
        &self.task_queues
    }

    pub fn reservations(&self) -> &EntityStore<ReservationDescriptor> {
        &self.reservations
    }

    pub fn tasks(&self) -> &EntityStore<TaskDescriptor> {
        &self.tasks
    }

    pub fn reservation_index(&self) -> &ReservationIndex {
        &self.index
    }

    /// This worker's own descriptor, once fetched.
    pub fn me(&self) -> Option<&Live<WorkerDescriptor>> {
        self.workers.get(&self.worker_sid)
    }

    /// The task a reservation is for.
    ///
    /// Reservation snapshots do not carry their task; the task store holds
    /// the one current copy.
    pub fn task_of(&self, reservation: &Live<ReservationDescriptor>) -> Option<&Live<TaskDescriptor>> {
        self.tasks.get(&reservation.snapshot().task_sid)
    }

    /// Loads the initial state and opens the signaling session.
    pub async fn start(&mut self) -> Result<()> {
        info!(worker = %self.worker_sid, "starting worker");
        self.fetch_worker().await?;
        self.fetch_activities().await?;
        self.fetch_channels().await?;
        self.fetch_reservations().await?;
        self.session.connect().await
    }

    /// Waits for the next event.
    ///
    /// Returns `None` once the session is closed and every event has been
    /// handed out.
    pub async fn next_event(&mut self) -> Option<WorkerEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            let event = self.session.next_event().await?;
            self.on_session_event(event).await;
        }
    }

    /// Replaces the token for both the REST API and the signaling session.
    pub async fn update_token(&mut self, token: &str) -> Result<()> {
        if token.trim().is_empty() {
            return Err(Error::InvalidArgument("token must not be empty".to_string()));
        }
        self.requester.set_token(token);
        self.session.update_token(token).await
    }

    /// Arms the token lifetime timer; see [`WorkerEvent::TokenWillExpire`].
    pub fn set_token_lifetime(&mut self, seconds: u64) -> Result<()> {
        self.session.set_lifetime(seconds)
    }

    /// Closes the session for good. Stores keep their last state.
    pub async fn disconnect(&mut self) -> Result<()> {
        self.session.disconnect().await
    }

    pub async fn fetch_activities(&mut self) -> Result<&EntityStore<ActivityDescriptor>> {
        let path = self.routes.activities();
        let fetched = self
            .activities
            .fetch_all(&self.requester, &path, &Vec::new(), self.page_size)
            .await?;
        for (live, change) in fetched {
            self.record_change(Entity::Activity(live), change);
        }
        Ok(&self.activities)
    }

    pub async fn fetch_channels(&mut self) -> Result<&EntityStore<ChannelDescriptor>> {
        let path = self.routes.channels();
        let fetched = self
            .channels
            .fetch_all(&self.requester, &path, &Vec::new(), self.page_size)
            .await?;
        for (live, change) in fetched {
            self.record_change(Entity::Channel(live), change);
        }
        Ok(&self.channels)
    }

    /// Task queues this worker is eligible for.
    pub async fn fetch_task_queues(&mut self) -> Result<&EntityStore<TaskQueueDescriptor>> {
        let path = self.routes.task_queues();
        let query = params([("WorkerSid", self.worker_sid.clone())]);
        let fetched = self
            .task_queues
            .fetch_all(&self.requester, &path, &query, self.page_size)
            .await?;
        for (live, change) in fetched {
            self.record_change(Entity::TaskQueue(live), change);
        }
        Ok(&self.task_queues)
    }

    /// Workers of the workspace, filtered by `query` (e.g. `TargetWorkersExpression`).
    pub async fn fetch_workers(&mut self, query: Params) -> Result<&EntityStore<WorkerDescriptor>> {
        let path = self.routes.workers();
        let fetched = self
            .workers
            .fetch_all(&self.requester, &path, &query, self.page_size)
            .await?;
        for (live, change) in fetched {
            self.record_change(Entity::Worker(live), change);
        }
        Ok(&self.workers)
    }

    /// This worker's own descriptor.
    pub async fn fetch_worker(&mut self) -> Result<Live<WorkerDescriptor>> {
        let raw = self.requester.get_one(&self.routes.worker()).await?;
        Ok(self.apply_worker(WorkerDescriptor::from_value(raw)?))
    }

    /// Reservations currently offered to or held by this worker.
    ///
    /// Every record runs through the same path as a push event, so known
    /// reservations are reconciled and terminal ones are retired.
    pub async fn fetch_reservations(&mut self) -> Result<&EntityStore<ReservationDescriptor>> {
        self.pull_reservations().await?;
        Ok(&self.reservations)
    }

    async fn pull_reservations(&mut self) -> Result<HashSet<String>> {
        let records = fetch_pages(
            &self.requester,
            &self.routes.reservations(),
            &Vec::new(),
            self.page_size,
        )
        .await?;
        let mut seen = HashSet::with_capacity(records.len());
        for raw in records {
            let reservation = ReservationDescriptor::from_value(raw)?;
            seen.insert(reservation.sid.clone());
            self.apply_reservation(reservation);
        }
        Ok(seen)
    }

    /// Re-reads what may have changed while the connection was down.
    async fn resync(&mut self) -> Result<()> {
        self.fetch_worker().await?;
        let seen = self.pull_reservations().await?;
        let gone = self.reservations.retain_only(&seen);
        if !gone.is_empty() {
            info!(count = gone.len(), "dropping reservations that ended while disconnected");
        }
        for live in gone {
            self.detach_reservation(live);
        }
        Ok(())
    }

    async fn on_session_event(&mut self, event: SessionEvent) {
        let event = match event {
            SessionEvent::Connected { resumed: false } => {
                info!(worker = %self.worker_sid, "worker ready");
                WorkerEvent::Ready
            }
            SessionEvent::Connected { resumed: true } => {
                self.pending.push_back(WorkerEvent::Reconnected);
                if let Err(e) = self.resync().await {
                    warn!(error = %e, "re-fetch after reconnect failed");
                }
                return;
            }
            SessionEvent::Frame(frame) => {
                match PushEvent::from_frame(&frame) {
                    Ok(event) => self.route(event),
                    Err(e) => {
                        warn!(event_type = %frame.event_type, error = %e, "dropping push frame")
                    }
                }
                return;
            }
            SessionEvent::ReconnectScheduled { attempt, delay } => {
                WorkerEvent::Disconnected { attempt, delay }
            }
            SessionEvent::Asleep => WorkerEvent::Asleep,
            SessionEvent::Awake => WorkerEvent::Awake,
            SessionEvent::TokenWillExpire => WorkerEvent::TokenWillExpire,
            SessionEvent::TokenExpired => WorkerEvent::TokenExpired,
            SessionEvent::Closed { reason } => {
                info!(%reason, "worker session closed");
                WorkerEvent::Closed { reason }
            }
        };
        self.pending.push_back(event);
    }

    /// Applies one push event to the stores.
    pub(crate) fn route(&mut self, event: PushEvent) {
        debug!(kind = %event.kind(), sid = event.sid(), "routing push event");
        match event {
            PushEvent::Reservation { reservation, .. } => {
                self.apply_reservation(reservation);
            }
            PushEvent::Task { task, .. } => self.apply_task_event(task),
            PushEvent::Transfer { event, transfer } => {
                self.apply_transfer(event, transfer);
            }
            PushEvent::Worker { worker, .. } => {
                self.apply_worker(worker);
            }
            PushEvent::Channel { channel, .. } => {
                self.apply_channel(channel);
            }
        }
    }

    fn record_change(&mut self, entity: Entity, change: Change) {
        match change {
            Change::Inserted => self.pending.push_back(WorkerEvent::Added(entity)),
            Change::Updated => self.pending.push_back(WorkerEvent::Updated(entity)),
            Change::Stale => debug!(kind = %entity.kind(), sid = entity.sid(), "ignoring stale snapshot"),
        }
    }

    fn apply_worker(&mut self, worker: WorkerDescriptor) -> Live<WorkerDescriptor> {
        let (live, change) = self.workers.upsert(worker);
        self.record_change(Entity::Worker(live.clone()), change);
        live
    }

    fn apply_channel(&mut self, channel: ChannelDescriptor) -> Live<ChannelDescriptor> {
        let (live, change) = self.channels.upsert(channel);
        self.record_change(Entity::Channel(live.clone()), change);
        live
    }

    /// Applies a reservation snapshot.
    ///
    /// Known reservations only move forward; a terminal one is updated, then
    /// retired together with its task if no other reservation holds it. An
    /// unknown terminal reservation is returned detached and not stored.
    pub(crate) fn apply_reservation(
        &mut self,
        mut incoming: ReservationDescriptor,
    ) -> Live<ReservationDescriptor> {
        let sid = incoming.sid.clone();
        let to = incoming.status;
        let held = self.reservations.get(&sid).cloned();

        if let Some(task) = incoming.task.take() {
            if held.is_some() || !to.is_terminal() {
                self.upsert_task(task);
            }
        }

        let Some(held) = held else {
            if to.is_terminal() {
                debug!(%sid, status = %to, "ignoring ended reservation not held locally");
                return Live::new(incoming);
            }
            let task_sid = incoming.task_sid.clone();
            let (live, _) = self.reservations.upsert(incoming);
            self.index.insert(&task_sid, &sid);
            info!(%sid, task = %task_sid, status = %to, "reservation created");
            self.pending
                .push_back(WorkerEvent::ReservationCreated(live.clone()));
            return live;
        };

        let from = held.snapshot().status;
        let transition = from.transition(to);
        if !transition.applies() {
            debug!(%sid, %from, %to, "ignoring stale reservation update");
            return held;
        }
        let (live, change) = self.reservations.upsert(incoming);
        if change == Change::Stale {
            debug!(%sid, "ignoring reservation update with older version");
            return live;
        }

        self.pending
            .push_back(WorkerEvent::Updated(Entity::Reservation(live.clone())));
        if transition != Transition::Unchanged {
            info!(%sid, %from, %to, "reservation transitioned");
            self.pending.push_back(WorkerEvent::ReservationTransitioned {
                reservation: live.clone(),
                from,
                to,
            });
        }
        if to.is_terminal() {
            if let Some(removed) = self.reservations.remove(&sid) {
                self.detach_reservation(removed);
            }
        }
        live
    }

    /// Drops a reservation that already left the store from the index, and
    /// its task if nothing else holds it.
    fn detach_reservation(&mut self, live: Live<ReservationDescriptor>) {
        let task_sid = live.snapshot().task_sid.clone();
        let task_released = self.index.remove(&task_sid, live.sid());
        debug!(sid = live.sid(), task = %task_sid, "reservation removed");
        self.pending
            .push_back(WorkerEvent::Removed(Entity::Reservation(live)));
        if task_released {
            self.remove_task(&task_sid);
        }
    }

    fn remove_task(&mut self, task_sid: &str) {
        if let Some(task) = self.tasks.remove(task_sid) {
            debug!(sid = task_sid, "task removed");
            self.pending.push_back(WorkerEvent::Removed(Entity::Task(task)));
        }
    }

    /// Applies a task snapshot, rejecting backward status moves.
    ///
    /// An incoming snapshot that does not mention transfers keeps the ones
    /// already held. One that does replaces them, empty or not.
    pub(crate) fn upsert_task(&mut self, mut incoming: TaskDescriptor) -> Live<TaskDescriptor> {
        let Some(held) = self.tasks.get(&incoming.sid).cloned() else {
            let (live, _) = self.tasks.upsert(incoming);
            self.pending
                .push_back(WorkerEvent::Added(Entity::Task(live.clone())));
            return live;
        };

        let current = held.snapshot();
        let from = current.status;
        let to = incoming.status;
        let transition = from.transition(to);
        if !transition.applies() {
            debug!(sid = held.sid(), %from, %to, "ignoring stale task update");
            return held;
        }
        if incoming.transfers.is_none() {
            incoming.transfers = current.transfers.clone();
        }

        let (live, change) = self.tasks.upsert(incoming);
        if change == Change::Stale {
            debug!(sid = live.sid(), "ignoring task update with older version");
            return live;
        }
        self.pending
            .push_back(WorkerEvent::Updated(Entity::Task(live.clone())));
        if transition != Transition::Unchanged {
            info!(sid = live.sid(), %from, %to, "task transitioned");
            self.pending.push_back(WorkerEvent::TaskTransitioned {
                task: live.clone(),
                from,
                to,
            });
        }
        live
    }

    fn apply_task_event(&mut self, task: TaskDescriptor) {
        let sid = task.sid.clone();
        if !self.tasks.contains(&sid) && !self.index.has_task(&sid) {
            debug!(%sid, "ignoring event for a task not reserved by this worker");
            return;
        }
        let live = self.upsert_task(task);
        if live.snapshot().status.is_terminal() && !self.index.has_task(&sid) {
            self.remove_task(&sid);
        }
    }

    /// Attaches or detaches a transfer on its task.
    pub(crate) fn apply_transfer(
        &mut self,
        event: TransferEvent,
        transfer: TransferDescriptor,
    ) -> Option<Live<TaskDescriptor>> {
        let Some(held) = self.tasks.get(&transfer.task_sid).cloned() else {
            debug!(sid = %transfer.sid, task = %transfer.task_sid, "ignoring transfer for unknown task");
            return None;
        };
        let current = held.snapshot();
        let next = if event.ends_transfer() {
            current.without_transfer(&transfer.sid)
        } else {
            current.with_transfer(transfer.clone(), &self.worker_sid)
        };

        let (live, _) = self.tasks.upsert(next);
        self.pending
            .push_back(WorkerEvent::Updated(Entity::Task(live.clone())));
        info!(sid = %transfer.sid, task = live.sid(), ?event, "transfer event");
        let task = live.clone();
        self.pending.push_back(match event {
            TransferEvent::Initiated => WorkerEvent::TransferInitiated { task, transfer },
            TransferEvent::AttemptFailed => WorkerEvent::TransferAttemptFailed { task, transfer },
            _ => WorkerEvent::TransferEnded {
                task,
                transfer,
                event,
            },
        });
        Some(live)
    }
}

#[cfg(test)]
pub(crate) mod worker_tests;
