// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote actions on reservations, tasks and the worker itself.
//!
//! Actions never change local state on their own. The only local check is
//! that the entity has not reached a terminal status; everything else is
//! decided by the service, and a successful response is applied the same
//! way a push event would be.

use serde_json::Value;
use std::sync::Arc;

use tracing::info;

use tl_core::{
    ChannelDescriptor, Descriptor, EntityKind, ReservationDescriptor, TaskDescriptor,
    TransferDescriptor, TransferEvent, TransferMode, WorkerDescriptor,
};

use super::Worker;
use crate::api::{params, Params, Requester};
use crate::error::{Error, Result};
use crate::session::Transport;
use crate::store::Live;

impl<T: Transport, R: Requester> Worker<T, R> {
    /// Actions on a reservation held by this worker.
    pub fn reservation(&mut self, reservation: &Live<ReservationDescriptor>) -> ReservationActions<'_, T, R> {
        ReservationActions {
            worker: self,
            reservation: reservation.clone(),
        }
    }

    /// Actions on a task reserved to this worker.
    pub fn task(&mut self, task: &Live<TaskDescriptor>) -> TaskActions<'_, T, R> {
        TaskActions {
            worker: self,
            task: task.clone(),
        }
    }

    /// Replaces this worker's attributes.
    pub async fn set_attributes(&mut self, attributes: &Value) -> Result<Live<WorkerDescriptor>> {
        let form = params([("Attributes", serde_json::to_string(attributes)?)]);
        self.update_worker(form).await
    }

    /// Makes `activity_sid` the worker's current activity.
    pub async fn set_activity(&mut self, activity_sid: &str) -> Result<Live<WorkerDescriptor>> {
        if !self.activities.contains(activity_sid) {
            return Err(Error::NotFound {
                kind: EntityKind::Activity,
                sid: activity_sid.to_string(),
            });
        }
        info!(activity = activity_sid, "changing activity");
        let form = params([("ActivitySid", activity_sid.to_string())]);
        self.update_worker(form).await
    }

    pub async fn set_channel_capacity(
        &mut self,
        channel_sid: &str,
        capacity: u32,
    ) -> Result<Live<ChannelDescriptor>> {
        let form = params([("Capacity", capacity.to_string())]);
        self.update_channel(channel_sid, form).await
    }

    pub async fn set_channel_availability(
        &mut self,
        channel_sid: &str,
        available: bool,
    ) -> Result<Live<ChannelDescriptor>> {
        let form = params([("Available", available.to_string())]);
        self.update_channel(channel_sid, form).await
    }

    async fn update_worker(&mut self, form: Params) -> Result<Live<WorkerDescriptor>> {
        let raw = self.requester.post(&self.routes.worker(), form).await?;
        Ok(self.apply_worker(WorkerDescriptor::from_value(raw)?))
    }

    async fn update_channel(
        &mut self,
        channel_sid: &str,
        form: Params,
    ) -> Result<Live<ChannelDescriptor>> {
        if !self.channels.contains(channel_sid) {
            return Err(Error::NotFound {
                kind: EntityKind::Channel,
                sid: channel_sid.to_string(),
            });
        }
        let raw = self
            .requester
            .post(&self.routes.channel(channel_sid), form)
            .await?;
        Ok(self.apply_channel(ChannelDescriptor::from_value(raw)?))
    }
}

/// Actions on one reservation, borrowed from its [`Worker`].
pub struct ReservationActions<'w, T: Transport, R: Requester> {
    worker: &'w mut Worker<T, R>,
    reservation: Live<ReservationDescriptor>,
}

impl<T: Transport, R: Requester> ReservationActions<'_, T, R> {
    pub async fn accept(self) -> Result<Live<ReservationDescriptor>> {
        self.update(params([("ReservationStatus", "accepted".to_string())]))
            .await
    }

    /// Declines the offer, optionally moving the worker to `activity_sid`.
    pub async fn reject(self, activity_sid: Option<&str>) -> Result<Live<ReservationDescriptor>> {
        let mut form = params([("ReservationStatus", "rejected".to_string())]);
        if let Some(activity_sid) = activity_sid {
            form.push(("WorkerActivitySid".to_string(), activity_sid.to_string()));
        }
        self.update(form).await
    }

    pub async fn complete(self) -> Result<Live<ReservationDescriptor>> {
        self.update(params([("ReservationStatus", "completed".to_string())]))
            .await
    }

    pub async fn wrap(self) -> Result<Live<ReservationDescriptor>> {
        self.update(params([("ReservationStatus", "wrapping".to_string())]))
            .await
    }

    /// Places an outbound call from `from` and bridges it to the task's call.
    pub async fn call(
        self,
        from: &str,
        url: &str,
        options: Params,
    ) -> Result<Live<ReservationDescriptor>> {
        let mut form = params([
            ("Instruction", "call".to_string()),
            ("CallFrom", from.to_string()),
            ("CallUrl", url.to_string()),
        ]);
        form.extend(options);
        self.update(form).await
    }

    /// Connects the queued call to this worker.
    pub async fn dequeue(self, options: Params) -> Result<Live<ReservationDescriptor>> {
        let mut form = params([("Instruction", "dequeue".to_string())]);
        form.extend(options);
        self.update(form).await
    }

    /// Sends the call `call_sid` to new instructions at `url`.
    pub async fn redirect(
        self,
        call_sid: &str,
        url: &str,
        options: Params,
    ) -> Result<Live<ReservationDescriptor>> {
        let mut form = params([
            ("Instruction", "redirect".to_string()),
            ("RedirectCallSid", call_sid.to_string()),
            ("RedirectUrl", url.to_string()),
        ]);
        form.extend(options);
        self.update(form).await
    }

    /// Joins the worker and the customer in a conference.
    pub async fn conference(self, options: Params) -> Result<Live<ReservationDescriptor>> {
        let mut form = params([("Instruction", "conference".to_string())]);
        form.extend(options);
        self.update(form).await
    }

    /// Changes how this worker participates in the reservation's conference.
    pub async fn update_participant(self, options: Params) -> Result<Live<ReservationDescriptor>> {
        if options.is_empty() {
            return Err(Error::InvalidArgument(
                "participant update needs at least one parameter".to_string(),
            ));
        }
        self.update(options).await
    }

    /// Re-reads the reservation from the service.
    pub async fn fetch_latest(self) -> Result<Live<ReservationDescriptor>> {
        self.ensure_active()?;
        let path = self.worker.routes.reservation(self.reservation.sid());
        let raw = self.worker.requester.get_one(&path).await?;
        Ok(self
            .worker
            .apply_reservation(ReservationDescriptor::from_value(raw)?))
    }

    fn ensure_active(&self) -> Result<Arc<ReservationDescriptor>> {
        let snapshot = self.reservation.snapshot();
        if snapshot.status.is_terminal() {
            return Err(Error::TerminalState {
                kind: EntityKind::Reservation,
                sid: snapshot.sid.clone(),
                status: snapshot.status.to_string(),
            });
        }
        Ok(snapshot)
    }

    async fn update(self, form: Params) -> Result<Live<ReservationDescriptor>> {
        self.ensure_active()?;
        let path = self.worker.routes.reservation(self.reservation.sid());
        let raw = self.worker.requester.post(&path, form).await?;
        Ok(self
            .worker
            .apply_reservation(ReservationDescriptor::from_value(raw)?))
    }
}

/// Actions on one task, borrowed from its [`Worker`].
pub struct TaskActions<'w, T: Transport, R: Requester> {
    worker: &'w mut Worker<T, R>,
    task: Live<TaskDescriptor>,
}

impl<T: Transport, R: Requester> TaskActions<'_, T, R> {
    pub async fn complete(self, reason: &str) -> Result<Live<TaskDescriptor>> {
        self.update(params([
            ("AssignmentStatus", "completed".to_string()),
            ("Reason", reason.to_string()),
        ]))
        .await
    }

    pub async fn wrap(self, reason: &str) -> Result<Live<TaskDescriptor>> {
        self.update(params([
            ("AssignmentStatus", "wrapping".to_string()),
            ("Reason", reason.to_string()),
        ]))
        .await
    }

    pub async fn set_attributes(self, attributes: &Value) -> Result<Live<TaskDescriptor>> {
        let form = params([("Attributes", serde_json::to_string(attributes)?)]);
        self.update(form).await
    }

    /// Transfers the task to a worker or queue.
    ///
    /// The new transfer is attached as the task's outgoing transfer.
    pub async fn transfer(
        self,
        to: &str,
        mode: TransferMode,
        attributes: Option<&Value>,
    ) -> Result<Live<TaskDescriptor>> {
        self.ensure_active()?;
        if to.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "transfer target must not be empty".to_string(),
            ));
        }
        let mut form = params([("To", to.to_string()), ("Mode", mode.as_str().to_string())]);
        if let Some(attributes) = attributes {
            form.push(("Attributes".to_string(), serde_json::to_string(attributes)?));
        }

        let path = self.worker.routes.transfers(self.task.sid());
        let raw = self.worker.requester.post(&path, form).await?;
        let transfer = TransferDescriptor::from_value(raw)?;
        self.attach(TransferEvent::Initiated, transfer)
    }

    /// Cancels the task's outgoing transfer.
    pub async fn cancel_transfer(self) -> Result<Live<TaskDescriptor>> {
        let snapshot = self.ensure_active()?;
        let Some(outgoing) = snapshot.outgoing_transfer() else {
            return Err(Error::InvalidArgument(format!(
                "task {} has no outgoing transfer",
                snapshot.sid
            )));
        };
        let path = self.worker.routes.transfer(self.task.sid(), &outgoing.sid);
        let form = params([("TransferStatus", "canceled".to_string())]);
        let raw = self.worker.requester.post(&path, form).await?;
        let transfer = TransferDescriptor::from_value(raw)?;
        let event = if transfer.transfer_status.is_terminal() {
            TransferEvent::Canceled
        } else {
            TransferEvent::Initiated
        };
        self.attach(event, transfer)
    }

    /// Puts `target_worker_sid` on or off hold in the task's conference.
    pub async fn hold(self, target_worker_sid: &str, on_hold: bool) -> Result<()> {
        let form = params([
            ("TargetWorkerSid", target_worker_sid.to_string()),
            ("Hold", on_hold.to_string()),
        ]);
        self.participants(form).await
    }

    /// Removes `worker_sid` from the task's conference.
    pub async fn kick(self, worker_sid: &str) -> Result<()> {
        let form = params([
            ("TargetWorkerSid", worker_sid.to_string()),
            ("Action", "kick".to_string()),
        ]);
        self.participants(form).await
    }

    /// Changes how the customer participates in the task's conference.
    pub async fn update_participant(self, options: Params) -> Result<()> {
        if options.is_empty() {
            return Err(Error::InvalidArgument(
                "participant update needs at least one parameter".to_string(),
            ));
        }
        self.participants(options).await
    }

    /// Re-reads the task from the service.
    pub async fn fetch_latest(self) -> Result<Live<TaskDescriptor>> {
        self.ensure_active()?;
        let raw = self
            .worker
            .requester
            .get_one(&self.worker.routes.task(self.task.sid()))
            .await?;
        Ok(self.worker.upsert_task(TaskDescriptor::from_value(raw)?))
    }

    fn ensure_active(&self) -> Result<Arc<TaskDescriptor>> {
        let snapshot = self.task.snapshot();
        if snapshot.status.is_terminal() {
            return Err(Error::TerminalState {
                kind: EntityKind::Task,
                sid: snapshot.sid.clone(),
                status: snapshot.status.to_string(),
            });
        }
        Ok(snapshot)
    }

    async fn update(self, form: Params) -> Result<Live<TaskDescriptor>> {
        self.ensure_active()?;
        let raw = self
            .worker
            .requester
            .post(&self.worker.routes.task(self.task.sid()), form)
            .await?;
        Ok(self.worker.upsert_task(TaskDescriptor::from_value(raw)?))
    }

    /// Participant changes do not return task state.
    async fn participants(self, form: Params) -> Result<()> {
        self.ensure_active()?;
        self.worker
            .requester
            .post(&self.worker.routes.participants(self.task.sid()), form)
            .await?;
        Ok(())
    }

    fn attach(self, event: TransferEvent, transfer: TransferDescriptor) -> Result<Live<TaskDescriptor>> {
        match self.worker.apply_transfer(event, transfer) {
            Some(live) => Ok(live),
            // Task left the local view while the request was in flight.
            None => Ok(self.task),
        }
    }
}

#[cfg(test)]
#[path = "actions_tests.rs"]
mod tests;
