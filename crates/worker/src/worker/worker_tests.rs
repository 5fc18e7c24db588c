// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the worker: push routing, store reconciliation and the
//! session lifecycle as seen by the caller.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use crate::api::requester_tests::MockRequester;
use crate::error::ErrorKind;
use crate::session::transport_tests::{Inbound, MockTransport};
use crate::test_helpers::{
    activity_json, channel_json, reservation_json, reservation_with_task, task_json,
    transfer_json, versioned, worker_json,
};
use serde_json::Value;
use std::time::Duration;
use tl_core::{BackoffPolicy, ClientFrame, PushFrame, ReservationStatus, TaskStatus};

pub type TestWorker = Worker<MockTransport, MockRequester>;

pub const WORKER: &str = "Workspaces/WS1/Workers/WK1";
pub const ACTIVITIES: &str = "Workspaces/WS1/Activities";
pub const CHANNELS: &str = "Workspaces/WS1/Workers/WK1/Channels";
pub const RESERVATIONS: &str = "Workspaces/WS1/Workers/WK1/Reservations";

pub fn options() -> WorkerOptions {
    WorkerOptions {
        workspace_sid: "WS1".to_string(),
        worker_sid: "WK1".to_string(),
        page_size: 50,
        session: SessionConfig {
            url: "ws://mock".to_string(),
            worker_sid: "WK1".to_string(),
            close_existing_sessions: false,
            backoff: BackoffPolicy::new(Duration::from_millis(100), Duration::from_secs(1), 1.0)
                .unwrap(),
            heartbeat_interval: Duration::from_secs(1),
            sleep_after: Duration::from_secs(600),
            token_refresh_margin: Duration::from_secs(10),
        },
    }
}

pub fn fixture() -> (TestWorker, MockTransport, MockRequester) {
    let transport = MockTransport::new();
    let requester = MockRequester::new();
    let worker = Worker::with_parts(options(), transport.clone(), requester.clone(), "tok-1");
    (worker, transport, requester)
}

/// Routes a push frame as if it had arrived on the session.
pub fn deliver(worker: &mut TestWorker, event_type: &str, payload: Value) {
    let event = PushEvent::from_frame(&PushFrame::new(event_type, payload)).unwrap();
    worker.route(event);
}

/// Takes every queued event, as short labels.
pub fn drain(worker: &mut TestWorker) -> Vec<String> {
    worker.pending.drain(..).map(|e| label(&e)).collect()
}

pub fn label(event: &WorkerEvent) -> String {
    match event {
        WorkerEvent::Ready => "ready".to_string(),
        WorkerEvent::Reconnected => "reconnected".to_string(),
        WorkerEvent::Disconnected { attempt, .. } => format!("disconnected {}", attempt),
        WorkerEvent::Asleep => "asleep".to_string(),
        WorkerEvent::Awake => "awake".to_string(),
        WorkerEvent::TokenWillExpire => "token will expire".to_string(),
        WorkerEvent::TokenExpired => "token expired".to_string(),
        WorkerEvent::Closed { reason } => format!("closed {}", reason),
        WorkerEvent::Added(e) => format!("added {} {}", e.kind(), e.sid()),
        WorkerEvent::Updated(e) => format!("updated {} {}", e.kind(), e.sid()),
        WorkerEvent::Removed(e) => format!("removed {} {}", e.kind(), e.sid()),
        WorkerEvent::ReservationCreated(r) => format!("created {}", r.sid()),
        WorkerEvent::ReservationTransitioned {
            reservation,
            from,
            to,
        } => format!("{} {} -> {}", reservation.sid(), from, to),
        WorkerEvent::TaskTransitioned { task, from, to } => {
            format!("{} {} -> {}", task.sid(), from, to)
        }
        WorkerEvent::TransferInitiated { transfer, .. } => {
            format!("transfer initiated {}", transfer.sid)
        }
        WorkerEvent::TransferAttemptFailed { transfer, .. } => {
            format!("transfer attempt failed {}", transfer.sid)
        }
        WorkerEvent::TransferEnded {
            transfer, event, ..
        } => format!("transfer ended {} {:?}", transfer.sid, event),
    }
}

async fn next(worker: &mut TestWorker) -> String {
    label(&worker.next_event().await.expect("worker ended"))
}

/// A worker holding reservation `WR1` for task `WT1`.
pub fn with_reservation(reservation_status: &str, task_status: &str) -> (TestWorker, MockTransport, MockRequester) {
    let (mut worker, transport, requester) = fixture();
    deliver(
        &mut worker,
        "reservation.created",
        reservation_with_task("WR1", "WT1", reservation_status, task_status),
    );
    drain(&mut worker);
    (worker, transport, requester)
}

fn reservation_status(worker: &TestWorker, sid: &str) -> ReservationStatus {
    worker.reservations().get(sid).unwrap().snapshot().status
}

#[tokio::test(start_paused = true)]
async fn start_loads_state_then_reports_ready() {
    let (mut worker, transport, requester) = fixture();
    requester.record(WORKER, worker_json("WK1", "WA1", "Available"));
    requester.page(
        ACTIVITIES,
        vec![
            activity_json("WA1", "Available", true),
            activity_json("WA2", "Offline", false),
        ],
        None,
    );
    requester.page(CHANNELS, vec![channel_json("WC1", 1, true)], None);
    requester.page(
        RESERVATIONS,
        vec![reservation_with_task("WR1", "WT1", "pending", "reserved")],
        None,
    );

    worker.start().await.unwrap();

    assert_eq!(transport.connects(), 1);
    assert_eq!(transport.sent(), vec![ClientFrame::init("tok-1", "WK1", false)]);
    assert_eq!(worker.me().unwrap().snapshot().activity_name, "Available");
    assert_eq!(worker.activities().sids(), vec!["WA1", "WA2"]);

    let mut events = Vec::new();
    for _ in 0..7 {
        events.push(next(&mut worker).await);
    }
    assert_eq!(
        events,
        vec![
            "added worker WK1",
            "added activity WA1",
            "added activity WA2",
            "added channel WC1",
            "added task WT1",
            "created WR1",
            "ready",
        ]
    );
}

#[tokio::test]
async fn start_fails_before_connecting_when_bootstrap_fails() {
    let (mut worker, transport, _requester) = fixture();

    let err = worker.start().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Connectivity);
    assert_eq!(transport.connects(), 0);
    assert_eq!(worker.session_state(), SessionState::Idle);
}

#[test]
fn new_reservation_is_stored_and_indexed() {
    let (mut worker, _, _) = fixture();
    deliver(
        &mut worker,
        "reservation.created",
        reservation_with_task("WR1", "WT1", "pending", "reserved"),
    );

    assert_eq!(drain(&mut worker), vec!["added task WT1", "created WR1"]);
    let reservation = worker.reservations().get("WR1").unwrap().clone();
    assert!(reservation.snapshot().task.is_none());
    assert_eq!(worker.task_of(&reservation).unwrap().sid(), "WT1");
    assert!(worker.reservation_index().has_task("WT1"));
}

#[test]
fn remote_accept_moves_reservation_forward() {
    let (mut worker, _, _) = with_reservation("pending", "reserved");
    let held = worker.reservations().get("WR1").unwrap().clone();

    deliver(
        &mut worker,
        "reservation.accepted",
        reservation_json("WR1", "WT1", "accepted"),
    );

    assert_eq!(
        drain(&mut worker),
        vec!["updated reservation WR1", "WR1 pending -> accepted"]
    );
    assert_eq!(held.snapshot().status, ReservationStatus::Accepted);
}

#[test]
fn backward_reservation_update_is_ignored() {
    let (mut worker, _, _) = with_reservation("pending", "reserved");
    deliver(
        &mut worker,
        "reservation.accepted",
        reservation_json("WR1", "WT1", "accepted"),
    );
    drain(&mut worker);

    deliver(
        &mut worker,
        "reservation.created",
        reservation_json("WR1", "WT1", "pending"),
    );

    assert!(drain(&mut worker).is_empty());
    assert_eq!(reservation_status(&worker, "WR1"), ReservationStatus::Accepted);
}

#[test]
fn older_version_is_ignored() {
    let (mut worker, _, _) = fixture();
    deliver(
        &mut worker,
        "reservation.created",
        versioned(reservation_json("WR1", "WT1", "accepted"), 3),
    );
    drain(&mut worker);

    let mut older = versioned(reservation_json("WR1", "WT1", "accepted"), 2);
    older["timeout"] = serde_json::json!(5);
    deliver(&mut worker, "reservation.accepted", older);

    assert!(drain(&mut worker).is_empty());
    assert_eq!(worker.reservations().get("WR1").unwrap().snapshot().timeout, 120);
}

#[test]
fn terminal_reservation_is_retired_with_its_task() {
    let (mut worker, _, _) = with_reservation("pending", "reserved");
    let held = worker.reservations().get("WR1").unwrap().clone();
    deliver(
        &mut worker,
        "reservation.accepted",
        reservation_json("WR1", "WT1", "accepted"),
    );
    drain(&mut worker);

    deliver(
        &mut worker,
        "reservation.completed",
        reservation_json("WR1", "WT1", "completed"),
    );

    assert_eq!(
        drain(&mut worker),
        vec![
            "updated reservation WR1",
            "WR1 accepted -> completed",
            "removed reservation WR1",
            "removed task WT1",
        ]
    );
    assert_eq!(held.snapshot().status, ReservationStatus::Completed);
    assert!(worker.reservations().is_empty());
    assert!(worker.tasks().is_empty());
    assert_eq!(worker.reservation_index().task_count(), 0);
}

#[test]
fn task_stays_while_another_reservation_holds_it() {
    let (mut worker, _, _) = with_reservation("pending", "reserved");
    deliver(
        &mut worker,
        "reservation.created",
        reservation_json("WR2", "WT1", "pending"),
    );
    drain(&mut worker);

    deliver(
        &mut worker,
        "reservation.rejected",
        reservation_json("WR1", "WT1", "rejected"),
    );
    assert_eq!(
        drain(&mut worker),
        vec![
            "updated reservation WR1",
            "WR1 pending -> rejected",
            "removed reservation WR1",
        ]
    );
    assert!(worker.tasks().contains("WT1"));
    assert_eq!(
        worker.reservation_index().reservations_of("WT1").map(|r| r.len()),
        Some(1)
    );

    deliver(
        &mut worker,
        "reservation.rescinded",
        reservation_json("WR2", "WT1", "rescinded"),
    );
    let events = drain(&mut worker);
    assert_eq!(events.last().map(String::as_str), Some("removed task WT1"));
    assert!(worker.tasks().is_empty());
}

#[test]
fn unknown_terminal_reservation_is_not_stored() {
    let (mut worker, _, _) = fixture();
    deliver(
        &mut worker,
        "reservation.timeout",
        reservation_with_task("WR9", "WT9", "timeout", "pending"),
    );

    assert!(drain(&mut worker).is_empty());
    assert!(worker.reservations().is_empty());
    assert!(worker.tasks().is_empty());
}

#[test]
fn task_updates_apply_only_to_reserved_tasks() {
    let (mut worker, _, _) = with_reservation("accepted", "reserved");

    deliver(&mut worker, "task.updated", task_json("WT1", "assigned"));
    assert_eq!(
        drain(&mut worker),
        vec!["updated task WT1", "WT1 reserved -> assigned"]
    );

    deliver(&mut worker, "task.updated", task_json("WT1", "reserved"));
    assert!(drain(&mut worker).is_empty());
    assert_eq!(
        worker.tasks().get("WT1").unwrap().snapshot().status,
        TaskStatus::Assigned
    );

    deliver(&mut worker, "task.updated", task_json("WT9", "assigned"));
    assert!(drain(&mut worker).is_empty());
    assert!(!worker.tasks().contains("WT9"));
}

#[test]
fn canceled_task_waits_for_its_reservation() {
    let (mut worker, _, _) = with_reservation("pending", "reserved");

    deliver(&mut worker, "task.canceled", task_json("WT1", "canceled"));
    assert_eq!(
        drain(&mut worker),
        vec!["updated task WT1", "WT1 reserved -> canceled"]
    );
    assert!(worker.tasks().contains("WT1"));

    deliver(
        &mut worker,
        "reservation.canceled",
        reservation_json("WR1", "WT1", "canceled"),
    );
    assert_eq!(
        drain(&mut worker),
        vec![
            "updated reservation WR1",
            "WR1 pending -> canceled",
            "removed reservation WR1",
            "removed task WT1",
        ]
    );
}

#[test]
fn transfers_attach_and_detach() {
    let (mut worker, _, _) = with_reservation("accepted", "assigned");
    let task = worker.tasks().get("WT1").unwrap().clone();

    deliver(
        &mut worker,
        "task.transfer-initiated",
        transfer_json("TT1", "WT1", "WK1", "initiated"),
    );
    assert_eq!(
        drain(&mut worker),
        vec!["updated task WT1", "transfer initiated TT1"]
    );
    let snapshot = task.snapshot();
    assert_eq!(
        snapshot.outgoing_transfer().map(|t| t.sid.as_str()),
        Some("TT1")
    );
    assert!(snapshot.incoming_transfer().is_none());

    // A plain task update keeps the attached transfer.
    deliver(&mut worker, "task.updated", task_json("WT1", "assigned"));
    assert_eq!(drain(&mut worker), vec!["updated task WT1"]);
    assert!(task.snapshot().outgoing_transfer().is_some());

    deliver(
        &mut worker,
        "task.transfer-attempt-failed",
        transfer_json("TT1", "WT1", "WK1", "initiated"),
    );
    assert_eq!(
        drain(&mut worker),
        vec!["updated task WT1", "transfer attempt failed TT1"]
    );
    assert!(task.snapshot().outgoing_transfer().is_some());

    deliver(
        &mut worker,
        "task.transfer-completed",
        transfer_json("TT1", "WT1", "WK1", "completed"),
    );
    assert_eq!(
        drain(&mut worker),
        vec!["updated task WT1", "transfer ended TT1 Completed"]
    );
    assert!(task.snapshot().outgoing_transfer().is_none());
}

#[test]
fn transfer_from_another_worker_is_incoming() {
    let (mut worker, _, _) = with_reservation("pending", "reserved");
    deliver(
        &mut worker,
        "task.transfer-initiated",
        transfer_json("TT2", "WT1", "WK2", "initiated"),
    );

    let snapshot = worker.tasks().get("WT1").unwrap().snapshot();
    assert_eq!(
        snapshot.incoming_transfer().map(|t| t.sid.as_str()),
        Some("TT2")
    );
    assert!(snapshot.outgoing_transfer().is_none());
}

#[test]
fn transfer_for_unknown_task_is_ignored() {
    let (mut worker, _, _) = fixture();
    deliver(
        &mut worker,
        "task.transfer-initiated",
        transfer_json("TT1", "WT9", "WK1", "initiated"),
    );
    assert!(drain(&mut worker).is_empty());
}

#[test]
fn worker_and_channel_pushes_update_in_place() {
    let (mut worker, _, _) = fixture();
    deliver(
        &mut worker,
        "worker.activity.update",
        worker_json("WK1", "WA1", "Available"),
    );
    let me = worker.me().unwrap().clone();
    deliver(
        &mut worker,
        "worker.activity.update",
        worker_json("WK1", "WA2", "Busy"),
    );
    deliver(
        &mut worker,
        "worker.capacity.update",
        channel_json("WC1", 3, true),
    );

    assert_eq!(
        drain(&mut worker),
        vec!["added worker WK1", "updated worker WK1", "added channel WC1"]
    );
    assert_eq!(me.snapshot().activity_name, "Busy");
    assert!(me.ptr_eq(worker.me().unwrap()));
    assert_eq!(worker.channels().get("WC1").unwrap().snapshot().capacity, 3);
}

#[tokio::test(start_paused = true)]
async fn undecodable_frames_are_dropped() {
    let (mut worker, transport, _) = fixture();
    worker.session.connect().await.unwrap();
    assert_eq!(next(&mut worker).await, "ready");

    transport.push_frame(PushFrame::new(
        "reservation.created",
        serde_json::json!({ "sid": "WR1" }),
    ));
    transport.push_frame(PushFrame::new("workspace.updated", serde_json::json!({})));
    transport.push_frame(PushFrame::new(
        "reservation.created",
        reservation_json("WR2", "WT2", "pending"),
    ));

    assert_eq!(next(&mut worker).await, "created WR2");
    assert!(!worker.reservations().contains("WR1"));
    assert_eq!(transport.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn reconnect_refetches_and_drops_ended_reservations() {
    let (mut worker, transport, requester) = fixture();
    worker.session.connect().await.unwrap();
    assert_eq!(next(&mut worker).await, "ready");
    deliver(
        &mut worker,
        "reservation.created",
        reservation_with_task("WR1", "WT1", "pending", "reserved"),
    );
    deliver(
        &mut worker,
        "reservation.created",
        reservation_json("WR2", "WT2", "accepted"),
    );
    drain(&mut worker);

    requester.record(WORKER, worker_json("WK1", "WA1", "Available"));
    requester.page(
        RESERVATIONS,
        vec![reservation_json("WR2", "WT2", "wrapping")],
        None,
    );
    transport.push(Inbound::Close);

    let mut events = Vec::new();
    for _ in 0..7 {
        events.push(next(&mut worker).await);
    }
    assert_eq!(
        events,
        vec![
            "disconnected 0",
            "reconnected",
            "added worker WK1",
            "updated reservation WR2",
            "WR2 accepted -> wrapping",
            "removed reservation WR1",
            "removed task WT1",
        ]
    );
    assert_eq!(worker.reservations().sids(), vec!["WR2"]);
    assert_eq!(worker.session_state(), SessionState::Open);
}

#[tokio::test(start_paused = true)]
async fn failed_refetch_keeps_the_session_running() {
    let (mut worker, transport, _) = fixture();
    worker.session.connect().await.unwrap();
    assert_eq!(next(&mut worker).await, "ready");

    transport.push(Inbound::Error("reset by peer".into()));
    assert_eq!(next(&mut worker).await, "disconnected 0");
    assert_eq!(next(&mut worker).await, "reconnected");

    transport.push_frame(PushFrame::new(
        "reservation.created",
        reservation_json("WR1", "WT1", "pending"),
    ));
    assert_eq!(next(&mut worker).await, "created WR1");
}

#[tokio::test(start_paused = true)]
async fn session_replaced_ends_the_worker() {
    let (mut worker, transport, _) = fixture();
    worker.session.connect().await.unwrap();
    assert_eq!(next(&mut worker).await, "ready");

    transport.push_frame(PushFrame::new(
        "disconnect",
        serde_json::json!({ "reason": "session_replaced" }),
    ));

    assert_eq!(next(&mut worker).await, "closed session_replaced");
    assert!(worker.next_event().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn update_token_reaches_requester_and_session() {
    let (mut worker, transport, requester) = fixture();
    worker.session.connect().await.unwrap();
    assert_eq!(next(&mut worker).await, "ready");

    worker.update_token("tok-2").await.unwrap();

    assert_eq!(requester.token(), "tok-2");
    assert_eq!(
        transport.sent().last(),
        Some(&ClientFrame::token_update("tok-2"))
    );
}

#[tokio::test]
async fn empty_token_is_rejected_locally() {
    let (mut worker, transport, requester) = fixture();

    let err = worker.update_token("  ").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(requester.token(), "");
    assert!(transport.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn token_lifetime_raises_will_expire() {
    let (mut worker, _, _) = fixture();
    worker.session.connect().await.unwrap();
    assert_eq!(next(&mut worker).await, "ready");

    assert!(worker.set_token_lifetime(0).is_err());
    worker.set_token_lifetime(70).unwrap();

    assert_eq!(next(&mut worker).await, "token will expire");
}

#[tokio::test(start_paused = true)]
async fn disconnect_closes_for_good() {
    let (mut worker, _, _) = fixture();
    worker.session.connect().await.unwrap();
    assert_eq!(next(&mut worker).await, "ready");

    worker.disconnect().await.unwrap();

    assert_eq!(next(&mut worker).await, "closed client disconnect");
    assert!(worker.next_event().await.is_none());
    assert_eq!(worker.session_state(), SessionState::Closed);
}
