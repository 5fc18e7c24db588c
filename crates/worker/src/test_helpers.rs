// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers: raw records as the service would send them.

use serde_json::{json, Value};

const CREATED: &str = "2026-01-05T10:00:00Z";
const UPDATED: &str = "2026-01-05T10:05:00Z";

pub fn activity_json(sid: &str, name: &str, available: bool) -> Value {
    json!({
        "sid": sid,
        "friendly_name": name,
        "available": available,
        "date_created": CREATED,
        "date_updated": UPDATED,
    })
}

pub fn channel_json(sid: &str, capacity: u32, available: bool) -> Value {
    json!({
        "sid": sid,
        "task_channel_sid": format!("TC{}", sid),
        "task_channel_unique_name": "voice",
        "available": available,
        "capacity": capacity,
        "configured_capacity": capacity,
        "date_created": CREATED,
        "date_updated": UPDATED,
    })
}

pub fn worker_json(sid: &str, activity_sid: &str, activity_name: &str) -> Value {
    json!({
        "sid": sid,
        "friendly_name": "Alice",
        "workspace_sid": "WS1",
        "activity_sid": activity_sid,
        "activity_name": activity_name,
        "available": activity_name == "Available",
        "attributes": { "skills": ["support"] },
        "date_created": CREATED,
        "date_updated": UPDATED,
    })
}

pub fn task_json(sid: &str, status: &str) -> Value {
    json!({
        "sid": sid,
        "queue_sid": "WQ1",
        "queue_name": "Support",
        "task_channel_unique_name": "voice",
        "assignment_status": status,
        "priority": 1,
        "attributes": { "customer": "C1" },
        "date_created": CREATED,
        "date_updated": UPDATED,
    })
}

pub fn reservation_json(sid: &str, task_sid: &str, status: &str) -> Value {
    json!({
        "sid": sid,
        "worker_sid": "WK1",
        "workspace_sid": "WS1",
        "task_sid": task_sid,
        "reservation_status": status,
        "timeout": 120,
        "date_created": CREATED,
        "date_updated": UPDATED,
    })
}

/// A reservation carrying its task.
pub fn reservation_with_task(sid: &str, task_sid: &str, status: &str, task_status: &str) -> Value {
    let mut raw = reservation_json(sid, task_sid, status);
    raw["task"] = task_json(task_sid, task_status);
    raw
}

pub fn transfer_json(sid: &str, task_sid: &str, initiator: &str, status: &str) -> Value {
    json!({
        "sid": sid,
        "task_sid": task_sid,
        "reservation_sid": "WR1",
        "worker_sid": initiator,
        "to": "WK2",
        "transfer_type": "worker",
        "mode": "WARM",
        "transfer_status": status,
        "date_created": CREATED,
        "date_updated": UPDATED,
    })
}

/// Sets `version` on a raw record.
pub fn versioned(mut raw: Value, version: u64) -> Value {
    raw["version"] = json!(version);
    raw
}
