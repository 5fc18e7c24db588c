// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::{HashMap, HashSet};

/// Task identifier to the identifiers of its reservations.
///
/// A task entry exists only while it has at least one reservation.
#[derive(Debug, Default)]
pub struct ReservationIndex {
    by_task: HashMap<String, HashSet<String>>,
}

impl ReservationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `reservation_sid` belongs to `task_sid`.
    pub fn insert(&mut self, task_sid: &str, reservation_sid: &str) {
        self.by_task
            .entry(task_sid.to_string())
            .or_default()
            .insert(reservation_sid.to_string());
    }

    /// Forgets a reservation. Returns true if the task has no reservations
    /// left (and so no entry either).
    pub fn remove(&mut self, task_sid: &str, reservation_sid: &str) -> bool {
        let Some(set) = self.by_task.get_mut(task_sid) else {
            return true;
        };
        set.remove(reservation_sid);
        if set.is_empty() {
            self.by_task.remove(task_sid);
            true
        } else {
            false
        }
    }

    /// Reservations of a task.
    pub fn reservations_of(&self, task_sid: &str) -> Option<&HashSet<String>> {
        self.by_task.get(task_sid)
    }

    pub fn has_task(&self, task_sid: &str) -> bool {
        self.by_task.contains_key(task_sid)
    }

    /// Number of tasks with at least one reservation.
    pub fn task_count(&self) -> usize {
        self.by_task.len()
    }

    pub fn clear(&mut self) {
        self.by_task.clear();
    }
}

#[cfg(test)]
#[path = "reservation_index_tests.rs"]
mod tests;
