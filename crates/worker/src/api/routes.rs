// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! REST paths, relative to the API base URL.

/// Builds resource paths for one worker in one workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routes {
    workspace_sid: String,
    worker_sid: String,
}

impl Routes {
    pub fn new(workspace_sid: impl Into<String>, worker_sid: impl Into<String>) -> Self {
        Routes {
            workspace_sid: workspace_sid.into(),
            worker_sid: worker_sid.into(),
        }
    }

    fn workspace(&self) -> String {
        format!("Workspaces/{}", self.workspace_sid)
    }

    pub fn activities(&self) -> String {
        format!("{}/Activities", self.workspace())
    }

    pub fn task_queues(&self) -> String {
        format!("{}/TaskQueues", self.workspace())
    }

    pub fn workers(&self) -> String {
        format!("{}/Workers", self.workspace())
    }

    /// The signed-in worker.
    pub fn worker(&self) -> String {
        format!("{}/{}", self.workers(), self.worker_sid)
    }

    pub fn channels(&self) -> String {
        format!("{}/Channels", self.worker())
    }

    pub fn channel(&self, channel_sid: &str) -> String {
        format!("{}/{}", self.channels(), channel_sid)
    }

    pub fn reservations(&self) -> String {
        format!("{}/Reservations", self.worker())
    }

    pub fn reservation(&self, reservation_sid: &str) -> String {
        format!("{}/{}", self.reservations(), reservation_sid)
    }

    pub fn task(&self, task_sid: &str) -> String {
        format!("{}/Tasks/{}", self.workspace(), task_sid)
    }

    pub fn transfers(&self, task_sid: &str) -> String {
        format!("{}/Transfers", self.task(task_sid))
    }

    pub fn transfer(&self, task_sid: &str, transfer_sid: &str) -> String {
        format!("{}/{}", self.transfers(task_sid), transfer_sid)
    }

    pub fn participants(&self, task_sid: &str) -> String {
        format!("{}/Participants", self.task(task_sid))
    }
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
