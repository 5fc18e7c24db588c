// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::WorkerConfig;

#[derive(Parser, Debug)]
#[command(name = "taskline")]
#[command(about = "Worker-side session and state-sync runtime for a task-distribution service")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect as a worker and log every event until interrupted
    Run(RunArgs),

    /// Check a configuration file and exit
    CheckConfig {
        /// Path to the TOML configuration
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the TOML configuration
    #[arg(short, long)]
    pub config: PathBuf,

    /// Access token for the service
    #[arg(long, env = "TASKLINE_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Token lifetime in seconds; a warning is logged before it runs out
    #[arg(long)]
    pub lifetime: Option<u64>,

    /// Worker to sign in as (overrides the config file)
    #[arg(long)]
    pub worker_sid: Option<String>,

    /// Workspace of the worker (overrides the config file)
    #[arg(long)]
    pub workspace_sid: Option<String>,
}

impl RunArgs {
    /// Applies command-line overrides to a loaded configuration.
    pub fn apply(&self, config: &mut WorkerConfig) {
        if let Some(sid) = &self.worker_sid {
            config.worker_sid = sid.clone();
        }
        if let Some(sid) = &self.workspace_sid {
            config.workspace_sid = sid.clone();
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
