// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! taskline: connect as a worker and log what happens.

use clap::Parser;
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, info, warn};

use taskline::{Cli, Command, Result, RunArgs, Worker, WorkerConfig, WorkerEvent};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Command::CheckConfig { config } => check_config(&config),
        Command::Run(args) => run(args, cli.verbose).await,
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn check_config(path: &Path) -> Result<()> {
    let config = WorkerConfig::load(path)?;
    config.validate()?;
    println!("{}: ok", path.display());
    Ok(())
}

async fn run(args: RunArgs, verbose: bool) -> Result<()> {
    let mut config = WorkerConfig::load(&args.config)?;
    args.apply(&mut config);
    config.validate()?;
    setup_logging(verbose, config.log_file.as_deref());

    let mut worker = Worker::new(&config, &args.token)?;
    if let Some(lifetime) = args.lifetime {
        worker.set_token_lifetime(lifetime)?;
    }
    worker.start().await?;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut interrupted = false;
    loop {
        tokio::select! {
            _ = &mut shutdown, if !interrupted => {
                interrupted = true;
                info!("interrupted, disconnecting");
                worker.disconnect().await?;
            }
            event = worker.next_event() => match event {
                Some(event) => log_event(&event),
                None => break,
            },
        }
    }
    Ok(())
}

fn log_event(event: &WorkerEvent) {
    match event {
        WorkerEvent::Ready => info!("ready"),
        WorkerEvent::Reconnected => info!("reconnected"),
        WorkerEvent::Disconnected { attempt, delay } => {
            warn!(attempt, ?delay, "disconnected, retrying")
        }
        WorkerEvent::Asleep => warn!("no signal from service"),
        WorkerEvent::Awake => info!("signal restored"),
        WorkerEvent::TokenWillExpire => {
            warn!("token expires soon; restart with a fresh token")
        }
        WorkerEvent::TokenExpired => warn!("token rejected by service"),
        WorkerEvent::Closed { reason } => info!(%reason, "session closed"),
        WorkerEvent::Added(entity) => debug!(kind = %entity.kind(), sid = entity.sid(), "added"),
        WorkerEvent::Updated(entity) => {
            debug!(kind = %entity.kind(), sid = entity.sid(), "updated")
        }
        WorkerEvent::Removed(entity) => {
            debug!(kind = %entity.kind(), sid = entity.sid(), "removed")
        }
        WorkerEvent::ReservationCreated(reservation) => {
            let snapshot = reservation.snapshot();
            info!(sid = reservation.sid(), task = %snapshot.task_sid, "reservation offered")
        }
        WorkerEvent::ReservationTransitioned {
            reservation,
            from,
            to,
        } => info!(sid = reservation.sid(), %from, %to, "reservation"),
        WorkerEvent::TaskTransitioned { task, from, to } => {
            info!(sid = task.sid(), %from, %to, "task")
        }
        WorkerEvent::TransferInitiated { task, transfer } => {
            info!(task = task.sid(), transfer = %transfer.sid, to = %transfer.to, "transfer initiated")
        }
        WorkerEvent::TransferAttemptFailed { task, transfer } => {
            warn!(task = task.sid(), transfer = %transfer.sid, "transfer attempt failed")
        }
        WorkerEvent::TransferEnded {
            task,
            transfer,
            event,
        } => info!(task = task.sid(), transfer = %transfer.sid, ?event, "transfer ended"),
    }
}

fn setup_logging(verbose: bool, log_file: Option<&Path>) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Fall back to stderr if the log file cannot be opened
    let file = log_file.and_then(|path| {
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });
    match file {
        Some(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(file)
            .with_ansi(false)
            .init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}
