// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Liveness monitoring for the signaling channel.
//!
//! A half-open connection looks healthy to the socket layer but delivers
//! nothing. The monitor records the last time anything arrived and reports
//! when the silence exceeds a threshold.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Error, Result};

type Callback = Box<dyn Fn() + Send + Sync>;

struct Pulse {
    last_beat: Instant,
    asleep: bool,
    stopped: bool,
}

/// Periodically checks that beats keep arriving.
///
/// Starts Awake. Fires `on_sleep` once per Awake to Asleep transition and
/// `on_wakeup` once on the first beat after that. Callbacks run while the
/// monitor's lock is held and must not call back into the monitor.
pub struct Heartbeat {
    pulse: Arc<Mutex<Pulse>>,
    on_wakeup: Callback,
    cancel: CancellationToken,
}

impl Heartbeat {
    /// Starts monitoring. Must be called from within a tokio runtime.
    ///
    /// Fails if `interval` is zero.
    pub fn start<S, W>(
        interval: Duration,
        sleep_after: Duration,
        on_sleep: S,
        on_wakeup: W,
    ) -> Result<Self>
    where
        S: Fn() + Send + Sync + 'static,
        W: Fn() + Send + Sync + 'static,
    {
        if interval.is_zero() {
            return Err(Error::InvalidArgument(
                "heartbeat interval must be greater than zero".to_string(),
            ));
        }
        let pulse = Arc::new(Mutex::new(Pulse {
            last_beat: Instant::now(),
            asleep: false,
            stopped: false,
        }));
        let cancel = CancellationToken::new();

        tokio::spawn(check_loop(
            Arc::clone(&pulse),
            cancel.clone(),
            interval,
            sleep_after,
            Box::new(on_sleep),
        ));

        Ok(Heartbeat {
            pulse,
            on_wakeup: Box::new(on_wakeup),
            cancel,
        })
    }

    /// Records a sign of life.
    pub fn beat(&self) {
        let mut pulse = self.pulse.lock();
        if pulse.stopped {
            return;
        }
        pulse.last_beat = Instant::now();
        if pulse.asleep {
            pulse.asleep = false;
            (self.on_wakeup)();
        }
    }

    /// Returns true if the monitor currently considers the peer silent.
    pub fn is_asleep(&self) -> bool {
        self.pulse.lock().asleep
    }

    /// Stops monitoring. No callback fires after this returns.
    pub fn stop(&self) {
        self.pulse.lock().stopped = true;
        self.cancel.cancel();
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn check_loop(
    pulse: Arc<Mutex<Pulse>>,
    cancel: CancellationToken,
    interval: Duration,
    sleep_after: Duration,
    on_sleep: Callback,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let mut pulse = pulse.lock();
                if pulse.stopped {
                    break;
                }
                if !pulse.asleep && pulse.last_beat.elapsed() >= sleep_after {
                    debug!(silent_for = ?pulse.last_beat.elapsed(), "no signal, going to sleep");
                    pulse.asleep = true;
                    on_sleep();
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
