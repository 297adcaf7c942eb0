//! Leader-only periodic harness.
//!
//! Runs a poll action on a fixed period, but only while this process holds
//! cluster leadership, and only while holding the scheduler lock shared with
//! every other leader-only poller in the process. Overlapping invocations are
//! therefore impossible.

use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::error::{ExpiryError, Result};

// ---------------------------------------------------------------------------
// LeaderLatch
// ---------------------------------------------------------------------------

/// Source of truth for "this replica is the cluster leader".
pub trait LeaderLatch: Send + Sync {
    fn has_leadership(&self) -> bool;
}

/// Single-replica deployments: always the leader.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandaloneLeader;

impl LeaderLatch for StandaloneLeader {
    fn has_leadership(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// LeaderOnlyPoller
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome<T> {
    NotLeader,
    Ran(T),
}

pub struct LeaderOnlyPoller<'a> {
    name: &'static str,
    latch: &'a dyn LeaderLatch,
    lock: &'a Mutex<()>,
    interval: Duration,
}

impl<'a> LeaderOnlyPoller<'a> {
    pub fn new(
        name: &'static str,
        latch: &'a dyn LeaderLatch,
        lock: &'a Mutex<()>,
        interval: Duration,
    ) -> Self {
        Self {
            name,
            latch,
            lock,
            interval,
        }
    }

    /// Run `action` once if this process is the leader.
    pub fn tick<T>(&self, action: impl FnOnce() -> T) -> Result<TickOutcome<T>> {
        if !self.latch.has_leadership() {
            debug!(poller = self.name, "skipping {}: not the leader", self.name);
            return Ok(TickOutcome::NotLeader);
        }

        let _guard = self
            .lock
            .lock()
            .map_err(|_| ExpiryError::Store("scheduler lock poisoned".to_string()))?;

        // Leadership may have moved while waiting on the lock.
        if !self.latch.has_leadership() {
            debug!(poller = self.name, "lost leadership before running {}", self.name);
            return Ok(TickOutcome::NotLeader);
        }

        let started = Instant::now();
        let out = action();
        debug!(
            poller = self.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "{} ran",
            self.name
        );
        Ok(TickOutcome::Ran(out))
    }

    /// Tick every `interval` until `shutdown` resolves. A zero interval
    /// disables the poller.
    pub async fn run<F>(&self, mut action: impl FnMut(), shutdown: F)
    where
        F: Future<Output = ()>,
    {
        if self.interval.is_zero() {
            warn!(poller = self.name, "{} disabled: poll interval is zero", self.name);
            return;
        }

        info!(
            poller = self.name,
            every_ms = self.interval.as_millis() as u64,
            "starting {}",
            self.name
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(poller = self.name, "stopping {}", self.name);
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick(&mut action) {
                        error!(poller = self.name, error = %e, "{} tick failed", self.name);
                    }
                }
            }
        }
    }
}
