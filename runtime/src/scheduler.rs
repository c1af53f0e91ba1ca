// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! Single-flight cycle execution and the periodic trigger.

use crate::scrape::Scraper;
use crate::store::SnapshotStore;
use kurs_core::{Counts, KursResult};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

const IDLE: u8 = 0;
const RUNNING: u8 = 1;

/// Two-state lock: at most one cycle runs at a time.
#[derive(Debug, Clone, Default)]
pub struct CycleLock {
    state: Arc<AtomicU8>,
}

/// Held while a cycle runs; releases the lock when dropped.
#[derive(Debug)]
pub struct CycleGuard {
    state: Arc<AtomicU8>,
}

impl CycleLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when a cycle is already running.
    pub fn try_acquire(&self) -> Option<CycleGuard> {
        self.state
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleGuard {
                state: Arc::clone(&self.state),
            })
    }

    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) == RUNNING
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.state.store(IDLE, Ordering::Release);
    }
}

/// What a trigger did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another cycle held the lock; nothing was started.
    AlreadyRunning,
    /// The cycle met the threshold and replaced the snapshot.
    Committed(Counts),
    /// Too few sources resolved; the previous snapshot was kept.
    Discarded(Counts),
}

impl CycleOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }
}

pub struct Scheduler {
    scraper: Arc<Scraper>,
    store: Arc<SnapshotStore>,
    lock: CycleLock,
}

impl Scheduler {
    pub fn new(scraper: Arc<Scraper>, store: Arc<SnapshotStore>) -> Self {
        Self {
            scraper,
            store,
            lock: CycleLock::new(),
        }
    }

    pub fn scraper(&self) -> &Arc<Scraper> {
        &self.scraper
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    pub fn is_running(&self) -> bool {
        self.lock.is_running()
    }

    /// Run a cycle unless one is already running, and commit it if enough
    /// sources resolved.
    pub async fn trigger(&self) -> KursResult<CycleOutcome> {
        let Some(_guard) = self.lock.try_acquire() else {
            info!("cycle already running, trigger ignored");
            return Ok(CycleOutcome::AlreadyRunning);
        };

        let snapshot = self.scraper.run_cycle().await;
        let counts = snapshot.counts;
        let min_success = self.scraper.config().min_success;
        if let Err(e) = snapshot.check_threshold(min_success) {
            warn!("snapshot not published: {e}");
            return Ok(CycleOutcome::Discarded(counts));
        }
        self.store.commit(snapshot).await?;
        Ok(CycleOutcome::Committed(counts))
    }

    /// Trigger a cycle every `period`, starting one period from now. Ticks
    /// that arrive while a cycle is still running are skipped.
    pub async fn run_interval(self: Arc<Self>, period: Duration) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let scheduler = Arc::clone(&self);
            // Detached so a slow cycle never delays the next tick.
            tokio::spawn(async move {
                match scheduler.trigger().await {
                    Ok(CycleOutcome::AlreadyRunning) => info!("previous cycle still running, tick skipped"),
                    Ok(_) => {}
                    Err(e) => error!("scheduled cycle failed: {e}"),
                }
            });
        }
    }
}
