// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Counting barrier: a task that tallies completions and signals at a limit.

use crate::sync::SyncData;
use crate::task::Task;
use std::sync::Arc;

/// Counter pair guarded by the rendezvous lock it lives inside.
#[derive(Debug, Default)]
pub struct Tally {
    current: i32,
    limit: i32,
}

impl Tally {
    pub fn new(limit: i32) -> Self {
        Self { current: 0, limit }
    }

    /// True while the tally has not reached its limit.
    pub fn pending(&self) -> bool {
        self.current < self.limit
    }

    pub fn current(&self) -> i32 {
        self.current
    }

    pub fn limit(&self) -> i32 {
        self.limit
    }
}

/// A task coupled with a shared `SyncData<Tally>`.
///
/// Incrementers bump the tally under its lock; whoever waits on the tally
/// (the manager's monitor) is woken exactly once per run, when the count
/// first reaches the limit.
pub struct CountingTask {
    task: Task,
    sync: Arc<SyncData<Tally>>,
}

impl CountingTask {
    pub fn new(name: impl Into<String>, sync: Arc<SyncData<Tally>>) -> Self {
        Self {
            task: Task::new(name),
            sync,
        }
    }

    /// The inner task, for run and consumer wiring.
    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn sync(&self) -> &Arc<SyncData<Tally>> {
        &self.sync
    }

    /// Add one completion to the tally, signalling when it reaches the
    /// limit. Counting past the limit is harmless: only the transition onto
    /// it signals.
    pub fn increment(&self) {
        let reached = {
            let mut tally = self.sync.lock();
            tally.current += 1;
            tally.current == tally.limit
        };

        // signal_one re-acquires the lock, so the guard must be gone first.
        if reached {
            self.sync.signal_one();
        }
    }

    /// The wait predicate: true while completions are still outstanding.
    pub fn pending(&self) -> bool {
        self.sync.lock().pending()
    }

    /// Set a new limit and restart the tally from zero.
    ///
    /// Only safe before the first increment of a run.
    pub fn set_limit(&self, limit: i32) {
        let mut tally = self.sync.lock();
        tally.limit = limit;
        tally.current = 0;
    }
}

#[cfg(test)]
#[path = "counting_tests.rs"]
mod tests;
