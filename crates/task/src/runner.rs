// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor host: one OS thread per task, tracked for graceful shutdown.

use crate::sync::SyncData;
use std::io;
use std::sync::Arc;
use std::thread::{Builder, JoinHandle};
use thiserror::Error;

/// The platform refused to create a new executor thread.
#[derive(Debug, Error)]
#[error("failed to spawn executor thread: {0}")]
pub struct SpawnError(#[from] io::Error);

/// Spawns task executors and tracks how many are still live.
///
/// Construct one at process startup and hand clones to whoever spawns tasks;
/// all clones share the live count. [`TaskRunner::wait_idle`] at shutdown
/// blocks until every executor has finished, which is the only way the
/// runner ever ends one: executors are cooperative and are never aborted.
#[derive(Clone)]
pub struct TaskRunner {
    live: Arc<SyncData<usize>>,
}

impl TaskRunner {
    pub fn new() -> Self {
        Self {
            live: Arc::new(SyncData::new(0)),
        }
    }

    /// Spawn an executor thread around `body`.
    ///
    /// The executor counts as live until `body` returns. `name`, when given,
    /// becomes the thread name for diagnostics.
    pub(crate) fn spawn(
        &self,
        name: Option<&str>,
        body: impl FnOnce() + Send + 'static,
    ) -> Result<JoinHandle<()>, SpawnError> {
        let builder = match name {
            Some(name) => Builder::new().name(name.to_string()),
            None => Builder::new(),
        };

        *self.live.lock() += 1;

        let live = Arc::clone(&self.live);
        let spawned = builder.spawn(move || {
            body();

            let idle = {
                let mut count = live.lock();
                *count -= 1;
                *count == 0
            };
            if idle {
                live.signal_all();
            }
        });

        match spawned {
            Ok(handle) => Ok(handle),
            Err(source) => {
                *self.live.lock() -= 1;
                Err(SpawnError(source))
            }
        }
    }

    /// Number of executors currently live.
    pub fn active(&self) -> usize {
        *self.live.lock()
    }

    /// Block until every spawned executor has finished.
    pub fn wait_idle(&self) {
        self.live.wait_while(|count| *count > 0);
    }
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
