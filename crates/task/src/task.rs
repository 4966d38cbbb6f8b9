// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A unit of work executed by one platform executor.

use crate::consumer::EventConsumer;
use crate::runner::{SpawnError, TaskRunner};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;

type RunFn = Box<dyn FnOnce() + Send + 'static>;

/// Errors from starting a task.
#[derive(Debug, Error)]
pub enum TaskError {
    /// No run closure is stored, or an earlier `run` already consumed it.
    #[error("task has no run function to start")]
    NotRunnable,
    #[error(transparent)]
    Spawn(#[from] SpawnError),
}

/// One unit of work.
///
/// A task pairs an optional diagnostic name with a run closure, consumed by
/// the single executor that [`Task::run`] spawns for it, and an optional
/// completion consumer fired on that executor after the closure returns.
/// Results leave a task through whatever channels or shared state the
/// closure captures; the task itself carries none.
///
/// The handle is cheap to clone; clones share the task. Configure a task
/// (`set_run`, `set_consumer`) before starting it; from `run` until
/// completion it is read-only.
#[derive(Clone)]
pub struct Task {
    inner: Arc<TaskInner>,
}

struct TaskInner {
    name: Option<String>,
    run_fn: Mutex<Option<RunFn>>,
    consumer: Mutex<Option<Arc<dyn EventConsumer>>>,
    running: AtomicBool,
    executor: Mutex<Option<JoinHandle<()>>>,
}

impl Task {
    /// Create a named, unregistered task. Use [`crate::Manager::new_task`]
    /// to create one registered with a manager.
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(Some(name.into()))
    }

    /// Create a task with no diagnostic name.
    pub fn unnamed() -> Self {
        Self::build(None)
    }

    fn build(name: Option<String>) -> Self {
        Self {
            inner: Arc::new(TaskInner {
                name,
                run_fn: Mutex::new(None),
                consumer: Mutex::new(None),
                running: AtomicBool::new(false),
                executor: Mutex::new(None),
            }),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// Whether two handles refer to the same task.
    pub fn ptr_eq(&self, other: &Task) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Store the closure the executor will run.
    pub fn set_run(&self, f: impl FnOnce() + Send + 'static) {
        *self.inner.run_fn.lock() = Some(Box::new(f));
    }

    /// Store the completion consumer, replacing any previous one.
    pub fn set_consumer(&self, consumer: Arc<dyn EventConsumer>) {
        *self.inner.consumer.lock() = Some(consumer);
    }

    pub(crate) fn consumer(&self) -> Option<Arc<dyn EventConsumer>> {
        self.inner.consumer.lock().clone()
    }

    /// True between a successful [`Task::run`] and the run closure's return.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Spawn this task's executor.
    ///
    /// Returns once the executor is created, not when it completes. The
    /// executor runs the stored closure, then fires the completion consumer
    /// if one is set.
    pub fn run(&self, runner: &TaskRunner) -> Result<(), TaskError> {
        let body = self
            .inner
            .run_fn
            .lock()
            .take()
            .ok_or(TaskError::NotRunnable)?;
        self.inner.running.store(true, Ordering::Release);

        let task = self.clone();
        let spawned = runner.spawn(self.name(), move || {
            body();
            task.inner.running.store(false, Ordering::Release);

            if let Some(consumer) = task.consumer() {
                consumer.task_finished(&task);
            }
        });

        match spawned {
            Ok(handle) => {
                tracing::trace!(task = ?self.inner.name, "executor spawned");
                *self.inner.executor.lock() = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.inner.running.store(false, Ordering::Release);
                tracing::error!(task = ?self.inner.name, error = %e, "executor spawn failed");
                Err(e.into())
            }
        }
    }

    /// Forget the executor handle.
    ///
    /// Idempotent bookkeeping only: the executor is cooperative and is never
    /// aborted, so a closed task still runs to completion.
    pub fn close(&self) {
        self.inner.executor.lock().take();
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
