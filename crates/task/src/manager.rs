// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-pool coordinator: fans tasks out and runs cleanup exactly once
//! after the completion rendezvous.
//!
//! A [`Manager`] owns a list of worker tasks, one shared
//! [`SyncData<Tally>`](crate::sync::SyncData), and a monitor
//! [`CountingTask`] whose task shares that sync data. `prepare` points every
//! worker's completion consumer at the manager, arms the monitor with
//! `initial + worker_count` as its limit, and launches it; each finishing
//! worker bumps the tally, and the worker that lands on the limit wakes the
//! monitor, which runs the caller's cleanup and lets the manager go.

use crate::consumer::EventConsumer;
use crate::counting::{CountingTask, Tally};
use crate::runner::TaskRunner;
use crate::sync::SyncData;
use crate::task::{Task, TaskError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use thiserror::Error;

type CleanupFn = Box<dyn FnOnce() + Send + 'static>;

/// Errors from driving a manager's lifecycle.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// The manager has been prepared; its task list is sealed.
    #[error("manager is already in use")]
    InUse,
    /// The manager completed a run; its cleanup has already fired.
    #[error("manager has already finished")]
    Finished,
    #[error(transparent)]
    Task(#[from] TaskError),
}

/// Coordinator for one fan-out of worker tasks.
///
/// Lifecycle: register workers, then [`Manager::run_all`] (or
/// [`Manager::prepare`] followed by [`Manager::start_workers`]). The caller
/// may drop its handle immediately afterwards: the monitor holds the manager
/// alive until every worker has finished and the cleanup closure has run,
/// then releases it.
///
/// There is no cancellation and no timeout. A worker that never returns
/// blocks the rendezvous forever, and a worker that fails to spawn leaves
/// the monitor short of its limit; callers must validate the whole fan-out
/// before starting it.
pub struct Manager {
    name: String,
    runner: TaskRunner,
    tasks: Mutex<Vec<Task>>,
    sync: Arc<SyncData<Tally>>,
    monitor: CountingTask,
    worker_finished: Arc<WorkerFinished>,
    monitor_finished: Arc<MonitorFinished>,
    cleanup: Mutex<Option<CleanupFn>>,
    in_use: AtomicBool,
}

impl Manager {
    /// Create a manager whose `cleanup` runs on the monitor's executor after
    /// the last worker finishes. The closure may own whatever context the
    /// cleanup needs; it is called exactly once.
    pub fn new(
        runner: TaskRunner,
        name: impl Into<String>,
        cleanup: impl FnOnce() + Send + 'static,
    ) -> Arc<Self> {
        let name = name.into();
        let sync = Arc::new(SyncData::new(Tally::default()));

        // The monitor's task shares the manager's sync data; its completion
        // consumer releases the manager once the rendezvous is over.
        let monitor = CountingTask::new(format!("{name}-monitor"), Arc::clone(&sync));
        let monitor_finished = Arc::new(MonitorFinished::default());
        let consumer = Arc::clone(&monitor_finished) as Arc<dyn EventConsumer>;
        monitor.task().set_consumer(consumer);

        Arc::new_cyclic(|manager| Self {
            name,
            runner,
            tasks: Mutex::new(Vec::new()),
            sync,
            monitor,
            worker_finished: Arc::new(WorkerFinished {
                manager: Weak::clone(manager),
            }),
            monitor_finished,
            cleanup: Mutex::new(Some(Box::new(cleanup))),
            in_use: AtomicBool::new(false),
        })
    }

    /// Register a worker task. Valid only before [`Manager::prepare`].
    pub fn add_task(&self, task: Task) -> Result<(), ManagerError> {
        if self.is_in_use() {
            return Err(ManagerError::InUse);
        }
        self.tasks.lock().push(task);
        Ok(())
    }

    /// Allocate a named task and register it in one step.
    pub fn new_task(&self, name: impl Into<String>) -> Result<Task, ManagerError> {
        let task = Task::new(name);
        self.add_task(task.clone())?;
        Ok(task)
    }

    /// Look up a registered task by name.
    pub fn find_task(&self, name: &str) -> Option<Task> {
        self.tasks
            .lock()
            .iter()
            .find(|task| task.name() == Some(name))
            .cloned()
    }

    pub fn worker_count(&self) -> usize {
        self.tasks.lock().len()
    }

    /// True from [`Manager::prepare`] until cleanup has completed.
    pub fn is_in_use(&self) -> bool {
        self.in_use.load(Ordering::Acquire)
    }

    /// Wire consumers, arm the monitor, and launch it.
    ///
    /// `initial` pre-charges the completion count for callers that retire
    /// part of it themselves through [`Manager::increment_count`]; the
    /// common path passes 0 via [`Manager::run_all`]. The monitor runs even
    /// with no registered workers, so an empty manager still reaches its
    /// cleanup.
    pub fn prepare(&self, initial: i32) -> Result<(), ManagerError> {
        if self.in_use.swap(true, Ordering::AcqRel) {
            return Err(ManagerError::InUse);
        }

        // The lifecycle is one-way: once the monitor has taken the cleanup,
        // the manager cannot be armed again.
        if self.cleanup.lock().is_none() {
            self.in_use.store(false, Ordering::Release);
            return Err(ManagerError::Finished);
        }

        let limit = {
            let workers = self.tasks.lock();
            for task in workers.iter() {
                let consumer = Arc::clone(&self.worker_finished) as Arc<dyn EventConsumer>;
                task.set_consumer(consumer);
            }
            initial + workers.len() as i32
        };

        self.monitor.set_limit(limit);

        // `new` only hands managers out behind an Arc, so the upgrade holds
        // whenever `&self` is reachable.
        if let Some(manager) = self.worker_finished.manager.upgrade() {
            let rendezvous = Arc::clone(&manager);
            self.monitor.task().set_run(move || rendezvous.monitor_loop());

            // The monitor's consumer carries the final strong reference; it
            // is dropped on the monitor's executor after cleanup has
            // returned.
            *self.monitor_finished.handoff.lock() = Some(manager);
        }

        tracing::debug!(manager = %self.name, limit, "monitor armed");

        if let Err(e) = self.monitor.task().run(&self.runner) {
            self.monitor_finished.handoff.lock().take();
            self.in_use.store(false, Ordering::Release);
            return Err(e.into());
        }
        Ok(())
    }

    /// Launch every registered worker.
    ///
    /// Stops at the first spawn failure without undoing earlier starts; the
    /// monitor is then short of its limit forever. Callers that cannot
    /// guarantee every spawn must not start any.
    pub fn start_workers(&self) -> Result<(), ManagerError> {
        let workers: Vec<Task> = self.tasks.lock().clone();

        for task in &workers {
            if let Err(e) = task.run(&self.runner) {
                tracing::error!(
                    manager = %self.name,
                    task = ?task.name(),
                    error = %e,
                    "worker spawn failed; manager will never finish"
                );
                return Err(e.into());
            }
        }

        tracing::debug!(manager = %self.name, workers = workers.len(), "workers started");
        Ok(())
    }

    /// [`Manager::prepare`] with no pre-charge, then
    /// [`Manager::start_workers`].
    pub fn run_all(&self) -> Result<(), ManagerError> {
        self.prepare(0)?;
        self.start_workers()
    }

    /// Retire one unit of the completion count.
    ///
    /// The path by which callers that passed `initial > 0` to
    /// [`Manager::prepare`] account for work they completed themselves.
    pub fn increment_count(&self) {
        self.monitor.increment();
    }

    fn monitor_loop(&self) {
        self.sync.wait_while(|tally| tally.pending());

        tracing::debug!(manager = %self.name, "all workers finished");

        if let Some(cleanup) = self.cleanup.lock().take() {
            cleanup();
        }
    }
}

/// Shared completion consumer every worker points at after `prepare`.
///
/// Holds the manager weakly: a worker finishing while the manager is already
/// gone is a no-op, not a dangling access.
struct WorkerFinished {
    manager: Weak<Manager>,
}

impl EventConsumer for WorkerFinished {
    fn task_finished(&self, task: &Task) {
        if let Some(manager) = self.manager.upgrade() {
            tracing::trace!(manager = %manager.name, task = ?task.name(), "worker finished");
            manager.increment_count();
        }
    }
}

/// The monitor's completion consumer: releases the manager once cleanup has
/// run.
#[derive(Default)]
struct MonitorFinished {
    handoff: Mutex<Option<Arc<Manager>>>,
}

impl EventConsumer for MonitorFinished {
    fn task_finished(&self, _task: &Task) {
        if let Some(manager) = self.handoff.lock().take() {
            manager.in_use.store(false, Ordering::Release);
            tracing::debug!(manager = %manager.name, "manager released");
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
