// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fan-out specs
//!
//! A manager runs its workers in parallel, rendezvouses on the last
//! completion, and fires its cleanup exactly once.

use harvest_task::{Manager, TaskRunner};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

const WAIT_LIMIT: Duration = Duration::from_secs(5);

#[test]
fn three_sleeping_workers_rendezvous_after_the_longest_sleep() {
    let runner = TaskRunner::new();
    let (cleaned_tx, cleaned) = mpsc::channel();
    let manager = Manager::new(runner.clone(), "sleepers", move || {
        cleaned_tx.send(()).unwrap();
    });

    for i in 0..3 {
        let task = manager.new_task(format!("sleeper-{i}")).unwrap();
        task.set_run(|| thread::sleep(Duration::from_millis(10)));
    }

    let started = Instant::now();
    manager.run_all().unwrap();

    cleaned.recv_timeout(WAIT_LIMIT).unwrap();
    assert!(started.elapsed() >= Duration::from_millis(10));
    assert!(cleaned.try_recv().is_err(), "cleanup fired more than once");
    runner.wait_idle();
}

#[test]
fn worker_results_flow_through_captured_channels() {
    let runner = TaskRunner::new();
    let (cleaned_tx, cleaned) = mpsc::channel();
    let manager = Manager::new(runner.clone(), "adders", move || {
        cleaned_tx.send(()).unwrap();
    });

    let (result_tx, results) = mpsc::channel();
    for i in 0..4u64 {
        let tx = result_tx.clone();
        let task = manager.new_task(format!("adder-{i}")).unwrap();
        task.set_run(move || tx.send(i * i).unwrap());
    }
    drop(result_tx);

    manager.run_all().unwrap();
    cleaned.recv_timeout(WAIT_LIMIT).unwrap();

    let mut collected: Vec<u64> = results.iter().collect();
    collected.sort_unstable();
    assert_eq!(collected, vec![0, 1, 4, 9]);
    runner.wait_idle();
}

#[test]
fn pre_charged_manager_waits_for_caller_and_workers() {
    let runner = TaskRunner::new();
    let (cleaned_tx, cleaned) = mpsc::channel();
    let manager = Manager::new(runner.clone(), "pre-charged", move || {
        cleaned_tx.send(()).unwrap();
    });

    for i in 0..2 {
        let task = manager.new_task(format!("worker-{i}")).unwrap();
        task.set_run(|| {});
    }

    manager.prepare(2).unwrap();
    manager.start_workers().unwrap();

    // Workers alone leave the tally two short of its limit.
    assert!(cleaned.recv_timeout(Duration::from_millis(50)).is_err());

    manager.increment_count();
    manager.increment_count();

    cleaned.recv_timeout(WAIT_LIMIT).unwrap();
    runner.wait_idle();
}

#[test]
fn managers_sharing_a_runner_finish_independently() {
    let runner = TaskRunner::new();
    let mut rounds = Vec::new();

    for round in 0..4 {
        let (cleaned_tx, cleaned) = mpsc::channel();
        let manager = Manager::new(runner.clone(), format!("round-{round}"), move || {
            cleaned_tx.send(()).unwrap();
        });
        for i in 0..3 {
            let task = manager.new_task(format!("worker-{round}-{i}")).unwrap();
            task.set_run(|| {});
        }
        manager.run_all().unwrap();
        rounds.push(cleaned);
    }

    for cleaned in &rounds {
        cleaned.recv_timeout(WAIT_LIMIT).unwrap();
    }
    runner.wait_idle();
    assert_eq!(runner.active(), 0);
}
