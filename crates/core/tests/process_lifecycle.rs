//! Process tracking integration tests.
//!
//! These tests spawn real child processes and verify that the registry
//! tracks, terminates and reports them correctly.

use std::time::Duration;

use blockassist_core::{CleanupHandler, CommandRunner, ProcessRegistry, ProcessState};

const GRACE: Duration = Duration::from_millis(500);

#[tokio::test]
async fn test_terminate_all_stops_every_tracked_process() {
    let registry = ProcessRegistry::new();
    let runner = CommandRunner::new(registry.clone());

    let mut handles = Vec::new();
    for i in 0..3 {
        let handle = runner
            .spawn(&format!("sleeper-{i}"), "sleep 30", None)
            .await
            .expect("spawn failed");
        handles.push(handle);
    }
    assert_eq!(registry.running_count().await, 3);

    registry.terminate_all(GRACE).await;

    assert_eq!(registry.running_count().await, 0);
    for handle in &handles {
        assert!(!handle.wait().await.is_running());
    }
}

#[tokio::test]
async fn test_natural_exit_is_observed_without_termination() {
    let registry = ProcessRegistry::new();
    let runner = CommandRunner::new(registry.clone());

    let handle = runner.spawn("quick", "exit 5", None).await.expect("spawn failed");
    let state = handle.wait().await;
    assert_eq!(state, ProcessState::Exited(Some(5)));

    // Nothing left running; terminate_all has nothing to do.
    registry.terminate_all(GRACE).await;
    assert_eq!(registry.running_count().await, 0);
}

#[tokio::test]
async fn test_registration_is_visible_during_concurrent_termination() {
    let registry = ProcessRegistry::new();
    let runner = CommandRunner::new(registry.clone());

    // Interleave spawns with a termination sweep. Any process whose spawn
    // completed must end up tracked and, after the final sweep, stopped.
    let spawner = {
        let runner = runner.clone();
        tokio::spawn(async move {
            for i in 0..5 {
                let _ = runner.spawn(&format!("racer-{i}"), "sleep 30", None).await;
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
    };

    tokio::time::sleep(Duration::from_millis(25)).await;
    registry.terminate_all(GRACE).await;
    spawner.await.expect("spawner task panicked");

    registry.terminate_all(GRACE).await;
    assert_eq!(registry.running_count().await, 0);
}

#[tokio::test]
async fn test_cleanup_handler_runs_once() {
    let registry = ProcessRegistry::new();
    let runner = CommandRunner::new(registry.clone());
    let cleanup = CleanupHandler::new(registry.clone(), GRACE);

    let handle = runner
        .spawn("sleeper", "sleep 30", None)
        .await
        .expect("spawn failed");

    // Two callers race to clean up; the process is terminated exactly once
    // and both calls return.
    let (first, second) = tokio::join!(cleanup.run(), cleanup.run());
    let _ = (first, second);

    assert!(cleanup.has_run());
    assert!(!handle.wait().await.is_running());
    assert_eq!(registry.running_count().await, 0);
}

#[tokio::test]
async fn test_snapshot_reflects_states() {
    let registry = ProcessRegistry::new();
    let runner = CommandRunner::new(registry.clone());

    let done = runner.spawn("done", "true", None).await.expect("spawn failed");
    done.wait().await;
    let running = runner
        .spawn("running", "sleep 30", None)
        .await
        .expect("spawn failed");

    let snapshot = registry.snapshot().await;
    assert_eq!(snapshot.len(), 2);
    let done_status = snapshot.iter().find(|s| s.id == done.id).unwrap();
    assert_eq!(done_status.state, ProcessState::Exited(Some(0)));
    let running_status = snapshot.iter().find(|s| s.id == running.id).unwrap();
    assert!(running_status.state.is_running());

    registry.terminate_all(GRACE).await;
}
