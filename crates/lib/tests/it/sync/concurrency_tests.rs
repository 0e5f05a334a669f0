//! Concurrency tests for session creation.
//!
//! These tests verify that concurrent first-time acquisitions for one
//! identity converge on a single session with a single service call.

use std::time::Duration;

use session_registry::{Result, SessionHandle};
use tracing::info;

use crate::helpers::*;

/// Many tasks racing to open the same target must share one session.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_acquisitions_materialize_once() -> Result<()> {
    let ctx = TestContext::new().with_latency(Duration::from_millis(50));
    let num_tasks = 16;
    let mut tasks = Vec::with_capacity(num_tasks);

    for i in 0..num_tasks {
        let registry = ctx.registry().clone();
        // Different local paths, same remote target
        let config = sync_config(&format!("db-{i}.realm"), "alice", "/~/shared");
        tasks.push(tokio::spawn(async move {
            info!("Task {i} acquiring session");
            registry.get_or_create_session(&config).await
        }));
    }

    let mut handles: Vec<SessionHandle> = Vec::with_capacity(num_tasks);
    for task in tasks {
        handles.push(task.await.expect("task panicked")?);
    }

    let first = &handles[0];
    assert!(handles.iter().all(|handle| handle.ptr_eq(first)));
    assert_eq!(ctx.service().materialize_count(), 1);
    assert_eq!(ctx.registry().ref_count(first.identity()), num_tasks);
    Ok(())
}

/// Races on different identities proceed independently.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_acquisitions_per_identity() -> Result<()> {
    let ctx = TestContext::new().with_latency(Duration::from_millis(20));
    let partitions = ["a", "b", "c", "d"];
    let mut tasks = Vec::new();

    for round in 0..4 {
        for partition in partitions {
            let registry = ctx.registry().clone();
            let config = sync_config(&format!("{partition}-{round}.db"), "alice", partition);
            tasks.push(tokio::spawn(async move {
                registry.get_or_create_session(&config).await
            }));
        }
    }

    let mut handles = Vec::new();
    for task in tasks {
        handles.push(task.await.expect("task panicked")?);
    }

    assert_eq!(ctx.service().materialize_count(), partitions.len());
    assert_eq!(ctx.registry().len(), partitions.len());
    for partition in partitions {
        let same: Vec<_> = handles
            .iter()
            .filter(|handle| handle.identity().partition() == Some(partition))
            .collect();
        assert_eq!(same.len(), 4);
        assert!(same.iter().all(|handle| handle.ptr_eq(same[0])));
    }
    Ok(())
}

/// Concurrent acquire/release churn never leaves two sessions for one identity.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_acquire_release_churn_keeps_one_session() -> Result<()> {
    let ctx = TestContext::new();
    let config = sync_config("notes.db", "alice", "p");
    let pinned = ctx.registry().get_or_create_session(&config).await?;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let registry = ctx.registry().clone();
        let config = config.clone();
        tasks.push(tokio::spawn(async move {
            let mut seen = Vec::new();
            for _ in 0..50 {
                let handle = registry.get_or_create_session(&config).await?;
                seen.push(handle.session().clone());
                registry.release(handle);
            }
            Ok::<_, session_registry::sync::SessionError>(seen)
        }));
    }

    for task in tasks {
        let seen = task.await.expect("task panicked")?;
        assert!(seen.iter().all(|session| session.ptr_eq(&pinned)));
    }
    assert_eq!(ctx.service().materialize_count(), 1);
    assert_eq!(ctx.registry().ref_count(pinned.identity()), 1);
    Ok(())
}
