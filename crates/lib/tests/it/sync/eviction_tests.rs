//! Reference counting and grace-period eviction.
//!
//! Most of these tests run on a paused clock so grace periods elapse
//! deterministically. The multi-threaded ones race eviction against
//! re-creation of the same identity.

use std::{sync::Arc, time::Duration};

use session_registry::{
    Result,
    sync::{LifecycleEvent, RemoteSession, SessionState},
};
use tokio::sync::Notify;

use crate::helpers::*;

const GRACE: Duration = Duration::from_secs(5);

#[tokio::test(start_paused = true)]
async fn test_reacquire_within_grace_period_reuses_session() -> Result<()> {
    let ctx = TestContext::new().with_grace(GRACE);
    let config = sync_config("notes.db", "alice", "p");

    let handles = vec![
        ctx.registry().get_or_create_session(&config).await?,
        ctx.registry().get_or_create_session(&config).await?,
        ctx.registry().get_or_create_session(&config).await?,
    ];
    let original = handles[0].session().clone();
    for handle in handles {
        ctx.registry().release(handle);
    }
    assert_eq!(ctx.registry().ref_count(original.identity()), 0);

    tokio::time::advance(GRACE / 2).await;
    settle().await;
    assert_eq!(ctx.service().dispose_count(), 0);

    let again = ctx.registry().get_or_create_session(&config).await?;
    assert!(again.ptr_eq(&original));
    assert_eq!(ctx.service().materialize_count(), 1);

    // the cancelled eviction must not fire later
    tokio::time::sleep(GRACE * 2).await;
    settle().await;
    assert_eq!(ctx.service().dispose_count(), 0);
    assert!(ctx.registry().lookup(&config).is_some());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_session_disposed_once_after_grace_period() -> Result<()> {
    let ctx = TestContext::new().with_grace(GRACE);
    let config = sync_config("notes.db", "alice", "p");

    let a = ctx.registry().get_or_create_session(&config).await?;
    let b = ctx.registry().get_or_create_session(&config).await?;
    let remote = ctx
        .service()
        .session(a.identity())
        .expect("service should hold the remote session");
    drop(a);
    drop(b);

    tokio::time::sleep(GRACE + Duration::from_millis(1)).await;
    settle().await;

    assert_eq!(ctx.service().dispose_count(), 1);
    assert!(ctx.registry().is_empty());
    assert!(ctx.registry().lookup(&config).is_none());
    assert_eq!(remote.state(), SessionState::Inactive);

    tokio::time::sleep(GRACE * 3).await;
    settle().await;
    assert_eq!(ctx.service().dispose_count(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_new_generation_after_eviction() -> Result<()> {
    let ctx = TestContext::new().with_grace(GRACE);
    let config = sync_config("notes.db", "alice", "p");

    let first = ctx.registry().get_or_create_session(&config).await?;
    let old = first.session().clone();
    drop(first);

    tokio::time::sleep(GRACE + Duration::from_millis(1)).await;
    settle().await;

    let second = ctx.registry().get_or_create_session(&config).await?;
    assert!(!second.ptr_eq(&old));
    assert_eq!(second.identity(), old.identity());
    assert!(second.generation() > old.generation());
    assert_eq!(ctx.service().materialize_count(), 2);
    assert_eq!(ctx.service().dispose_count(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_repeated_release_cycles_schedule_one_disposal() -> Result<()> {
    let ctx = TestContext::new().with_grace(GRACE);
    let config = sync_config("notes.db", "alice", "p");

    // close-then-reopen churn inside the grace period
    for _ in 0..5 {
        let handle = ctx.registry().get_or_create_session(&config).await?;
        drop(handle);
        tokio::time::advance(GRACE / 4).await;
        settle().await;
    }
    assert_eq!(ctx.service().materialize_count(), 1);
    assert_eq!(ctx.service().dispose_count(), 0);

    tokio::time::sleep(GRACE + Duration::from_millis(1)).await;
    settle().await;
    assert_eq!(ctx.service().dispose_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_zero_grace_period_disposes_on_last_release() -> Result<()> {
    let ctx = TestContext::new().with_grace(Duration::ZERO);
    let config = sync_config("notes.db", "alice", "p");

    let a = ctx.registry().get_or_create_session(&config).await?;
    let b = ctx.registry().get_or_create_session(&config).await?;
    drop(a);
    assert_eq!(ctx.service().dispose_count(), 0);
    drop(b);
    assert_eq!(ctx.service().dispose_count(), 1);
    assert!(ctx.registry().is_empty());
    Ok(())
}

#[test]
fn test_release_outside_runtime_disposes_immediately() {
    let ctx = TestContext::new().with_grace(GRACE);
    let config = sync_config("notes.db", "alice", "p");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let handle = runtime
        .block_on(ctx.registry().get_or_create_session(&config))
        .unwrap();
    drop(runtime);

    // no runtime to run the grace timer on
    drop(handle);
    assert_eq!(ctx.service().dispose_count(), 1);
    assert!(ctx.registry().is_empty());
}

/// Re-acquiring while the old session is still being disposed must wait for
/// the disposal instead of racing it.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_recreate_waits_for_in_flight_disposal() -> Result<()> {
    let ctx = TestContext::new().with_grace(Duration::ZERO);
    let config = sync_config("notes.db", "alice", "p");

    // Hold the releasing thread inside the eviction for a while
    let evicting = Arc::new(Notify::new());
    let signal = evicting.clone();
    ctx.registry().on_lifecycle(move |event| {
        if let LifecycleEvent::Released { refs: 0, .. } = event {
            signal.notify_one();
            std::thread::sleep(Duration::from_millis(200));
        }
    });

    let first = ctx.registry().get_or_create_session(&config).await?;
    let first_generation = first.generation();
    let releasing = tokio::task::spawn_blocking(move || drop(first));

    evicting.notified().await;
    let second = ctx.registry().get_or_create_session(&config).await?;
    releasing.await.expect("release panicked");

    assert!(second.generation() > first_generation);
    assert_eq!(second.state(), SessionState::Active);
    assert!(ctx.service().session(second.identity()).is_some());
    assert_eq!(ctx.service().materialize_count(), 2);
    assert_eq!(ctx.service().dispose_count(), 1);
    assert_eq!(
        ctx.service().materialize_count(),
        ctx.service().dispose_count() + ctx.registry().len()
    );
    assert_eq!(ctx.registry().ref_count(second.identity()), 1);
    Ok(())
}

/// Acquire/release churn with a tiny grace period: every handle sees a live
/// remote session and every materialized session is disposed exactly once.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_eviction_churn_never_disposes_a_live_session() -> Result<()> {
    let ctx = TestContext::new().with_grace(Duration::from_millis(1));
    let config = sync_config("notes.db", "alice", "p");

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let registry = ctx.registry().clone();
        let config = config.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..50 {
                let handle = registry.get_or_create_session(&config).await?;
                assert_eq!(handle.state(), SessionState::Active);
                if i % 5 == 0 {
                    tokio::time::sleep(Duration::from_millis(2)).await;
                }
                registry.release(handle);
            }
            Ok::<_, session_registry::sync::SessionError>(())
        }));
    }
    for task in tasks {
        task.await.expect("task panicked")?;
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(ctx.registry().is_empty());
    assert_eq!(ctx.service().session_count(), 0);
    assert_eq!(
        ctx.service().materialize_count(),
        ctx.service().dispose_count() + ctx.registry().len()
    );
    Ok(())
}
