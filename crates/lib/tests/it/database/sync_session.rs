//! `Database::sync_session` behaviour.

use session_registry::{Database, Result};

use crate::helpers::*;

#[tokio::test]
async fn test_sync_session_matches_registry_session() -> Result<()> {
    let ctx = TestContext::new();
    let config = sync_config("notes.db", "alice", "default");
    let db = Database::open(config.clone(), ctx.registry()).await?;

    let from_registry = ctx.registry().lookup(db.configuration());
    assert_eq!(from_registry.as_ref(), Some(db.sync_session()?));
    Ok(())
}

#[tokio::test]
async fn test_sync_session_fails_for_non_sync_database() -> Result<()> {
    let ctx = TestContext::new();
    let mut db = Database::open(sync_config("notes.db", "alice", "default"), ctx.registry()).await?;
    db.close();

    let db = Database::open(local_config("notes.db"), ctx.registry()).await?;
    let err = db.sync_session().unwrap_err();
    assert!(err.is_not_sync_enabled());
    assert!(err.is_configuration_error());
    assert_eq!(err.module(), "sync");
    Ok(())
}

#[tokio::test]
async fn test_sync_session_fails_after_close() -> Result<()> {
    let ctx = TestContext::new();
    let mut db = Database::open(sync_config("notes.db", "alice", "p"), ctx.registry()).await?;
    db.close();

    let err = db.sync_session().unwrap_err();
    assert!(err.is_closed());
    assert_eq!(err.module(), "database");
    Ok(())
}

#[tokio::test]
async fn test_open_after_shutdown_fails() {
    let ctx = TestContext::new();
    ctx.registry().shutdown();

    let err = Database::open(sync_config("notes.db", "alice", "p"), ctx.registry())
        .await
        .unwrap_err();
    assert!(err.is_closed());

    // local databases do not need the registry
    let db = Database::open(local_config("plain.db"), ctx.registry())
        .await
        .expect("local open should not touch the registry");
    assert!(!db.configuration().is_sync_enabled());
}
