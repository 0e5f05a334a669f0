use std::sync::{Arc, Mutex};

use session_registry::{
    Configuration, User,
    sync::{LifecycleEvent, SessionRegistry},
};

// Re-export TestContext for convenience
pub use crate::context::TestContext;

/// Sync configuration for `user` on `partition`, stored at `path`.
pub fn sync_config(path: &str, user: &str, partition: &str) -> Configuration {
    Configuration::builder(path)
        .sync(User::new(user), partition)
        .build()
        .expect("Failed to build sync configuration")
}

/// Local-only configuration stored at `path`.
pub fn local_config(path: &str) -> Configuration {
    Configuration::local(path).expect("Failed to build local configuration")
}

/// Let spawned tasks (e.g. eviction timers that just fired) run.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Record every lifecycle event the registry emits.
pub fn record_events(registry: &SessionRegistry) -> Arc<Mutex<Vec<LifecycleEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    registry.on_lifecycle(move |event| sink.lock().unwrap().push(event.clone()));
    events
}
