//! Demo command - opens databases and reports the sessions they share.

use std::sync::Arc;

use session_registry::{
    Configuration, Database, User,
    sync::{InMemorySyncService, LifecycleEvent, RegistrySettings, SessionRegistry},
};
use tracing::{info, warn};

use crate::cli::DemoArgs;
use crate::output::{OutputFormat, print_table};

/// Run the demo command
pub async fn run(
    args: &DemoArgs,
    settings: RegistrySettings,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = Arc::new(InMemorySyncService::new());
    let registry = SessionRegistry::with_settings(service.clone(), settings);
    registry.on_lifecycle(|event| match event {
        LifecycleEvent::Created {
            identity,
            generation,
        } => info!(%identity, generation, "session created"),
        LifecycleEvent::Evicted { identity, .. } => info!(%identity, "session evicted"),
        _ => {}
    });

    let user = User::new(&args.user);
    let mut databases = Vec::new();
    for partition in &args.partitions {
        for copy in 0..args.copies {
            let slug: String = partition
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .collect();
            let path = args.data_dir.join(format!("{slug}-{copy}.db"));
            let config = Configuration::builder(path)
                .sync(user.clone(), partition.as_str())
                .build()?;
            databases.push(Database::open(config, &registry).await?);
        }
    }

    let plain = Database::open(
        Configuration::local(args.data_dir.join("local.db"))?,
        &registry,
    )
    .await?;
    if let Err(e) = plain.sync_session() {
        warn!(path = %plain.path().display(), "{e}");
    }

    let rows: Vec<Vec<String>> = databases
        .iter()
        .map(|db| -> Result<Vec<String>, session_registry::Error> {
            let session = db.sync_session()?;
            Ok(vec![
                db.path().display().to_string(),
                session.identity().to_string(),
                session.generation().to_string(),
                session.state().to_string(),
                registry.ref_count(session.identity()).to_string(),
            ])
        })
        .collect::<Result<_, _>>()?;

    match format {
        OutputFormat::Human => {
            print_table(&["PATH", "IDENTITY", "GENERATION", "STATE", "REFS"], &rows);
            println!();
            println!(
                "{} databases, {} sessions, {} materializations",
                databases.len(),
                registry.len(),
                service.materialize_count()
            );
        }
        OutputFormat::Json => {
            let value = serde_json::json!({
                "databases": rows.iter().map(|row| serde_json::json!({
                    "path": row[0],
                    "identity": row[1],
                    "generation": row[2],
                    "state": row[3],
                    "refs": row[4],
                })).collect::<Vec<_>>(),
                "sessions": registry.len(),
                "materializations": service.materialize_count(),
            });
            println!("{}", serde_json::to_string(&value)?);
        }
    }

    for db in &mut databases {
        db.close();
    }
    let grace = registry.settings().grace_period();
    info!(?grace, "All databases closed, waiting for eviction");
    tokio::time::sleep(grace + std::time::Duration::from_millis(50)).await;
    info!(
        disposed = service.dispose_count(),
        remaining = registry.len(),
        "Grace period elapsed"
    );

    registry.shutdown();
    Ok(())
}
