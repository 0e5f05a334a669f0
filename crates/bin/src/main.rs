mod cli;
mod commands;
mod output;

use clap::Parser;
use session_registry::sync::RegistrySettings;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use output::OutputFormat;

fn load_settings(cli: &Cli) -> Result<RegistrySettings, Box<dyn std::error::Error>> {
    let mut settings = match &cli.settings {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            tracing::info!("Loaded settings from {}", path.display());
            RegistrySettings::from_json(&json)?
        }
        None => RegistrySettings::default(),
    };
    if let Some(grace_ms) = cli.grace_ms {
        settings.eviction_grace_ms = grace_ms;
    }
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("session_registry=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    let format = OutputFormat::from_flag(cli.json);

    match &cli.command {
        Commands::Demo(args) => commands::demo::run(args, settings, format).await,
        Commands::Settings => commands::settings::run(&settings, format),
    }
}
