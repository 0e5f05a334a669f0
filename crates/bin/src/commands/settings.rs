//! Settings command - shows the effective registry settings.

use session_registry::sync::RegistrySettings;

use crate::output::OutputFormat;

/// Run the settings command
pub fn run(settings: &RegistrySettings, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Human => {
            println!("Eviction grace:  {} ms", settings.eviction_grace_ms);
        }
        OutputFormat::Json => {
            println!("{}", settings.to_json()?);
        }
    }
    Ok(())
}
