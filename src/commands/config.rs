use crate::cli::ConfigAction;
use crate::services::config::ConfigManager;
use anyhow::{Context, Result};
use tracing::info;

pub fn run(manager: &ConfigManager, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Path => println!("{}", manager.config_file_path().display()),
        ConfigAction::Init => {
            if manager.config_exists() {
                info!("Config already exists at {:?}", manager.config_file_path());
            } else {
                manager.save(&Default::default())?;
            }
            println!("{}", manager.config_file_path().display());
        }
        ConfigAction::Show => {
            let config = manager.load()?;
            let json = serde_json::to_string_pretty(&config).context("failed to render config")?;
            println!("{}", json);
        }
    }
    Ok(())
}
