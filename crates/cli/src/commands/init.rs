//! `loreguard init` — Print or write the default engine config.

use loreguard_config::EngineConfig;

pub async fn run(write: bool) -> Result<(), Box<dyn std::error::Error>> {
    let default_toml = EngineConfig::default_toml();
    if !write {
        print!("{default_toml}");
        return Ok(());
    }

    let config_dir = EngineConfig::config_dir();
    let config_path = config_dir.join("config.toml");
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        eprintln!("Created config directory: {}", config_dir.display());
    }

    if config_path.exists() {
        eprintln!("Config already exists at: {}", config_path.display());
        eprintln!("Edit it manually or delete it and re-run init.");
    } else {
        std::fs::write(&config_path, &default_toml)?;
        eprintln!("Created config.toml at: {}", config_path.display());
    }
    Ok(())
}
