pub mod batch;
pub mod check;
pub mod init;
pub mod validate;

use std::path::Path;

use loreguard_config::{ConfigError, EngineConfig};

/// Load the engine config from `path`, or the default location.
///
/// Environment overrides apply either way.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, ConfigError> {
    match path {
        Some(path) => {
            let mut config = EngineConfig::load_from(path)?;
            config.apply_overrides(|key| std::env::var(key).ok())?;
            Ok(config)
        }
        None => EngineConfig::load(),
    }
}
