use crate::config::{SimulatorConfig, ValidationError};
use crate::topology::Preset;
use color_eyre::Result;
use log::info;
use std::fs::File;
use std::path::Path;

/// Load and parse configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<SimulatorConfig> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)?;
    let config: SimulatorConfig = serde_yaml::from_reader(file)?;

    config.validate()?;

    Ok(config)
}

/// Load a configuration file when one is given, otherwise use the defaults
pub fn load_or_default(config_path: Option<&Path>) -> Result<SimulatorConfig> {
    match config_path {
        Some(path) => load_config(path),
        None => {
            info!("No configuration file given, using defaults");
            Ok(SimulatorConfig::default())
        }
    }
}

/// CLI arguments that can override YAML settings
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub listen: Option<String>,
    pub preset: Option<String>,
    pub log_level: Option<String>,
}

/// Apply CLI overrides to a configuration
pub fn apply_cli_overrides(config: &mut SimulatorConfig, overrides: &CliOverrides) -> Result<()> {
    if let Some(listen) = &overrides.listen {
        info!("Overriding listen address: {}", listen);
        config.netconf.listen = listen.clone();
    }

    if let Some(preset) = &overrides.preset {
        let preset: Preset = preset.parse().map_err(ValidationError::InvalidTopology)?;
        info!("Overriding topology preset: {}", preset);
        config.topology.preset = preset;
    }

    if let Some(level) = &overrides.log_level {
        config.general.log_level = Some(level.clone());
    }

    // Re-validate after applying overrides
    config.validate()?;

    Ok(())
}
