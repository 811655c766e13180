use crate::config::ServerConfig;
use anyhow::Context;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct ServerConfigInjector {
    config: Arc<ServerConfig>,
}

impl ServerConfigInjector {
    pub fn new(config_path: PathBuf) -> anyhow::Result<Self> {
        info!("loading configuration file: {config_path:?}");

        let config_content = std::fs::read_to_string(&config_path).with_context(|| {
            format!(
                "reading configuration file '{}'",
                config_path.to_string_lossy()
            )
        })?;

        let expanded_config = shellexpand::env(&config_content).with_context(|| {
            format!(
                "expanding configuration file env vars '{}'",
                config_path.to_string_lossy()
            )
        })?;

        let config: ServerConfig = serde_saphyr::from_str(&expanded_config).with_context(|| {
            format!(
                "parsing YAML configuration from file '{}'",
                config_path.to_string_lossy()
            )
        })?;

        config.validate().with_context(|| {
            format!(
                "validating configuration from file '{}'",
                config_path.to_string_lossy()
            )
        })?;

        info!("configuration loaded successfully: {config:?}");

        Ok(Self {
            config: Arc::new(config),
        })
    }

    pub fn get(&self) -> &ServerConfig {
        self.config.as_ref()
    }
}
