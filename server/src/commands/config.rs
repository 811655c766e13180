use crate::di::inject::injectors::config::ServerConfigInjector;
use clap::Subcommand;
use log::info;
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Load and validate a configuration file without starting any service
    Check {
        /// Path to the YAML configuration file.
        #[clap(short, long, value_parser)]
        config: PathBuf,
    },
}

pub fn check(config_path: PathBuf) -> anyhow::Result<()> {
    let injector = ServerConfigInjector::new(config_path)?;
    let config = injector.get();
    info!(
        "configuration valid, gateway service address: {}",
        config.gateway_service.address
    );
    Ok(())
}
