mod commands;
mod config;
mod di;
mod signals;

use clap::{Parser, Subcommand};
use commands::config::ConfigCommands;
use log::{error, LevelFilter};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use std::path::PathBuf;
use std::process::ExitCode;

/// lightning htlc interception gateway
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct CliArgs {
    /// log level; overrides RUST_LOG
    #[clap(short, long, value_parser)]
    log_level: Option<LevelFilter>,

    #[clap(subcommand)]
    command: RootCommands,
}

#[derive(Subcommand, Debug)]
enum RootCommands {
    /// Run the gateway gRPC service against the configured node
    Service {
        /// Path to the YAML configuration file.
        #[clap(short, long, value_parser)]
        config: PathBuf,
    },

    /// Inspect configuration
    #[clap(subcommand)]
    Config(ConfigCommands),
}

#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    if let RootCommands::Service { .. } = args.command {
        match args.log_level {
            None => {
                if let Err(e) = env_logger::try_init() {
                    eprintln!("failed to initialize env_logger: {e}");
                    return ExitCode::FAILURE;
                }
            }
            Some(level) => {
                if let Err(e) = env_logger::builder().filter_level(level).try_init() {
                    eprintln!("failed to initialize env_logger: {e}");
                    return ExitCode::FAILURE;
                }
            }
        }
    } else {
        let level = args.log_level.unwrap_or(LevelFilter::Info);
        if let Err(e) = TermLogger::init(
            level,
            ConfigBuilder::new()
                .set_time_level(LevelFilter::Off)
                .build(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ) {
            eprintln!("failed to initialize TermLogger: {e}");
            return ExitCode::FAILURE;
        }
    }

    match _main(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:?}");
            ExitCode::FAILURE
        }
    }
}

async fn _main(args: CliArgs) -> anyhow::Result<()> {
    match args.command {
        RootCommands::Service { config } => commands::services::execute(config).await,
        RootCommands::Config(config) => match config {
            ConfigCommands::Check { config } => commands::config::check(config),
        },
    }
}
