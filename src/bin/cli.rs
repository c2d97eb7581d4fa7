//! Arrival alerts CLI
//!
//! Inspect station boards and run arrival alert subscriptions locally.

use std::path::PathBuf;
use std::sync::Arc;

use arrival_alerts::{
    config::{load_all, load_config},
    error::Result,
    models::{BoardVariant, StationRegistryEntry, SubscriptionRequest},
    pipeline,
    services::BoardReader,
};
use clap::{Args, Parser, Subcommand};

/// arrivals - Metro and bus arrival boards with email alerts
#[derive(Parser, Debug)]
#[command(
    name = "arrivals",
    version,
    about = "Metro and bus arrival boards with email alerts"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone, Copy)]
struct VariantArg {
    /// Use the bus network instead of the metro
    #[arg(long)]
    bus: bool,
}

impl VariantArg {
    fn variant(self) -> BoardVariant {
        if self.bus {
            BoardVariant::Bus
        } else {
            BoardVariant::Subway
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List known stations
    Stations {
        #[command(flatten)]
        variant: VariantArg,

        /// Only show stations containing this text
        #[arg(long)]
        filter: Option<String>,
    },

    /// Show the current arrivals board of one or more stations
    Board {
        #[arg(required = true)]
        stations: Vec<String>,

        #[command(flatten)]
        variant: VariantArg,

        /// Print snapshots as JSON
        #[arg(long)]
        json: bool,
    },

    /// Refresh a station board every poll interval until Ctrl-C
    Watch {
        station: String,

        #[command(flatten)]
        variant: VariantArg,
    },

    /// Send alerts for arrivals at a station until Ctrl-C
    Monitor {
        station: String,

        /// Subscriber email address
        #[arg(long)]
        to: String,

        /// Minutes of notice before an arrival (defaults to the configured value)
        #[arg(long)]
        threshold: Option<u32>,

        #[command(flatten)]
        variant: VariantArg,

        /// Log notifications instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate configuration and station registries
    Validate,
}

/// Initialize logging from the configured level, or debug when verbose.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Command::Validate = cli.command {
        init_logging(cli.verbose, "info");
        return pipeline::run_validate(&cli.config);
    }

    let level = load_config(&cli.config)
        .map(|c| c.logging.level)
        .unwrap_or_else(|_| "info".to_string());
    init_logging(cli.verbose, &level);

    let (config, registry) = load_all(&cli.config)?;
    log::debug!(
        "Loaded {} stations using {}",
        registry.len(),
        cli.config.display()
    );
    let timezone = config.board.timezone()?;

    match cli.command {
        Command::Stations { variant, filter } => {
            pipeline::run_stations(&registry, variant.variant(), filter.as_deref());
        }

        Command::Board {
            stations,
            variant,
            json,
        } => {
            let entries = stations
                .iter()
                .map(|name| registry.resolve(variant.variant(), name))
                .collect::<Result<Vec<&StationRegistryEntry>>>()?;
            let reader = BoardReader::from_config(&config)?;
            pipeline::run_board(&reader, &entries, timezone, json).await?;
        }

        Command::Watch { station, variant } => {
            let entry = registry.resolve(variant.variant(), &station)?;
            let reader = BoardReader::from_config(&config)?;
            pipeline::run_watch(&reader, entry, timezone, config.scheduler.poll_interval()).await?;
        }

        Command::Monitor {
            station,
            to,
            threshold,
            variant,
            dry_run,
        } => {
            let request = SubscriptionRequest {
                station,
                variant: variant.variant(),
                address: to,
                threshold_minutes: threshold.unwrap_or(config.scheduler.default_threshold_minutes),
            };
            pipeline::run_monitor(&config, Arc::new(registry), request, dry_run).await?;
        }

        Command::Validate => unreachable!("handled before loading the registry"),
    }

    Ok(())
}
