use anyhow::Result;
use clap::{Parser, Subcommand};
use pulse_shared::SeriesKind;
use pulse_viewer::{Config, WatchOptions};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "pulse-viewer")]
#[command(about = "Live telemetry chart viewer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow a live chart; type a preset name to switch, `retry` or `quit`
    Watch {
        /// Chart to show (scroller, impact)
        #[arg(short, long, default_value = "scroller")]
        kind: SeriesKind,

        /// Preset to start with
        #[arg(short, long)]
        preset: Option<String>,

        /// Keep an SVG rendition of the chart at this path
        #[arg(long, value_name = "FILE")]
        svg: Option<PathBuf>,

        /// Stop after this many seconds
        #[arg(long)]
        duration_secs: Option<u64>,
    },
    /// Resolve the metadata document and print where it was found
    Resolve {
        #[arg(short, long, default_value = "scroller")]
        kind: SeriesKind,
    },
    /// Regenerate captions
    Caption {
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = match cli.config {
        Some(path) => Config::from_file(&path)?,
        None => Config::from_env()?,
    };

    match cli.command {
        Some(Commands::Watch {
            kind,
            preset,
            svg,
            duration_secs,
        }) => {
            let options = WatchOptions {
                kind,
                preset,
                svg,
                duration: duration_secs.map(Duration::from_secs),
            };
            pulse_viewer::watch(&config, options).await?;
        }
        Some(Commands::Resolve { kind }) => {
            let report = pulse_viewer::resolve(&config, kind).await?;
            if report.metadata.is_none() {
                warn!("No data source for {}", kind.as_str());
            }
            print!("{}", serde_yaml::to_string(&report)?);
        }
        Some(Commands::Caption { count }) => {
            pulse_viewer::captions(&config, count).await?;
        }
        None => {
            // Default: watch the scroller chart
            let options = WatchOptions {
                kind: SeriesKind::Scroller,
                preset: None,
                svg: None,
                duration: None,
            };
            pulse_viewer::watch(&config, options).await?;
        }
    }

    info!("Shutdown complete");
    Ok(())
}
