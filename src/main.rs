//! V49 Editor
//!
//! Read, edit and write the configuration of an Alesis V49 over MIDI SysEx.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use v49_editor::config::AppConfig;
use v49_editor::session::EditorSession;
use v49_editor::transport::MidirTransport;
use v49_editor::{cli, discovery, monitor, paths};

/// V49 Editor - SysEx configuration editor for Alesis V49 controllers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,

    /// Print the device configuration as YAML and exit
    #[arg(long, conflicts_with = "monitor")]
    dump: bool,

    /// Print MIDI traffic and active controls
    #[arg(long)]
    monitor: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    let config_path = args.config.unwrap_or_else(paths::default_config_path);
    info!("Configuration file: {}", config_path.display());
    let config = AppConfig::load(&config_path).await?;

    let transport = MidirTransport::new(config.midi.client_name.as_str());
    let marker = config.midi.device_marker.as_str();

    if args.list_ports {
        monitor::list_ports_formatted(&transport, marker)?;
        return Ok(());
    }

    let device = discovery::find_device(&transport, marker)?;
    info!("Using {}", device);
    let (connection, inbound) = transport.connect(&device)?;
    let session = EditorSession::new(
        connection,
        config.activity.hold(),
        config.monitor.log_capacity,
    );

    if args.dump {
        monitor::run_dump(session, inbound).await?;
    } else if args.monitor {
        monitor::run_monitor(session, inbound).await?;
    } else {
        cli::run_editor(session, inbound).await?;
    }

    info!("V49 Editor shutdown complete");
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_writer(std::io::stderr),
        )
        .init();

    Ok(())
}
