use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use ppi_hrv::consumer::Consumer;
use ppi_hrv::report::ReportFormat;
use ppi_hrv::source::{ble, replay, QUEUE_CAPACITY};
use ppi_hrv::{HrvConfig, HrvContext, InputGate};

#[derive(Parser)]
#[command(name = "ppi-hrv", about = "Real-time HRV metrics from pulse-to-pulse intervals")]
struct Cli {
    /// TOML file overriding the default sizing constants
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "csv", global = true)]
    format: ReportFormat,
    /// Largest accepted jump between consecutive intervals (ms)
    #[arg(long, default_value_t = 300, global = true)]
    max_ppi_diff: u16,
    /// Pace processing by the intervals themselves
    #[arg(long, global = true)]
    paced: bool,
    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream from a BLE sensor
    Ble {
        /// Substring of the sensor's advertised name
        #[arg(long, default_value = "Polar Sense")]
        name: String,
        #[arg(long, default_value_t = 5)]
        scan_secs: u64,
        #[arg(long, value_enum, default_value = "pmd")]
        protocol: ble::Protocol,
    },
    /// Replay a recording with one interval per line
    Replay { path: PathBuf },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => HrvConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => HrvConfig::default(),
    };
    let gate = InputGate::new(cli.max_ppi_diff, config.hist_start_ms as u16);
    let context = HrvContext::new(config)?;
    let Cli { cmd, format, paced, .. } = cli;

    let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
    let producer = async move {
        match cmd {
            Commands::Ble { name, scan_secs, protocol } => {
                ble::stream(protocol, &name, Duration::from_secs(scan_secs), tx).await
            }
            Commands::Replay { path } => replay::replay_file(&path, tx).await.map(|_| ()),
        }
    };
    let consumer = Consumer::new(context, gate, io::stdout().lock(), format)
        .paced(paced)
        .run(rx);

    let (produced, consumed) = tokio::join!(producer, consumer);
    produced.context("measurement source failed")?;
    let (context, summary) = consumed.context("writing report")?;
    tracing::info!(
        accepted = summary.accepted,
        rejected = summary.rejected,
        rmssd = context.snapshot().rmssd,
        lf_hf = context.snapshot().lf_hf_ratio,
        "session finished"
    );
    Ok(())
}
