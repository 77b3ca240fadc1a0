mod commands;
mod logging;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use crate::logging::init_logging;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Debug, Parser)]
#[command(version, about)]
/// evmix, mixed-event background samples from tabular event data.
///
/// Rows are grouped by two binning variables and paired with recent rows
/// of the same bin coming from other events.
pub struct Args {
    #[arg(long, env = "EVMIX_LOG_LEVEL", default_value = "info")]
    /// Set the log level.
    ///
    /// This can filter on various levels, for example `info,evmix_engine::mixer=debug`
    /// will display all logs at `info` level severity and above, and the per-bin
    /// logs of the mixer.
    log_level: String,
    #[arg(long, env = "EVMIX_LOG_JSON")]
    /// Emit logs in JSON format rather than as plain text.
    log_json: bool,
    #[arg(long, env = "EVMIX_LOG_NO_ANSI")]
    /// Disable ANSI colour codes being present in the logs.
    log_no_ansi: bool,
    #[command(subcommand)]
    command: commands::Commands,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args).context("Init logging")?;

    info!("evmix v{}", env!("CARGO_PKG_VERSION"));

    args.command.display_startup_message();
    args.command.execute()
}
