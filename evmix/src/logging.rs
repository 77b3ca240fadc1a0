use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::Args;

/// Installs the global subscriber, logs go to stderr.
pub fn init_logging(args: &Args) -> Result<()> {
    let filter = parse_filter(&args.log_level)?;

    let builder = tracing_subscriber::fmt::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_names(true)
        .with_ansi(!args.log_no_ansi);

    if args.log_json {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}

/// Parses a comma separated list of `target=level` directives.
fn parse_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives)
        .with_context(|| format!("Parse log level directives {directives:?}"))
}
