mod generate;
mod mix;

use std::path::PathBuf;

use clap::Subcommand;
use evmix_engine::ExecutionMode;
use tracing::info;

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build a mixed-event sample from a CSV input.
    Mix {
        #[arg(short, long, env = "EVMIX_CONFIG")]
        /// The mixer configuration, YAML or JSON if the file ends in `.json`.
        config: PathBuf,
        #[arg(short, long)]
        /// The CSV file to read rows from.
        ///
        /// The header line must name every input column of the config.
        input: PathBuf,
        #[arg(short, long)]
        /// The CSV file the mixed rows are written to.
        output: PathBuf,
        #[arg(long)]
        /// Overrides the number of workers of the config.
        threads: Option<usize>,
        #[arg(long)]
        /// Overrides the execution mode of the config. {n}
        /// {n}
        /// * `sequential` mixes every bin on one thread. {n}
        /// * `parallel` gives each worker a local buffer, the output matches `sequential`. {n}
        /// * `shared-lock` has all workers append to one locked collection.
        execution: Option<ExecutionMode>,
    },
    /// Write a synthetic CSV sample to exercise the mixer.
    Generate {
        #[arg(short, long)]
        /// The CSV file to create.
        output: PathBuf,
        #[arg(long, default_value_t = 100_000)]
        /// The number of rows to generate.
        rows: usize,
        #[arg(long, default_value_t = 42)]
        /// The seed of the random generator.
        seed: u64,
    },
}

impl Commands {
    /// Triggers any additional startup messages which are aware
    /// of the provided subcommand.
    pub fn display_startup_message(&self) {
        match self {
            Commands::Mix {
                config,
                input,
                output,
                ..
            } => {
                info!(
                    config = %config.display(),
                    input = %input.display(),
                    output = %output.display(),
                    "Starting a mixing run",
                );
            },
            Commands::Generate { output, rows, seed } => {
                info!(output = %output.display(), rows, seed, "Generating a synthetic sample");
            },
        }
    }

    /// Executes the command
    pub fn execute(self) -> anyhow::Result<()> {
        match self {
            Commands::Mix {
                config,
                input,
                output,
                threads,
                execution,
            } => mix::run(&config, &input, &output, threads, execution)?,
            Commands::Generate { output, rows, seed } => generate::run(&output, rows, seed)?,
        }

        Ok(())
    }
}
