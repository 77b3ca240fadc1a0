use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use evmix_engine::{CsvRowReader, CsvRowWriter, EventMixer, ExecutionMode, MixerConfig};
use tracing::info;

/// Runs the full pipeline: load, ingest, sort, mix and export.
pub fn run(
    config_path: &Path,
    input: &Path,
    output: &Path,
    threads: Option<usize>,
    execution: Option<ExecutionMode>,
) -> anyhow::Result<()> {
    let mut config = MixerConfig::from_path(config_path).context("Load config")?;
    if let Some(threads) = threads {
        config.threads = threads;
    }
    if let Some(execution) = execution {
        config.execution = execution;
    }
    let mode = config.execution;

    let mut mixer = EventMixer::new(config).context("Create mixer")?;
    mixer.log_summary();

    let start = Instant::now();
    let mut reader = CsvRowReader::open(input)
        .with_context(|| format!("Open input {}", input.display()))?;
    mixer.ingest(&mut reader).context("Ingest rows")?;
    drop(reader);

    mixer.sort().context("Sort rows")?;
    mixer.mix(mode).context("Mix rows")?;

    let mut writer = CsvRowWriter::create(output)
        .with_context(|| format!("Create output {}", output.display()))?;
    let written = mixer.export(&mut writer).context("Export mixed rows")?;

    info!(
        events = mixer.n_events(),
        mixed = written,
        elapsed = ?start.elapsed(),
        "Mixing run complete",
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::generate;

    const CONFIG: &str = r#"
threads: 4
window_capacity: 5
binning:
  x: { variable: x0, bins: 10, min: -100.0, max: 100.0 }
  y: { variable: x1, bins: 10, min: -100.0, max: 100.0 }
exclusion_variable: x7
input_columns: [x0/D, x1/D, x2/D, x3/I, x4/D, x5/D, x6/D, x7/I]
output_columns: [x0/D, x1/D, x2/D, x3/I, x4/D, x5/D, x6/D, x7/I]
second_element_columns: [x4, x5, x6]
max_output_size: 500
"#;

    #[rstest::rstest]
    #[case(None, None)]
    #[case(Some(1), Some(ExecutionMode::Sequential))]
    #[case(Some(3), Some(ExecutionMode::SharedLock))]
    fn test_generate_then_mix(
        #[case] threads: Option<usize>,
        #[case] execution: Option<ExecutionMode>,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("mixing.yml");
        let input = dir.path().join("input.csv");
        let output = dir.path().join("output.csv");
        std::fs::write(&config, CONFIG).unwrap();

        generate::run(&input, 2_000, 7).unwrap();
        run(&config, &input, &output, threads, execution).unwrap();

        let raw = std::fs::read_to_string(&output).unwrap();
        let mut lines = raw.lines();
        assert_eq!(lines.next(), Some("x0,x1,x2,x3,x4,x5,x6,x7"));
        assert_eq!(lines.count(), 500);
    }

    #[test]
    fn test_missing_config_has_context() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yml");
        let err = run(&missing, &missing, &missing, None, None).unwrap_err();
        assert_eq!(err.to_string(), "Load config");
    }
}
