use std::fmt::Write as _;
use std::path::Path;

use evmix_engine::{
    CsvRowReader, CsvRowWriter, EventMixer, ExecutionMode, MixerConfig, RowReader,
};
use evmix_schema::{Row, Schema};

const CONFIG: &str = r#"
threads: 3
window_capacity: 4
execution: parallel
binning:
  x: { variable: cent, bins: 4, min: 0.0, max: 100.0 }
  y: { variable: zvtx, bins: 2, min: -10.0, max: 10.0 }
exclusion_variable: event
input_columns: [cent/D, zvtx/D, event/I, pt/D, eta/D, phi/D, pt2/D, phi2/D]
output_columns: [event/I, cent/D, pt/D, pt2/D, phi2/D]
second_element_columns: [pt2, phi2]
max_output_size: 200
physics_veto:
  max_invariant_mass: 50.0
  first:  { pt: pt, eta: eta, phi: phi, mass: 2.80839 }
  second: { pt: pt2, eta: eta, phi: phi2, mass: 0.938272 }
"#;

fn write_input(path: &Path, rows: usize) {
    let mut raw = String::from("event,cent,zvtx,pt,eta,phi,pt2,phi2,unused\n");
    for i in 0..rows {
        let cent = ((i * 29) % 110) as f64;
        let zvtx = ((i * 13) % 24) as f64 - 12.0;
        let pt = 0.5 + (i % 7) as f64;
        let phi = (i % 6) as f64 - 3.0;
        writeln!(
            raw,
            "{},{cent},{zvtx},{pt},{},{phi},{},{},x",
            i / 4,
            (i % 5) as f64 * 0.1,
            pt * 0.5,
            -phi,
        )
        .unwrap();
    }
    std::fs::write(path, raw).unwrap();
}

fn run(dir: &Path, mode: ExecutionMode) -> String {
    let input = dir.join("input.csv");
    let output = dir.join(format!("mixed-{mode}.csv"));

    let config = MixerConfig::from_yaml_str(CONFIG).unwrap();
    let mut mixer = EventMixer::new(config).unwrap();
    mixer.log_summary();

    let mut reader = CsvRowReader::open(&input).unwrap();
    mixer.ingest(&mut reader).unwrap();
    mixer.sort().unwrap();
    mixer.mix(mode).unwrap();

    let mut writer = CsvRowWriter::create(&output).unwrap();
    let written = mixer.export(&mut writer).unwrap();
    drop(writer);

    assert_eq!(written, mixer.mixed_rows().len());
    std::fs::read_to_string(output).unwrap()
}

#[test]
fn test_csv_pipeline_parallel_matches_sequential() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let dir = tempfile::tempdir().unwrap();
    write_input(&dir.path().join("input.csv"), 400);

    let sequential = run(dir.path(), ExecutionMode::Sequential);
    let parallel = run(dir.path(), ExecutionMode::Parallel);
    assert_eq!(parallel, sequential);

    let mut lines = sequential.lines();
    assert_eq!(lines.next(), Some("event,cent,pt,pt2,phi2"));
    let body: Vec<&str> = lines.collect();
    assert!(!body.is_empty());
    assert!(body.len() <= 200);
}

#[test]
fn test_csv_output_is_readable_as_input() {
    let dir = tempfile::tempdir().unwrap();
    write_input(&dir.path().join("input.csv"), 200);
    run(dir.path(), ExecutionMode::SharedLock);

    let schema = std::sync::Arc::new(
        Schema::parse_dictionary(&["event/I", "cent/D", "pt/D", "pt2/D", "phi2/D"]).unwrap(),
    );
    let mut reader = CsvRowReader::open(&dir.path().join("mixed-shared-lock.csv")).unwrap();
    reader.bind(&schema).unwrap();

    let mut row = Row::new(schema);
    for entry in 0..reader.len() {
        reader.read_into(entry, &mut row).unwrap();
        let cent = row.get_as::<f64>("cent").unwrap();
        assert!((0.0..100.0).contains(&cent), "{row}");
    }
}
