use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use evmix_engine::{CsvRowWriter, RowWriter};
use evmix_schema::{Row, Schema};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

const DICTIONARY: [&str; 8] = ["x0/D", "x1/D", "x2/D", "x3/I", "x4/D", "x5/D", "x6/D", "x7/I"];

/// Writes `rows` synthetic rows, the floats are uniform in `[-100, 100)`
/// and the integers uniform in `[0, 100)`.
pub fn run(output: &Path, rows: usize, seed: u64) -> anyhow::Result<()> {
    let schema = Arc::new(Schema::parse_dictionary(&DICTIONARY).context("Build schema")?);
    let mut writer = CsvRowWriter::create(output)
        .with_context(|| format!("Create output {}", output.display()))?;
    writer.bind(&schema)?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut row = Row::new(schema);
    for _ in 0..rows {
        for index in 0..DICTIONARY.len() {
            if index == 3 || index == 7 {
                row.set_at(index, rng.gen_range(0..100i32))?;
            } else {
                row.set_at(index, rng.gen_range(-100.0..100.0f64))?;
            }
        }
        writer.write_row(&row)?;
    }
    writer.finish()?;

    info!(rows, seed, output = %output.display(), "Wrote synthetic sample");
    Ok(())
}

#[cfg(test)]
mod tests {
    use evmix_engine::{CsvRowReader, RowReader};

    use super::*;

    #[test]
    fn test_generate_is_seeded() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        let c = dir.path().join("c.csv");

        run(&a, 50, 1).unwrap();
        run(&b, 50, 1).unwrap();
        run(&c, 50, 2).unwrap();

        let a = std::fs::read_to_string(a).unwrap();
        assert_eq!(a, std::fs::read_to_string(b).unwrap());
        assert_ne!(a, std::fs::read_to_string(c).unwrap());
    }

    #[test]
    fn test_generated_values_in_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.csv");
        run(&path, 200, 3).unwrap();

        let schema = Arc::new(Schema::parse_dictionary(&DICTIONARY).unwrap());
        let mut reader = CsvRowReader::open(&path).unwrap();
        reader.bind(&schema).unwrap();
        assert_eq!(reader.len(), 200);

        let mut row = Row::new(schema);
        for entry in 0..reader.len() {
            reader.read_into(entry, &mut row).unwrap();
            for name in ["x3", "x7"] {
                let value = row.get_as::<i32>(name).unwrap();
                assert!((0..100).contains(&value));
            }
            for name in ["x0", "x1", "x2", "x4", "x5", "x6"] {
                let value = row.get_as::<f64>(name).unwrap();
                assert!((-100.0..100.0).contains(&value));
            }
        }
    }
}
