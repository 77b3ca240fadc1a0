use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use bon::Builder;
use evmix_schema::DictionaryEntry;
use serde_derive::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, thiserror::Error)]
/// An error that can occur while loading or validating a [MixerConfig].
pub enum ConfigError {
    #[error("IO Error reading config {path:?}: {source}")]
    /// The config file could not be read.
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("YAML Error: {0}")]
    /// The document is not valid YAML or is missing required keys.
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON Error: {0}")]
    /// The document is not valid JSON or is missing required keys.
    Json(#[from] serde_json::Error),
    #[error("Invalid value for {key:?}: {reason}")]
    /// A key is present but its value cannot be used.
    Invalid { key: String, reason: String },
}

impl ConfigError {
    fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// How bins are distributed when mixing.
pub enum ExecutionMode {
    /// All bins are mixed in order on the calling thread.
    Sequential,
    #[default]
    /// Bins are split between workers which each fill a local buffer,
    /// buffers are concatenated in bin order once every worker is done.
    ///
    /// The output is identical to [ExecutionMode::Sequential].
    Parallel,
    /// Workers append to a single mutex guarded collection.
    ///
    /// The order of the output across bins is not specified.
    SharedLock,
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequential" => Ok(Self::Sequential),
            "parallel" => Ok(Self::Parallel),
            "shared-lock" => Ok(Self::SharedLock),
            other => Err(format!(
                "unknown execution mode {other:?}, expected one of: sequential, parallel, shared-lock"
            )),
        }
    }
}

impl Display for ExecutionMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
            Self::SharedLock => "shared-lock",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
/// The binning of a single axis.
pub struct AxisConfig {
    /// The column holding the binning variable.
    pub variable: String,
    /// The number of bins along the axis.
    pub bins: usize,
    /// The lower edge of the first bin.
    pub min: f64,
    /// The upper edge of the last bin.
    pub max: f64,
}

impl AxisConfig {
    pub fn new(variable: impl Into<String>, bins: usize, min: f64, max: f64) -> Self {
        Self {
            variable: variable.into(),
            bins,
            min,
            max,
        }
    }

    fn validate(&self, key: &str) -> Result<(), ConfigError> {
        if self.variable.is_empty() {
            return Err(ConfigError::invalid(
                format!("{key}.variable"),
                "variable name cannot be empty",
            ));
        }
        if self.bins == 0 {
            return Err(ConfigError::invalid(
                format!("{key}.bins"),
                "axis must have at least one bin",
            ));
        }
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(ConfigError::invalid(key, "axis range must be finite"));
        }
        if self.min >= self.max {
            return Err(ConfigError::invalid(
                key,
                format!("min ({}) must be lower than max ({})", self.min, self.max),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
/// The two binning axes used to group rows for mixing.
pub struct BinningConfig {
    pub x: AxisConfig,
    pub y: AxisConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
/// The kinematic columns and mass hypothesis of one particle.
pub struct ParticleColumns {
    /// Transverse momentum column.
    pub pt: String,
    /// Pseudorapidity column.
    pub eta: String,
    /// Azimuthal angle column.
    pub phi: String,
    /// The mass assigned to the particle.
    pub mass: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
/// An invariant mass veto applied to every candidate pair.
///
/// The first particle is read from the columns of the current row and the
/// second from the columns of its window partner, independently of which
/// columns are listed as second element columns.
pub struct VetoConfig {
    #[serde(default = "default_true")]
    /// Allows keeping the section in the document while switching it off.
    pub enabled: bool,
    /// Candidates with an invariant mass above this value are rejected.
    pub max_invariant_mass: f64,
    pub first: ParticleColumns,
    pub second: ParticleColumns,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
/// Configuration of a mixing run.
///
/// Every key is required unless stated otherwise. The document is fully
/// validated when loaded, before any row is read.
pub struct MixerConfig {
    /// The number of workers used to mix bins.
    ///
    /// The effective number is capped by the number of mixing bins.
    pub threads: usize,
    /// The number of recent rows kept per bin to pair new rows against.
    pub window_capacity: usize,
    #[serde(default)]
    #[builder(default)]
    /// How bins are distributed between workers. Optional.
    pub execution: ExecutionMode,
    /// The two binning axes.
    pub binning: BinningConfig,
    #[builder(into)]
    /// The column identifying the originating event of a row.
    ///
    /// Rows sharing a value are never paired.
    pub exclusion_variable: String,
    /// The dictionary of columns read from the input.
    pub input_columns: Vec<DictionaryEntry>,
    /// The dictionary of columns written to the output.
    ///
    /// Every output column must exist in the input with the same type.
    pub output_columns: Vec<DictionaryEntry>,
    /// The columns copied from the window partner into the mixed row.
    pub second_element_columns: Vec<String>,
    #[serde(default)]
    /// Stops mixing once this many mixed rows exist. Optional.
    pub max_output_size: Option<usize>,
    #[serde(default)]
    /// Rejects physically implausible candidates. Optional.
    pub physics_veto: Option<VetoConfig>,
}

impl MixerConfig {
    /// Loads and validates a config from the given path.
    ///
    /// Files ending in `.json` are parsed as JSON, everything else as YAML.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json_str(&raw)?
        } else {
            Self::from_yaml_str(&raw)?
        };

        info!(path = %path.display(), "Loaded mixer config");
        Ok(config)
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the values of the config which the type system cannot.
    ///
    /// Column names are resolved later against the input dictionary.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::invalid("threads", "at least one thread is required"));
        }
        if self.window_capacity == 0 {
            return Err(ConfigError::invalid(
                "window_capacity",
                "window must hold at least one row",
            ));
        }

        self.binning.x.validate("binning.x")?;
        self.binning.y.validate("binning.y")?;

        if self.exclusion_variable.is_empty() {
            return Err(ConfigError::invalid(
                "exclusion_variable",
                "variable name cannot be empty",
            ));
        }
        if self.input_columns.is_empty() {
            return Err(ConfigError::invalid("input_columns", "dictionary cannot be empty"));
        }
        if self.output_columns.is_empty() {
            return Err(ConfigError::invalid("output_columns", "dictionary cannot be empty"));
        }

        if let Some(veto) = &self.physics_veto {
            if !veto.max_invariant_mass.is_finite() {
                return Err(ConfigError::invalid(
                    "physics_veto.max_invariant_mass",
                    "threshold must be finite",
                ));
            }
            for (key, particle) in [("first", &veto.first), ("second", &veto.second)] {
                if !particle.mass.is_finite() || particle.mass < 0.0 {
                    return Err(ConfigError::invalid(
                        format!("physics_veto.{key}.mass"),
                        "mass must be finite and non-negative",
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use evmix_schema::ColumnType;

    use super::*;

    const SAMPLE: &str = r#"
threads: 4
window_capacity: 5
binning:
  x: { variable: x0, bins: 10, min: -100.0, max: 100.0 }
  y: { variable: x1, bins: 5, min: -100.0, max: 100.0 }
exclusion_variable: x7
input_columns: [x0/D, x1/D, x2/D, x3/I, x7/I]
output_columns: [x0/D, x2/D, x7/I]
second_element_columns: [x2, x3]
"#;

    fn sample() -> MixerConfig {
        MixerConfig::from_yaml_str(SAMPLE).expect("Sample config should load")
    }

    #[test]
    fn test_load_yaml_defaults() {
        let config = sample();
        assert_eq!(config.threads, 4);
        assert_eq!(config.window_capacity, 5);
        assert_eq!(config.execution, ExecutionMode::Parallel);
        assert_eq!(config.binning.y, AxisConfig::new("x1", 5, -100.0, 100.0));
        assert_eq!(config.input_columns[3], DictionaryEntry::new("x3", ColumnType::I32));
        assert_eq!(config.second_element_columns, ["x2", "x3"]);
        assert_eq!(config.max_output_size, None);
        assert_eq!(config.physics_veto, None);
    }

    #[test]
    fn test_load_yaml_optional_sections() {
        let raw = format!(
            "{SAMPLE}
execution: shared-lock
max_output_size: 100
physics_veto:
  max_invariant_mass: 3.78
  first: {{ pt: x0, eta: x1, phi: x2, mass: 2.80839 }}
  second: {{ pt: x0, eta: x1, phi: x3, mass: 0.938272 }}
"
        );
        let config = MixerConfig::from_yaml_str(&raw).expect("Config should load");
        assert_eq!(config.execution, ExecutionMode::SharedLock);
        assert_eq!(config.max_output_size, Some(100));

        let veto = config.physics_veto.expect("Veto should be set");
        assert!(veto.enabled, "Veto should default to enabled");
        assert_eq!(veto.second.phi, "x3");
    }

    #[rstest::rstest]
    #[case("threads")]
    #[case("window_capacity")]
    #[case("binning")]
    #[case("exclusion_variable")]
    #[case("input_columns")]
    #[case("second_element_columns")]
    fn test_missing_required_key(#[case] key: &str) {
        let raw: String = SAMPLE
            .lines()
            .filter(|line| !line.starts_with(key) && !(key == "binning" && line.starts_with("  ")))
            .map(|line| format!("{line}\n"))
            .collect();

        let err = MixerConfig::from_yaml_str(&raw).unwrap_err();
        assert!(
            matches!(err, ConfigError::Yaml(_)),
            "Expected parse error for missing {key}, got: {err:?}"
        );
    }

    #[test]
    fn test_malformed_dictionary_fails_at_load() {
        let raw = SAMPLE.replace("x3/I", "x3/Q");
        let err = MixerConfig::from_yaml_str(&raw).unwrap_err();
        assert!(err.to_string().contains("Unsupported column type"), "{err}");
    }

    #[rstest::rstest]
    #[case("threads: 4", "threads: 0", "threads")]
    #[case("window_capacity: 5", "window_capacity: 0", "window_capacity")]
    #[case("bins: 10", "bins: 0", "binning.x.bins")]
    #[case("min: -100.0, max: 100.0 }\n  y", "min: 100.0, max: -100.0 }\n  y", "binning.x")]
    #[case("exclusion_variable: x7", "exclusion_variable: ''", "exclusion_variable")]
    fn test_invalid_values(#[case] from: &str, #[case] to: &str, #[case] expected_key: &str) {
        let raw = SAMPLE.replacen(from, to, 1);
        assert_ne!(raw, SAMPLE, "Replacement should apply");

        let err = MixerConfig::from_yaml_str(&raw).unwrap_err();
        match err {
            ConfigError::Invalid { key, .. } => assert_eq!(key, expected_key),
            other => panic!("Expected invalid value error, got: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_veto_mass() {
        let mut config = sample();
        config.physics_veto = Some(VetoConfig {
            enabled: true,
            max_invariant_mass: 1.0,
            first: ParticleColumns {
                pt: "x0".into(),
                eta: "x1".into(),
                phi: "x2".into(),
                mass: -1.0,
            },
            second: ParticleColumns {
                pt: "x0".into(),
                eta: "x1".into(),
                phi: "x2".into(),
                mass: 1.0,
            },
        });

        let err = config.validate().unwrap_err();
        assert!(
            matches!(&err, ConfigError::Invalid { key, .. } if key == "physics_veto.first.mass"),
            "{err:?}"
        );
    }

    #[test]
    fn test_load_json_from_path() {
        let config = sample();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixing.json");
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

        let loaded = MixerConfig::from_path(&path).expect("Config should load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_yaml_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixing.yml");
        std::fs::write(&path, SAMPLE).unwrap();

        let loaded = MixerConfig::from_path(&path).expect("Config should load");
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_load_missing_file() {
        let err = MixerConfig::from_path(Path::new("/does/not/exist.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }), "{err:?}");
    }

    #[test]
    fn test_builder_matches_document() {
        let built = MixerConfig::builder()
            .threads(4)
            .window_capacity(5)
            .binning(BinningConfig {
                x: AxisConfig::new("x0", 10, -100.0, 100.0),
                y: AxisConfig::new("x1", 5, -100.0, 100.0),
            })
            .exclusion_variable("x7")
            .input_columns(sample().input_columns)
            .output_columns(sample().output_columns)
            .second_element_columns(vec!["x2".into(), "x3".into()])
            .build();
        assert_eq!(built, sample());
    }

    #[rstest::rstest]
    #[case("sequential", Ok(ExecutionMode::Sequential))]
    #[case("parallel", Ok(ExecutionMode::Parallel))]
    #[case("shared-lock", Ok(ExecutionMode::SharedLock))]
    fn test_execution_mode_parse(
        #[case] raw: &str,
        #[case] expected: Result<ExecutionMode, String>,
    ) {
        assert_eq!(raw.parse::<ExecutionMode>(), expected);
        assert_eq!(expected.unwrap().to_string(), raw);
    }

    #[test]
    fn test_execution_mode_parse_unknown() {
        assert!("threads".parse::<ExecutionMode>().is_err());
    }
}
