//! Binned, windowed event mixing.
//!
//! Rows are read through a [RowReader], filtered by their binning
//! variables, grouped by bin and paired with recent rows of the same bin
//! coming from other events. The resulting mixed rows approximate the
//! combinatorial background of a two particle correlation and are written
//! through a [RowWriter].

pub mod binning;
pub mod config;
pub mod io;
pub mod mixer;
pub mod veto;
pub mod window;

pub use self::binning::{Axis, BinIndex};
pub use self::config::{
    AxisConfig, BinningConfig, ConfigError, ExecutionMode, MixerConfig, ParticleColumns, VetoConfig,
};
pub use self::io::{
    CsvRowReader, CsvRowWriter, IoError, MemoryRowReader, MemoryRowWriter, RowReader, RowWriter,
};
pub use self::mixer::{partition_bins, EventMixer, MixerError};
pub use self::veto::{FourVector, InvariantMassVeto};
pub use self::window::{Window, WindowError};
