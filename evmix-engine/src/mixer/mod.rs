mod bins;
mod dispatch;

use std::io;
use std::sync::Arc;

use evmix_schema::{Row, Schema, SchemaError};
use tracing::{debug, info, instrument};

pub use self::dispatch::partition_bins;
use self::bins::{LocalBuffer, MixingContext};
use crate::binning::BinIndex;
use crate::config::{ConfigError, ExecutionMode, MixerConfig};
use crate::io::{IoError, RowReader, RowWriter};
use crate::veto::InvariantMassVeto;

const PROGRESS_INTERVAL: usize = 100_000;

#[derive(Debug, thiserror::Error)]
/// An error that can occur while running the mixing pipeline.
pub enum MixerError {
    #[error("Config Error: {0}")]
    /// The configuration could not be loaded or is invalid.
    Config(#[from] ConfigError),
    #[error("Schema Error: {0}")]
    /// A configured column could not be resolved against the schema.
    Schema(#[from] SchemaError),
    #[error("IO Error: {0}")]
    /// The reader or writer failed.
    Io(#[from] IoError),
    #[error("Rows must be sorted before mixing")]
    /// Mixing was attempted before [EventMixer::sort].
    NotSorted,
    #[error("Bin {bin} is not a mixing bin, only {n_bins} exist")]
    /// The requested bin does not exist or is the overflow bin.
    UnknownBin { bin: usize, n_bins: usize },
    #[error("Failed to spawn mixing worker: {0}")]
    /// The OS refused to start a worker thread.
    WorkerSpawn(#[source] io::Error),
}

#[derive(Debug, Clone)]
struct ResolvedColumns {
    x: usize,
    y: usize,
    exclusion: usize,
    second_element: Vec<usize>,
    /// Input position of every output column, in output order.
    output_projection: Vec<usize>,
}

impl ResolvedColumns {
    fn resolve(
        config: &MixerConfig,
        input: &Schema,
        output: &Schema,
    ) -> Result<Self, SchemaError> {
        let x = input.numeric_index_of(&config.binning.x.variable)?;
        let y = input.numeric_index_of(&config.binning.y.variable)?;
        let exclusion = input.index_of(&config.exclusion_variable)?;

        let second_element = config
            .second_element_columns
            .iter()
            .map(|name| input.index_of(name))
            .collect::<Result<Vec<_>, _>>()?;

        let output_projection = output
            .columns()
            .iter()
            .map(|column| {
                let index = input.index_of(column.name())?;
                let actual = input.columns()[index].ty();
                if actual != column.ty() {
                    return Err(SchemaError::TypeMismatch {
                        column: column.name().to_string(),
                        expected: column.ty(),
                        actual,
                    });
                }
                Ok(index)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            x,
            y,
            exclusion,
            second_element,
            output_projection,
        })
    }
}

/// Builds a combinatorial background sample by pairing rows from
/// different events that fall in the same bin.
///
/// A run goes through [EventMixer::ingest], [EventMixer::sort],
/// [EventMixer::mix] and finally [EventMixer::export]. Ingesting again
/// discards the results of the previous run.
///
/// ## Mixing
///
/// Rows are grouped by the bin of their two binning variables, the overflow
/// bin is never mixed. Within a bin rows are visited in arrival order and
/// each row is paired with every row currently held in a bounded window of
/// the most recent rows of that bin, skipping partners which share the
/// exclusion variable. The mixed row is a copy of the current row with the
/// second element columns taken from the partner.
pub struct EventMixer {
    config: MixerConfig,
    input_schema: Arc<Schema>,
    output_schema: Arc<Schema>,
    histogram: BinIndex,
    columns: ResolvedColumns,
    veto: Option<InvariantMassVeto>,
    /// Retained rows in arrival order, released once sorted.
    input: Vec<Row>,
    sorted: Vec<Row>,
    is_sorted: bool,
    bin_offsets: Vec<usize>,
    mixed: Vec<Row>,
    mixed_bin_offsets: Vec<usize>,
}

impl EventMixer {
    /// Creates a new mixer, resolving every configured column.
    pub fn new(config: MixerConfig) -> Result<Self, MixerError> {
        config.validate()?;

        let input_schema = Arc::new(Schema::from_dictionary(&config.input_columns)?);
        let output_schema = Arc::new(Schema::from_dictionary(&config.output_columns)?);
        let columns = ResolvedColumns::resolve(&config, &input_schema, &output_schema)?;

        let veto = match &config.physics_veto {
            Some(veto) => InvariantMassVeto::resolve(veto, &input_schema)?,
            None => None,
        };

        let histogram = BinIndex::from_config(&config.binning);

        Ok(Self {
            config,
            input_schema,
            output_schema,
            histogram,
            columns,
            veto,
            input: Vec::new(),
            sorted: Vec::new(),
            is_sorted: false,
            bin_offsets: Vec::new(),
            mixed: Vec::new(),
            mixed_bin_offsets: Vec::new(),
        })
    }

    #[instrument(skip_all)]
    /// Reads every entry of the reader, keeping the rows that lie within
    /// the binning range.
    ///
    /// Returns the number of rows kept.
    pub fn ingest<R>(&mut self, reader: &mut R) -> Result<usize, MixerError>
    where
        R: RowReader + ?Sized,
    {
        self.reset();

        reader.bind(&self.input_schema)?;
        let total = reader.len();
        info!(entries = total, "Ingesting rows");

        let mut buffer = Row::new(self.input_schema.clone());
        let mut discarded = 0usize;
        for entry in 0..total {
            reader.read_into(entry, &mut buffer)?;

            let x = buffer.f64_at(self.columns.x)?;
            let y = buffer.f64_at(self.columns.y)?;
            if self.histogram.is_underflow(x, y) {
                discarded += 1;
            } else {
                self.input.push(buffer.clone());
            }

            if (entry + 1) % PROGRESS_INTERVAL == 0 {
                debug!(processed = entry + 1, total, "Ingestion progress");
            }
        }

        debug!(discarded, "Dropped rows outside of the binning range");
        info!(accepted = self.input.len(), rejected = discarded, "Finished ingestion");
        Ok(self.input.len())
    }

    #[instrument(skip_all)]
    /// Groups the ingested rows by bin.
    ///
    /// The sort is stable, rows sharing a bin keep their arrival order.
    pub fn sort(&mut self) -> Result<(), MixerError> {
        if self.is_sorted {
            return Ok(());
        }
        self.histogram.reset();

        let input = std::mem::take(&mut self.input);
        let mut keyed = Vec::with_capacity(input.len());
        for row in input {
            let x = row.f64_at(self.columns.x)?;
            let y = row.f64_at(self.columns.y)?;
            let bin = self.histogram.fill(x, y);
            keyed.push((bin, row));
        }
        keyed.sort_by_key(|(bin, _)| *bin);

        self.sorted = keyed.into_iter().map(|(_, row)| row).collect();
        self.bin_offsets = offsets_from_counts(self.histogram.occupancy());
        self.is_sorted = true;

        let overflow = self.histogram.bin_content(self.histogram.overflow_bin());
        info!(
            rows = self.sorted.len(),
            n_bins = self.histogram.n_bins(),
            overflow = overflow.unwrap_or_default(),
            "Sorted rows by bin",
        );
        Ok(())
    }

    /// Mixes every bin with the given execution mode.
    ///
    /// Returns the number of mixed rows.
    pub fn mix(&mut self, mode: ExecutionMode) -> Result<usize, MixerError> {
        let ctx = self.context()?;
        let n_bins = self.n_mixing_bins();
        let cap = self.config.max_output_size;
        let threads = self.config.threads;

        info!(%mode, threads = self.n_threads(), n_bins, "Mixing rows");
        let output = match mode {
            ExecutionMode::Sequential => dispatch::run_sequential(&ctx, n_bins, cap)?,
            ExecutionMode::Parallel => dispatch::run_parallel(&ctx, n_bins, threads, cap)?,
            ExecutionMode::SharedLock => {
                dispatch::run_shared_lock(&ctx, n_bins, threads, cap)?
            },
        };

        self.mixed_bin_offsets = dispatch::clamped_offsets(&output.counts, cap);
        self.mixed = output.rows;

        info!(mixed = self.mixed.len(), "Finished mixing");
        Ok(self.mixed.len())
    }

    /// Mixes a single bin without storing the result.
    ///
    /// The configured output cap applies to this bin alone.
    pub fn mix_bin(&self, bin: usize) -> Result<Vec<Row>, MixerError> {
        let ctx = self.context()?;
        if bin >= self.n_mixing_bins() {
            return Err(MixerError::UnknownBin {
                bin,
                n_bins: self.n_mixing_bins(),
            });
        }

        let mut sink = LocalBuffer::new(self.config.max_output_size);
        ctx.mix_bin_into(bin, &mut sink)?;
        Ok(sink.into_rows())
    }

    #[instrument(skip_all)]
    /// Writes every mixed row projected onto the output columns.
    ///
    /// Returns the number of rows written.
    pub fn export<W>(&self, writer: &mut W) -> Result<usize, MixerError>
    where
        W: RowWriter + ?Sized,
    {
        writer.bind(&self.output_schema)?;

        let mut projected = Row::new(self.output_schema.clone());
        for mixed in &self.mixed {
            for (slot, &source) in self.columns.output_projection.iter().enumerate() {
                projected.set_at(slot, mixed.values()[source].clone())?;
            }
            writer.write_row(&projected)?;
        }
        writer.finish()?;

        info!(rows = self.mixed.len(), "Exported mixed rows");
        Ok(self.mixed.len())
    }

    /// Logs the effective configuration of the mixer.
    pub fn log_summary(&self) {
        let x = self.histogram.x_axis();
        let y = self.histogram.y_axis();
        info!(
            threads = self.n_threads(),
            window_capacity = self.config.window_capacity,
            execution = %self.config.execution,
            exclusion_variable = %self.config.exclusion_variable,
            second_element_columns = ?self.config.second_element_columns,
            max_output_size = ?self.config.max_output_size,
            "Mixer configuration",
        );
        info!(
            x_variable = %self.config.binning.x.variable,
            x_bins = x.bins(),
            x_min = x.min(),
            x_max = x.max(),
            y_variable = %self.config.binning.y.variable,
            y_bins = y.bins(),
            y_min = y.min(),
            y_max = y.max(),
            "Mixer binning",
        );
        if let Some(veto) = &self.veto {
            info!(
                max_invariant_mass = veto.max_invariant_mass(),
                "Invariant mass veto enabled"
            );
        }
    }

    fn context(&self) -> Result<MixingContext<'_>, MixerError> {
        if !self.is_sorted {
            return Err(MixerError::NotSorted);
        }

        Ok(MixingContext {
            rows: &self.sorted,
            bin_offsets: &self.bin_offsets,
            window_capacity: self.config.window_capacity,
            exclusion: self.columns.exclusion,
            second_element: &self.columns.second_element,
            veto: self.veto.as_ref(),
        })
    }

    fn reset(&mut self) {
        self.input.clear();
        self.sorted = Vec::new();
        self.is_sorted = false;
        self.bin_offsets.clear();
        self.mixed = Vec::new();
        self.mixed_bin_offsets.clear();
        self.histogram.reset();
    }

    #[inline]
    pub fn config(&self) -> &MixerConfig {
        &self.config
    }

    #[inline]
    pub fn input_schema(&self) -> &Arc<Schema> {
        &self.input_schema
    }

    #[inline]
    pub fn output_schema(&self) -> &Arc<Schema> {
        &self.output_schema
    }

    #[inline]
    pub fn histogram(&self) -> &BinIndex {
        &self.histogram
    }

    #[inline]
    /// The mixed rows in collection order.
    pub fn mixed_rows(&self) -> &[Row] {
        &self.mixed
    }

    #[inline]
    /// The sorted rows, grouped by bin.
    pub fn sorted_rows(&self) -> &[Row] {
        &self.sorted
    }

    #[inline]
    /// Offsets into [EventMixer::sorted_rows], bin `i` spans
    /// `offsets[i]..offsets[i + 1]`.
    pub fn bin_offsets(&self) -> &[usize] {
        &self.bin_offsets
    }

    #[inline]
    /// Offsets into [EventMixer::mixed_rows], one segment per mixing bin.
    ///
    /// With [ExecutionMode::SharedLock] the segments only describe how
    /// many rows each bin produced, not where they are stored.
    pub fn mixed_bin_offsets(&self) -> &[usize] {
        &self.mixed_bin_offsets
    }

    #[inline]
    /// Per-bin occupancy, populated by [EventMixer::sort].
    pub fn occupancy(&self) -> &[u64] {
        self.histogram.occupancy()
    }

    /// The number of rows retained from ingestion.
    pub fn n_events(&self) -> usize {
        if self.is_sorted {
            self.sorted.len()
        } else {
            self.input.len()
        }
    }

    #[inline]
    /// The number of bins including the overflow bin.
    pub fn n_bins(&self) -> usize {
        self.histogram.n_bins()
    }

    #[inline]
    /// The number of bins which are mixed.
    pub fn n_mixing_bins(&self) -> usize {
        self.histogram.overflow_bin()
    }

    #[inline]
    /// The number of workers a parallel pass spawns.
    pub fn n_threads(&self) -> usize {
        self.config.threads.min(self.n_mixing_bins())
    }
}

fn offsets_from_counts(counts: &[u64]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(counts.len() + 1);
    let mut total = 0usize;
    offsets.push(total);
    for &count in counts {
        total += count as usize;
        offsets.push(total);
    }
    offsets
}
