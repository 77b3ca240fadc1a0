use std::ops::{ControlFlow, Range};

use evmix_schema::Row;
use parking_lot::Mutex;
use tracing::{debug, instrument};

use super::MixerError;
use crate::veto::InvariantMassVeto;
use crate::window::Window;

/// A destination for mixed rows.
pub(crate) trait MixedSink {
    /// The number of rows this sink accepted so far.
    fn accepted(&self) -> usize;

    /// Returns if no further rows will be accepted.
    fn is_full(&self) -> bool;

    /// Appends a mixed row, breaking once the output cap is reached.
    ///
    /// A full sink drops the row.
    fn append(&mut self, row: Row) -> ControlFlow<()>;
}

/// A sink owned by a single worker.
pub(crate) struct LocalBuffer {
    rows: Vec<Row>,
    cap: Option<usize>,
}

impl LocalBuffer {
    pub(crate) fn new(cap: Option<usize>) -> Self {
        Self {
            rows: Vec::new(),
            cap,
        }
    }

    pub(crate) fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl MixedSink for LocalBuffer {
    fn accepted(&self) -> usize {
        self.rows.len()
    }

    fn is_full(&self) -> bool {
        self.cap.is_some_and(|cap| self.rows.len() >= cap)
    }

    fn append(&mut self, row: Row) -> ControlFlow<()> {
        if self.is_full() {
            return ControlFlow::Break(());
        }
        self.rows.push(row);
        if self.is_full() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}

/// A per-worker handle onto one mutex guarded collection.
///
/// The cap check and the append happen under the same lock.
pub(crate) struct SharedBuffer<'a> {
    rows: &'a Mutex<Vec<Row>>,
    cap: Option<usize>,
    accepted: usize,
}

impl<'a> SharedBuffer<'a> {
    pub(crate) fn new(rows: &'a Mutex<Vec<Row>>, cap: Option<usize>) -> Self {
        Self {
            rows,
            cap,
            accepted: 0,
        }
    }
}

impl MixedSink for SharedBuffer<'_> {
    fn accepted(&self) -> usize {
        self.accepted
    }

    fn is_full(&self) -> bool {
        let len = self.rows.lock().len();
        self.cap.is_some_and(|cap| len >= cap)
    }

    fn append(&mut self, row: Row) -> ControlFlow<()> {
        let mut rows = self.rows.lock();
        let Some(cap) = self.cap else {
            rows.push(row);
            self.accepted += 1;
            return ControlFlow::Continue(());
        };

        if rows.len() >= cap {
            return ControlFlow::Break(());
        }
        rows.push(row);
        self.accepted += 1;
        if rows.len() >= cap {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}

#[derive(Debug, Copy, Clone)]
/// The read-only state shared by every worker during a mixing pass.
pub(crate) struct MixingContext<'a> {
    pub(crate) rows: &'a [Row],
    pub(crate) bin_offsets: &'a [usize],
    pub(crate) window_capacity: usize,
    pub(crate) exclusion: usize,
    pub(crate) second_element: &'a [usize],
    pub(crate) veto: Option<&'a InvariantMassVeto>,
}

impl<'a> MixingContext<'a> {
    /// The rows of the given bin in arrival order.
    pub(crate) fn segment(&self, bin: usize) -> Result<&'a [Row], MixerError> {
        let n_bins = self.bin_offsets.len().saturating_sub(1);
        if bin >= n_bins {
            return Err(MixerError::UnknownBin { bin, n_bins });
        }
        Ok(&self.rows[self.bin_offsets[bin]..self.bin_offsets[bin + 1]])
    }

    /// Pairs every row of the bin with the rows held in its window.
    ///
    /// Each row is pushed into the window only after it was paired, so a
    /// row never pairs with itself. Returns the number of rows the sink
    /// accepted for this bin.
    pub(crate) fn mix_bin_into<S: MixedSink>(
        &self,
        bin: usize,
        sink: &mut S,
    ) -> Result<(usize, ControlFlow<()>), MixerError> {
        let segment = self.segment(bin)?;
        let before = sink.accepted();
        if sink.is_full() {
            return Ok((0, ControlFlow::Break(())));
        }

        let mut window: Window<&Row> = Window::new(self.window_capacity);
        let mut rejected = 0usize;

        for current in segment {
            let tag = &current.values()[self.exclusion];

            for partner in window.iter() {
                if &partner.values()[self.exclusion] == tag {
                    continue;
                }

                if let Some(veto) = self.veto {
                    if veto.rejects(current, partner)? {
                        rejected += 1;
                        continue;
                    }
                }

                let mut mixed = current.clone();
                mixed.copy_columns_from(partner, self.second_element);

                if sink.append(mixed).is_break() {
                    return Ok((sink.accepted() - before, ControlFlow::Break(())));
                }
            }

            window.push(current);
        }

        if rejected > 0 {
            debug!(bin, rejected, "Vetoed mixed candidates");
        }

        Ok((sink.accepted() - before, ControlFlow::Continue(())))
    }

    #[instrument(skip(self, sink), fields(first = bins.start, last = bins.end))]
    /// Mixes a contiguous range of bins in order, returning the per-bin
    /// counts.
    ///
    /// Bins after the one which filled the sink are reported as empty.
    pub(crate) fn mix_range<S: MixedSink>(
        &self,
        bins: Range<usize>,
        sink: &mut S,
    ) -> Result<Vec<usize>, MixerError> {
        let mut counts = vec![0; bins.len()];

        for (slot, bin) in bins.clone().enumerate() {
            let (produced, flow) = self.mix_bin_into(bin, sink)?;
            counts[slot] = produced;
            if flow.is_break() {
                debug!(bin, "Output cap reached, stopping");
                break;
            }
        }

        debug!(produced = sink.accepted(), "Finished bin range");
        Ok(counts)
    }
}
