//! Two dimensional digitization of the binning variables.

use crate::config::{AxisConfig, BinningConfig};

#[derive(Debug, Clone, PartialEq)]
/// A uniformly binned axis over `[min, max)`.
pub struct Axis {
    bins: usize,
    min: f64,
    max: f64,
    width: f64,
}

impl Axis {
    /// Creates a new axis.
    ///
    /// The range is expected to be validated, see [MixerConfig::validate](crate::MixerConfig::validate).
    pub fn new(bins: usize, min: f64, max: f64) -> Self {
        debug_assert!(bins > 0 && min < max);
        Self {
            bins,
            min,
            max,
            width: (max - min) / bins as f64,
        }
    }

    #[inline]
    pub fn bins(&self) -> usize {
        self.bins
    }

    #[inline]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[inline]
    /// Returns the bin the value falls into.
    ///
    /// Values are floor-truncated, a value sitting exactly on an edge
    /// belongs to the bin starting at that edge. Values outside of
    /// `[min, max)` and non-finite values have no bin.
    pub fn index_of(&self, value: f64) -> Option<usize> {
        let bin = ((value - self.min) / self.width).floor();
        if bin >= 0.0 && bin < self.bins as f64 {
            Some(bin as usize)
        } else {
            None
        }
    }

    #[inline]
    /// Returns if the value lies within the closed range `[min, max]`.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl From<&AxisConfig> for Axis {
    fn from(config: &AxisConfig) -> Self {
        Self::new(config.bins, config.min, config.max)
    }
}

#[derive(Debug, Clone)]
/// A 2D binning index with per-bin occupancy counts.
///
/// Bins are numbered `x * n_bins_y + y`. One extra bin with the id
/// `n_bins_x * n_bins_y` collects every point outside of the grid, this
/// overflow bin is never used for mixing.
pub struct BinIndex {
    x: Axis,
    y: Axis,
    occupancy: Vec<u64>,
}

impl BinIndex {
    pub fn new(x: Axis, y: Axis) -> Self {
        let occupancy = vec![0; x.bins * y.bins + 1];
        Self { x, y, occupancy }
    }

    pub fn from_config(config: &BinningConfig) -> Self {
        Self::new(Axis::from(&config.x), Axis::from(&config.y))
    }

    #[inline]
    pub fn x_axis(&self) -> &Axis {
        &self.x
    }

    #[inline]
    pub fn y_axis(&self) -> &Axis {
        &self.y
    }

    #[inline]
    pub fn n_bins_x(&self) -> usize {
        self.x.bins
    }

    #[inline]
    pub fn n_bins_y(&self) -> usize {
        self.y.bins
    }

    #[inline]
    /// Returns the total number of bins, including the overflow bin.
    pub fn n_bins(&self) -> usize {
        self.occupancy.len()
    }

    #[inline]
    /// Returns the id of the overflow bin.
    pub fn overflow_bin(&self) -> usize {
        self.x.bins * self.y.bins
    }

    #[inline]
    /// Resolves a point to its bin id, or the overflow id if the point
    /// is outside of the grid.
    pub fn get_bin(&self, x: f64, y: f64) -> usize {
        match (self.x.index_of(x), self.y.index_of(y)) {
            (Some(bin_x), Some(bin_y)) => bin_x * self.y.bins + bin_y,
            _ => self.overflow_bin(),
        }
    }

    #[inline]
    /// Returns if the point is outside the closed binning range.
    ///
    /// This is the check used to discard rows on ingestion, `NaN`
    /// coordinates are always outside.
    pub fn is_underflow(&self, x: f64, y: f64) -> bool {
        !(self.x.contains(x) && self.y.contains(y))
    }

    /// Counts the point in its bin and returns the bin id.
    pub fn fill(&mut self, x: f64, y: f64) -> usize {
        let bin = self.get_bin(x, y);
        self.occupancy[bin] += 1;
        bin
    }

    #[inline]
    pub fn bin_content(&self, bin: usize) -> Option<u64> {
        self.occupancy.get(bin).copied()
    }

    #[inline]
    /// Returns the occupancy of every bin, the last entry is the overflow bin.
    pub fn occupancy(&self) -> &[u64] {
        &self.occupancy
    }

    /// Clears all occupancy counts.
    pub fn reset(&mut self) {
        self.occupancy.fill(0);
    }
}
