use std::ops::Range;
use std::panic;
use std::thread;

use evmix_schema::Row;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::bins::{LocalBuffer, MixingContext, SharedBuffer};
use super::MixerError;

/// Splits `n_bins` bins into at most `threads` contiguous ranges.
///
/// The first `n_bins % workers` ranges get one extra bin. No range is
/// empty, fewer ranges than threads are returned when there are fewer bins.
pub fn partition_bins(n_bins: usize, threads: usize) -> Vec<Range<usize>> {
    let workers = threads.min(n_bins);
    if workers == 0 {
        return Vec::new();
    }

    let base = n_bins / workers;
    let remainder = n_bins % workers;

    let mut ranges = Vec::with_capacity(workers);
    let mut start = 0;
    for worker in 0..workers {
        let len = base + usize::from(worker < remainder);
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

/// Turns per-bin counts into an offset table capped at the output size.
pub(crate) fn clamped_offsets(counts: &[usize], cap: Option<usize>) -> Vec<usize> {
    let limit = cap.unwrap_or(usize::MAX);
    let mut offsets = Vec::with_capacity(counts.len() + 1);
    offsets.push(0);

    let mut total = 0usize;
    for &count in counts {
        total = total.saturating_add(count).min(limit);
        offsets.push(total);
    }
    offsets
}

/// The rows and per-bin counts produced by a mixing pass.
pub(crate) struct MixOutput {
    pub(crate) rows: Vec<Row>,
    pub(crate) counts: Vec<usize>,
}

/// Mixes every bin on the calling thread.
pub(crate) fn run_sequential(
    ctx: &MixingContext<'_>,
    n_bins: usize,
    cap: Option<usize>,
) -> Result<MixOutput, MixerError> {
    let mut sink = LocalBuffer::new(cap);
    let counts = ctx.mix_range(0..n_bins, &mut sink)?;
    Ok(MixOutput {
        rows: sink.into_rows(),
        counts,
    })
}

/// Mixes bins on a pool of workers each filling a local buffer.
///
/// Buffers are concatenated in bin order once every worker has joined,
/// the result is identical to [run_sequential].
pub(crate) fn run_parallel(
    ctx: &MixingContext<'_>,
    n_bins: usize,
    threads: usize,
    cap: Option<usize>,
) -> Result<MixOutput, MixerError> {
    let ranges = partition_bins(n_bins, threads);
    info!(workers = ranges.len(), n_bins, "Spawning mixing workers");

    let results = run_workers(&ranges, |range| {
        let mut sink = LocalBuffer::new(cap);
        let counts = ctx.mix_range(range, &mut sink)?;
        Ok((sink.into_rows(), counts))
    })?;

    let mut rows = Vec::with_capacity(results.iter().map(|(rows, _)| rows.len()).sum());
    let mut counts = Vec::with_capacity(n_bins);
    for (worker_rows, worker_counts) in results {
        rows.extend(worker_rows);
        counts.extend(worker_counts);
    }

    if let Some(cap) = cap {
        rows.truncate(cap);
    }

    Ok(MixOutput { rows, counts })
}

/// Mixes bins on a pool of workers appending to one locked collection.
///
/// The order of rows across bins depends on scheduling.
pub(crate) fn run_shared_lock(
    ctx: &MixingContext<'_>,
    n_bins: usize,
    threads: usize,
    cap: Option<usize>,
) -> Result<MixOutput, MixerError> {
    let ranges = partition_bins(n_bins, threads);
    info!(workers = ranges.len(), n_bins, "Spawning shared-lock mixing workers");

    let shared = Mutex::new(Vec::new());
    let results = run_workers(&ranges, |range| {
        let mut sink = SharedBuffer::new(&shared, cap);
        ctx.mix_range(range, &mut sink)
    })?;

    Ok(MixOutput {
        rows: shared.into_inner(),
        counts: results.into_iter().flatten().collect(),
    })
}

/// Runs the task once per range on named scoped threads, returning the
/// results in range order.
///
/// A panicking worker is resumed on the calling thread once all workers
/// have been joined.
fn run_workers<T, F>(ranges: &[Range<usize>], task: F) -> Result<Vec<T>, MixerError>
where
    T: Send,
    F: Fn(Range<usize>) -> Result<T, MixerError> + Sync,
{
    let task = &task;
    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(ranges.len());
        for (worker, range) in ranges.iter().enumerate() {
            let range = range.clone();
            let handle = thread::Builder::new()
                .name(format!("evmix-worker-{worker}"))
                .spawn_scoped(scope, move || {
                    debug!(worker, bins = ?range, "Mixing worker started");
                    task(range)
                })
                .map_err(MixerError::WorkerSpawn)?;
            handles.push(handle);
        }

        let mut results = Vec::with_capacity(handles.len());
        let mut failure = None;
        for handle in handles {
            match handle.join() {
                Ok(Ok(result)) => results.push(result),
                Ok(Err(err)) => {
                    failure.get_or_insert(err);
                },
                Err(payload) => panic::resume_unwind(payload),
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(results),
        }
    })
}
