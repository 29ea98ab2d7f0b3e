//! Chunked parallel execution over the vertex range.
//!
//! Vertices are split into contiguous ranges, one per worker. Output is a
//! staging buffer laid out in vertex order (see
//! [`HalfEdgeMesh::vertex_loop_order`](crate::HalfEdgeMesh::vertex_loop_order)),
//! so each range owns one contiguous slice and workers write without locks.
//! Workers run on scoped threads and are always joined before returning,
//! falling back to a single pass on WASM where threads are unavailable.

use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bevy::prelude::*;

use crate::error::{NormalError, NormalResult};

/// Tuning for the parallel pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Meshes with at most this many vertices run in a single pass. Default: 5000.
    pub parallel_threshold: usize,
    /// Number of workers. `None` uses [`std::thread::available_parallelism`].
    pub workers: Option<usize>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: 5000,
            workers: None,
        }
    }
}

impl ScheduleConfig {
    pub fn effective_workers(&self) -> usize {
        self.workers
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }
}

/// Contiguous vertex ranges, one per worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulePlan {
    chunks: Vec<Range<usize>>,
}

impl SchedulePlan {
    /// Plan a pass over `vertex_count` vertices.
    pub fn for_vertices(vertex_count: usize, config: &ScheduleConfig) -> Self {
        let serial = cfg!(target_arch = "wasm32") || vertex_count <= config.parallel_threshold;
        let workers = if serial {
            1
        } else {
            config.effective_workers()
        };
        Self::with_workers(vertex_count, workers)
    }

    /// Split `0..vertex_count` into `workers` near-equal ranges.
    ///
    /// The worker count is clamped to `1..=vertex_count` so no range is empty
    /// unless the mesh has no vertices at all.
    pub fn with_workers(vertex_count: usize, workers: usize) -> Self {
        let k = workers.clamp(1, vertex_count.max(1));
        let chunks = (0..k)
            .map(|i| i * vertex_count / k..(i + 1) * vertex_count / k)
            .collect();
        Self { chunks }
    }

    pub fn chunks(&self) -> &[Range<usize>] {
        &self.chunks
    }

    pub fn worker_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_parallel(&self) -> bool {
        self.chunks.len() > 1 && !cfg!(target_arch = "wasm32")
    }
}

/// Cooperative cancellation flag shared between a caller and its workers.
///
/// Cloning creates another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Raises the shared stop flag if the owning worker unwinds.
struct StopOnPanic<'a>(&'a AtomicBool);

impl Drop for StopOnPanic<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.store(true, Ordering::Release);
        }
    }
}

/// Run `process` for every vertex of the plan.
///
/// `offsets` are CSR offsets (`vertex_count + 1` entries) into `output`;
/// `process` receives its per-worker state, the vertex index and the slice
/// `output[offsets[v]..offsets[v + 1]]`. It returns a count that is summed
/// over all vertices.
///
/// A worker that panics fails the whole pass with
/// [`NormalError::WorkerFailed`] after every worker has been joined; the
/// other workers stop at their next vertex. A cancelled token yields
/// [`NormalError::Cancelled`]. On error the contents of `output` are
/// unspecified and must be discarded.
pub fn run_chunked<T, S, I, F>(
    plan: &SchedulePlan,
    offsets: &[u32],
    output: &mut [T],
    cancel: &CancellationToken,
    init: I,
    process: F,
) -> NormalResult<usize>
where
    T: Send,
    I: Fn() -> S + Sync,
    F: Fn(&mut S, usize, &mut [T]) -> usize + Sync,
{
    if !plan.is_parallel() {
        let mut state = init();
        let mut count = 0;
        for range in plan.chunks() {
            for v in range.clone() {
                if cancel.is_cancelled() {
                    return Err(NormalError::Cancelled);
                }
                let slots = offsets[v] as usize..offsets[v + 1] as usize;
                count += process(&mut state, v, &mut output[slots]);
            }
        }
        return Ok(count);
    }

    debug!(
        "Running split normals on {} workers ({} vertices)",
        plan.worker_count(),
        offsets.len().saturating_sub(1)
    );

    let stop = AtomicBool::new(false);
    let results: Vec<std::thread::Result<Option<usize>>> = std::thread::scope(|scope| {
        let mut rest = output;
        let mut consumed = 0usize;
        let mut handles = Vec::with_capacity(plan.worker_count());

        for range in plan.chunks() {
            let end = offsets[range.end] as usize;
            let (mine, tail) = std::mem::take(&mut rest).split_at_mut(end - consumed);
            rest = tail;
            let base = consumed;
            consumed = end;

            let range = range.clone();
            let (init, process, stop) = (&init, &process, &stop);
            handles.push(scope.spawn(move || {
                let _guard = StopOnPanic(stop);
                let mut state = init();
                let mut count = 0;
                for v in range {
                    if stop.load(Ordering::Acquire) || cancel.is_cancelled() {
                        return None;
                    }
                    let slots = offsets[v] as usize - base..offsets[v + 1] as usize - base;
                    count += process(&mut state, v, &mut mine[slots]);
                }
                Some(count)
            }));
        }

        handles.into_iter().map(|h| h.join()).collect()
    });

    let mut total = 0;
    let mut cancelled = false;
    for (worker, result) in results.into_iter().enumerate() {
        match result {
            Err(_) => {
                let range = &plan.chunks()[worker];
                error!(
                    "Split normal worker {} panicked on vertices {}..{}",
                    worker, range.start, range.end
                );
                return Err(NormalError::WorkerFailed {
                    worker,
                    start: range.start,
                    end: range.end,
                });
            }
            Ok(None) => cancelled = true,
            Ok(Some(count)) => total += count,
        }
    }

    if cancelled {
        return Err(NormalError::Cancelled);
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Offsets for `n` vertices with `i % 3 + 1` slots each.
    fn offsets(n: usize) -> Vec<u32> {
        let mut out = vec![0u32];
        for i in 0..n {
            let last = *out.last().unwrap();
            out.push(last + (i % 3 + 1) as u32);
        }
        out
    }

    #[test]
    fn schedule_config_default() {
        let config = ScheduleConfig::default();
        assert_eq!(config.parallel_threshold, 5000);
        assert!(config.workers.is_none());
        assert!(config.effective_workers() >= 1);
    }

    #[test]
    fn chunks_cover_range_contiguously() {
        let plan = SchedulePlan::with_workers(10, 3);
        assert_eq!(plan.chunks(), &[0..3, 3..6, 6..10]);

        let plan = SchedulePlan::with_workers(2, 8);
        assert_eq!(plan.worker_count(), 2);

        let plan = SchedulePlan::with_workers(0, 4);
        assert_eq!(plan.chunks(), &[0..0]);
    }

    #[test]
    fn small_meshes_run_serially() {
        let config = ScheduleConfig {
            parallel_threshold: 5000,
            workers: Some(4),
        };
        assert_eq!(SchedulePlan::for_vertices(4999, &config).worker_count(), 1);
        assert_eq!(SchedulePlan::for_vertices(5000, &config).worker_count(), 1);

        #[cfg(not(target_arch = "wasm32"))]
        assert_eq!(SchedulePlan::for_vertices(5001, &config).worker_count(), 4);
    }

    #[test]
    fn parallel_matches_serial() {
        let n = 1000;
        let offsets = offsets(n);
        let len = *offsets.last().unwrap() as usize;
        let fill = |_: &mut (), v: usize, out: &mut [u64]| {
            for (i, slot) in out.iter_mut().enumerate() {
                *slot = (v * 31 + i) as u64;
            }
            out.len()
        };

        let mut serial = vec![0u64; len];
        let serial_count = run_chunked(
            &SchedulePlan::with_workers(n, 1),
            &offsets,
            &mut serial,
            &CancellationToken::new(),
            || (),
            fill,
        )
        .unwrap();

        let mut parallel = vec![0u64; len];
        let parallel_count = run_chunked(
            &SchedulePlan::with_workers(n, 7),
            &offsets,
            &mut parallel,
            &CancellationToken::new(),
            || (),
            fill,
        )
        .unwrap();

        assert_eq!(serial, parallel);
        assert_eq!(serial_count, len);
        assert_eq!(parallel_count, len);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn panicking_worker_fails_the_pass() {
        let n = 100;
        let offsets = offsets(n);
        let mut out = vec![0u8; *offsets.last().unwrap() as usize];

        let result = run_chunked(
            &SchedulePlan::with_workers(n, 4),
            &offsets,
            &mut out,
            &CancellationToken::new(),
            || (),
            |_, v, _| {
                if v == 60 {
                    panic!("bad vertex");
                }
                0
            },
        );

        // Vertex 60 lies in the third range (50..75)
        assert!(matches!(
            result,
            Err(NormalError::WorkerFailed {
                worker: 2,
                start: 50,
                end: 75
            })
        ));
    }

    #[test]
    fn cancelled_token_stops_the_pass() {
        let n = 100;
        let offsets = offsets(n);
        let mut out = vec![0u8; *offsets.last().unwrap() as usize];
        let cancel = CancellationToken::new();
        cancel.cancel();

        for workers in [1, 4] {
            let result = run_chunked(
                &SchedulePlan::with_workers(n, workers),
                &offsets,
                &mut out,
                &cancel,
                || (),
                |_, _, _| 1,
            );
            assert!(matches!(result, Err(NormalError::Cancelled)));
        }
    }

    #[test]
    fn cancellation_token_clones_share_flag() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
