use std::ops::Range;
use std::panic;
use std::thread;

use crossbeam_channel::bounded;

use crate::cancel::CancelToken;

pub const DEFAULT_PARALLELISM: usize = 16;

/// Dispatch configuration, resolved before any work starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    parallelism: usize,
}

impl Options {
    /// Sets the number of workers doing work at the same time. Zero becomes one.
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    /// One worker per logical CPU.
    pub fn per_cpu() -> Self {
        Self::default().with_parallelism(num_cpus::get())
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Chunk size aiming for good CPU utilization:
    /// `max(1, min(sqrt(pieces), pieces / parallelism + 1))`.
    pub fn chunk_size_for(&self, pieces: usize) -> usize {
        let s = pieces.isqrt();
        let r = pieces / self.parallelism + 1;
        if s > r {
            r
        } else {
            s.max(1)
        }
    }

    pub fn plan(&self, pieces: usize) -> Plan {
        let chunk_size = self.chunk_size_for(pieces);
        let chunks = pieces.div_ceil(chunk_size);
        Plan {
            pieces,
            chunk_size,
            chunks,
            workers: self.parallelism.min(chunks),
        }
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            parallelism: DEFAULT_PARALLELISM,
        }
    }
}

/// How one dispatch call splits its pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub pieces: usize,
    pub chunk_size: usize,
    pub chunks: usize,
    pub workers: usize,
}

impl Plan {
    /// Piece indices covered by `chunk`; the last chunk may be short.
    pub fn chunk_range(&self, chunk: usize) -> Range<usize> {
        let start = (chunk * self.chunk_size).min(self.pieces);
        let end = (start + self.chunk_size).min(self.pieces);
        start..end
    }
}

/// Runs `work` once for every index in `0..pieces` and blocks until all
/// workers are done.
///
/// Workers check `signal` before each piece and exit as soon as it reports
/// cancelled; a callback that is already running is never interrupted. A
/// `None` signal never cancels.
///
/// If a callback panics, the panic is resumed on the calling thread once
/// every worker has exited.
pub fn until<F>(signal: Option<&CancelToken>, pieces: usize, work: F, options: Options)
where
    F: Fn(usize) + Sync,
{
    if pieces == 0 {
        return;
    }

    let plan = options.plan(pieces);
    log::debug!(
        "dispatching {} pieces: chunk_size={} chunks={} workers={}",
        plan.pieces,
        plan.chunk_size,
        plan.chunks,
        plan.workers
    );

    let (tx, to_process) = bounded(plan.chunks);
    for chunk in 0..plan.chunks {
        // capacity equals the chunk count and the receiver is alive
        let _ = tx.send(chunk);
    }
    drop(tx);

    let stopped = || signal.is_some_and(CancelToken::is_cancelled);
    let work = &work;

    let panicked = thread::scope(|s| {
        let handles: Vec<_> = (0..plan.workers)
            .map(|worker_id| {
                let to_process = to_process.clone();
                let stopped = &stopped;
                s.spawn(move || {
                    for chunk in to_process.iter() {
                        for piece in plan.chunk_range(chunk) {
                            if stopped() {
                                log::debug!("worker {} stopping at piece {}", worker_id, piece);
                                return;
                            }
                            work(piece);
                        }
                    }
                })
            })
            .collect();

        // join every worker before surfacing the first panic
        handles
            .into_iter()
            .fold(None, |first, handle| first.or(handle.join().err()))
    });

    if let Some(payload) = panicked {
        panic::resume_unwind(payload);
    }
}
