//! Cheap pass: rank every live process so only the top few get a detailed read.

use super::source::{BasicReading, MetricSource};
use crate::cancel::CancelToken;
use log::{trace, warn};
use std::thread;
use sysinfo::Pid;

/// A process that survived the cheap pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub pid: Pid,
    pub score: f64,
}

/// CPU% plus memory%. Only meaningful for ranking.
pub fn priority_score(basic: &BasicReading) -> f64 {
    basic.cpu_percent + basic.memory_percent
}

/// Orders by score descending, then pid ascending, and keeps at most `limit`.
pub fn rank(mut candidates: Vec<Candidate>, limit: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.pid.cmp(&b.pid)));
    candidates.truncate(limit);
    candidates
}

/// Runs the basic read on each pid and returns the top `limit` by score.
///
/// Processes whose read fails are skipped for this cycle. Cancellation is
/// checked every `yield_every` pids; `None` means the pass was abandoned.
pub fn prioritize<S: MetricSource + ?Sized>(
    source: &S,
    pids: &[Pid],
    limit: usize,
    yield_every: usize,
    cancel: &CancelToken,
) -> Option<Vec<Candidate>> {
    let yield_every = yield_every.max(1);
    let mut candidates = Vec::with_capacity(pids.len());

    for (i, &pid) in pids.iter().enumerate() {
        if i % yield_every == 0 {
            if cancel.is_cancelled() {
                return None;
            }
            if i > 0 {
                thread::yield_now();
            }
        }

        match source.read_basic(pid) {
            Ok(basic) => candidates.push(Candidate {
                pid,
                score: priority_score(&basic),
            }),
            Err(err) if err.is_per_process() => trace!("skipping {pid} in cheap pass: {err}"),
            Err(err) => warn!("basic read of {pid} failed: {err}"),
        }
    }

    Some(rank(candidates, limit))
}
