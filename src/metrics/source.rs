//! Contract between the pipeline and whatever reads OS metrics.
//!
//! A source is queried once per live process per cycle, so the reads are split
//! into a cheap [`MetricSource::read_basic`] and an expensive
//! [`MetricSource::read_detailed`]. A process that exits between enumeration
//! and a read reports [`SourceError::ProcessGone`]; callers skip it.

use crate::error::SourceError;
use std::time::{Instant, SystemTime};
use sysinfo::Pid;

/// Cheap per-process reading used for prioritization.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BasicReading {
    pub name: String,
    /// Instantaneous CPU usage; exceeds 100 on multi-core hosts
    pub cpu_percent: f64,
    pub memory_mb: f64,
    pub memory_percent: f64,
}

/// Expensive per-process reading with cumulative I/O counters.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailedReading {
    pub basic: BasicReading,
    pub created_at: Option<SystemTime>,
    pub read_bytes: u64,
    pub written_bytes: u64,
    /// When the counters were captured; rates are computed against this
    pub sampled_at: Instant,
}

/// System-wide CPU and memory totals.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SystemTotals {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub total_mb: f64,
    pub used_mb: f64,
}

pub trait MetricSource: Send + Sync {
    /// Identifiers of every live process.
    fn live_pids(&self) -> Result<Vec<Pid>, SourceError>;

    /// Name, CPU and memory. Idempotent, safe to call more than once per cycle.
    fn read_basic(&self, pid: Pid) -> Result<BasicReading, SourceError>;

    /// Basic reading plus creation time and cumulative I/O byte counters.
    fn read_detailed(&self, pid: Pid) -> Result<DetailedReading, SourceError>;

    fn read_system_totals(&self) -> Result<SystemTotals, SourceError>;
}

impl<S: MetricSource + ?Sized> MetricSource for std::sync::Arc<S> {
    fn live_pids(&self) -> Result<Vec<Pid>, SourceError> {
        (**self).live_pids()
    }

    fn read_basic(&self, pid: Pid) -> Result<BasicReading, SourceError> {
        (**self).read_basic(pid)
    }

    fn read_detailed(&self, pid: Pid) -> Result<DetailedReading, SourceError> {
        (**self).read_detailed(pid)
    }

    fn read_system_totals(&self) -> Result<SystemTotals, SourceError> {
        (**self).read_system_totals()
    }
}
