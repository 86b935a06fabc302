//! Expensive pass: turn cumulative I/O counters into rates and budget shares.

use super::process::ProcessSnapshot;
use super::source::DetailedReading;
use std::time::Instant;
use sysinfo::Pid;

/// Last observed cumulative counters for one pid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IoCounters {
    pub read_bytes: u64,
    pub written_bytes: u64,
    pub sampled_at: Instant,
}

impl From<&DetailedReading> for IoCounters {
    fn from(reading: &DetailedReading) -> Self {
        Self {
            read_bytes: reading.read_bytes,
            written_bytes: reading.written_bytes,
            sampled_at: reading.sampled_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DiskRates {
    /// KB/s
    pub read_rate: f64,
    pub write_rate: f64,
    pub read_percent: f64,
    pub write_percent: f64,
}

/// Share of `budget_kbs` used by `rate_kbs`.
///
/// The budget is a configured estimate of system I/O capacity, not a measured
/// ceiling. With a zero budget the rate in MB/s is used, capped at 100.
pub fn disk_percent(rate_kbs: f64, budget_kbs: f64) -> f64 {
    if budget_kbs > 0.0 {
        rate_kbs / budget_kbs * 100.0
    } else {
        (rate_kbs / 1024.0).min(100.0)
    }
}

/// Rates between `previous` and `current`.
///
/// Without a previous sample, or when no time has elapsed, every field is zero.
/// A counter that went backwards yields a zero rate.
pub fn compute_rates(
    previous: Option<&IoCounters>,
    current: &IoCounters,
    budget_kbs: f64,
) -> DiskRates {
    let Some(previous) = previous else {
        return DiskRates::default();
    };
    let Some(elapsed) = current.sampled_at.checked_duration_since(previous.sampled_at) else {
        return DiskRates::default();
    };
    let seconds = elapsed.as_secs_f64();
    if seconds <= 0.0 {
        return DiskRates::default();
    }

    let read_delta = current.read_bytes.saturating_sub(previous.read_bytes) as f64;
    let write_delta = current.written_bytes.saturating_sub(previous.written_bytes) as f64;
    let read_rate = read_delta / 1024.0 / seconds;
    let write_rate = write_delta / 1024.0 / seconds;

    DiskRates {
        read_rate,
        write_rate,
        read_percent: disk_percent(read_rate, budget_kbs),
        write_percent: disk_percent(write_rate, budget_kbs),
    }
}

/// Assembles the published row. Network fields stay zero.
pub fn build_snapshot(pid: Pid, reading: &DetailedReading, rates: DiskRates) -> ProcessSnapshot {
    ProcessSnapshot {
        cpu_percent: reading.basic.cpu_percent,
        memory_mb: reading.basic.memory_mb,
        memory_percent: reading.basic.memory_percent,
        created_at: reading.created_at,
        disk_read_kb: reading.read_bytes as f64 / 1024.0,
        disk_write_kb: reading.written_bytes as f64 / 1024.0,
        disk_read_rate: rates.read_rate,
        disk_write_rate: rates.write_rate,
        disk_read_percent: rates.read_percent,
        disk_write_percent: rates.write_percent,
        ..ProcessSnapshot::new(pid, reading.basic.name.clone())
    }
}
