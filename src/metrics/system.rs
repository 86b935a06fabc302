use super::source::SystemTotals;
use std::time::SystemTime;

/// System-wide CPU and memory usage at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct SystemSnapshot {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub total_memory_mb: f64,
    pub used_memory_mb: f64,
    pub captured_at: SystemTime,
}

impl SystemSnapshot {
    pub fn from_totals(totals: SystemTotals, captured_at: SystemTime) -> Self {
        Self {
            cpu_percent: totals.cpu_percent,
            memory_percent: totals.memory_percent,
            total_memory_mb: totals.total_mb,
            used_memory_mb: totals.used_mb,
            captured_at,
        }
    }
}
