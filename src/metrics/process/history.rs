use super::{CircularBuffer, ProcessSnapshot};
use std::collections::{HashMap, HashSet};
use std::time::SystemTime;
use sysinfo::Pid;

/// One sampled point of a process series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub timestamp: SystemTime,
    pub cpu_percent: f64,
    pub memory_mb: f64,
    pub disk_read_rate: f64,
    pub disk_write_rate: f64,
    pub disk_read_percent: f64,
    pub disk_write_percent: f64,
    pub net_sent_rate: f64,
    pub net_recv_rate: f64,
}

impl SeriesPoint {
    pub fn from_snapshot(process: &ProcessSnapshot, timestamp: SystemTime) -> Self {
        Self {
            timestamp,
            cpu_percent: process.cpu_percent,
            memory_mb: process.memory_mb,
            disk_read_rate: process.disk_read_rate,
            disk_write_rate: process.disk_write_rate,
            disk_read_percent: process.disk_read_percent,
            disk_write_percent: process.disk_write_percent,
            net_sent_rate: process.net_sent_rate,
            net_recv_rate: process.net_recv_rate,
        }
    }

    pub fn value(&self, metric: SeriesMetric) -> f64 {
        match metric {
            SeriesMetric::Cpu => self.cpu_percent,
            SeriesMetric::Memory => self.memory_mb,
            SeriesMetric::DiskReadRate => self.disk_read_rate,
            SeriesMetric::DiskWriteRate => self.disk_write_rate,
            SeriesMetric::DiskReadPercent => self.disk_read_percent,
            SeriesMetric::DiskWritePercent => self.disk_write_percent,
            SeriesMetric::NetSentRate => self.net_sent_rate,
            SeriesMetric::NetRecvRate => self.net_recv_rate,
        }
    }
}

/// Numeric column of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesMetric {
    Cpu,
    Memory,
    DiskReadRate,
    DiskWriteRate,
    DiskReadPercent,
    DiskWritePercent,
    NetSentRate,
    NetRecvRate,
}

/// Owned copy of a process series, oldest point first.
///
/// Detached from the store: later appends are not visible through it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries {
    pub points: Vec<SeriesPoint>,
    pub capacity: usize,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self, metric: SeriesMetric) -> Vec<f64> {
        self.points.iter().map(|p| p.value(metric)).collect()
    }

    pub fn latest(&self, metric: SeriesMetric) -> Option<f64> {
        self.points.last().map(|p| p.value(metric))
    }

    pub fn peak(&self, metric: SeriesMetric) -> Option<f64> {
        self.points
            .iter()
            .map(|p| p.value(metric))
            .reduce(f64::max)
    }

    pub fn average(&self, metric: SeriesMetric) -> Option<f64> {
        if self.points.is_empty() {
            return None;
        }
        let sum: f64 = self.points.iter().map(|p| p.value(metric)).sum();
        Some(sum / self.points.len() as f64)
    }
}

/// Rolling window of points for every tracked process.
#[derive(Debug, Clone, Default)]
pub struct ProcessHistory {
    histories: HashMap<Pid, CircularBuffer<SeriesPoint>>,
    /// Maximum number of points kept per process
    pub history_len: usize,
}

impl ProcessHistory {
    pub fn new(history_len: usize) -> Self {
        Self {
            histories: HashMap::new(),
            history_len,
        }
    }

    /// Creates an empty series if none exists. An existing series is untouched.
    pub fn ensure_tracked(&mut self, pid: Pid) {
        let len = self.history_len;
        self.histories
            .entry(pid)
            .or_insert_with(|| CircularBuffer::new(len));
    }

    pub fn append(&mut self, pid: Pid, point: SeriesPoint) {
        let len = self.history_len;
        self.histories
            .entry(pid)
            .or_insert_with(|| CircularBuffer::new(len))
            .push(point);
    }

    pub fn get(&self, pid: Pid) -> Option<TimeSeries> {
        self.histories.get(&pid).map(|buffer| TimeSeries {
            points: buffer.as_vec(),
            capacity: buffer.capacity(),
        })
    }

    pub fn is_tracked(&self, pid: Pid) -> bool {
        self.histories.contains_key(&pid)
    }

    pub fn tracked_count(&self) -> usize {
        self.histories.len()
    }

    /// Drops every series whose pid is not live. Returns how many were removed.
    pub fn cleanup_histories(&mut self, live_pids: &HashSet<Pid>) -> usize {
        let before = self.histories.len();
        self.histories.retain(|pid, _| live_pids.contains(pid));
        before - self.histories.len()
    }
}
