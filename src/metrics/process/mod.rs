mod circular_buffer;
mod history;
mod monitor;

pub use circular_buffer::*;
pub use history::*;
pub use monitor::*;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;
use std::time::SystemTime;
use sysinfo::Pid;

/// One published row of the process table.
///
/// Built fresh every cycle and never mutated after publishing. The network
/// fields are always zero: per-process network attribution is not sampled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessSnapshot {
    #[serde(serialize_with = "serialize_pid")]
    pub pid: Pid,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_mb: f64,
    pub memory_percent: f64,
    pub created_at: Option<SystemTime>,
    /// Cumulative KB read since process start
    pub disk_read_kb: f64,
    pub disk_write_kb: f64,
    /// KB/s since the previous detailed read
    pub disk_read_rate: f64,
    pub disk_write_rate: f64,
    /// Share of the configured I/O budget, an estimate rather than a measured ceiling
    pub disk_read_percent: f64,
    pub disk_write_percent: f64,
    pub net_sent_kb: f64,
    pub net_recv_kb: f64,
    pub net_sent_rate: f64,
    pub net_recv_rate: f64,
}

impl ProcessSnapshot {
    pub fn new(pid: Pid, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
            cpu_percent: 0.0,
            memory_mb: 0.0,
            memory_percent: 0.0,
            created_at: None,
            disk_read_kb: 0.0,
            disk_write_kb: 0.0,
            disk_read_rate: 0.0,
            disk_write_rate: 0.0,
            disk_read_percent: 0.0,
            disk_write_percent: 0.0,
            net_sent_kb: 0.0,
            net_recv_kb: 0.0,
            net_sent_rate: 0.0,
            net_recv_rate: 0.0,
        }
    }
}

pub(crate) fn serialize_pid<S>(pid: &Pid, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u32(pid.as_u32())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Pid,
    Name,
    #[default]
    Cpu,
    Memory,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pid" => Ok(SortKey::Pid),
            "name" => Ok(SortKey::Name),
            "cpu" => Ok(SortKey::Cpu),
            "memory" | "mem" => Ok(SortKey::Memory),
            other => Err(format!("unknown sort key '{other}'")),
        }
    }
}

/// Ordering applied to the published process list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SortSpec {
    pub key: SortKey,
    pub descending: bool,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            key: SortKey::Cpu,
            descending: true,
        }
    }
}

impl SortSpec {
    pub fn new(key: SortKey, descending: bool) -> Self {
        Self { key, descending }
    }

    /// Compares by the selected key, then by pid ascending regardless of direction.
    pub fn compare(&self, a: &ProcessSnapshot, b: &ProcessSnapshot) -> Ordering {
        let by_key = match self.key {
            SortKey::Pid => a.pid.cmp(&b.pid),
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::Cpu => a.cpu_percent.total_cmp(&b.cpu_percent),
            SortKey::Memory => a.memory_mb.total_cmp(&b.memory_mb),
        };
        let by_key = if self.descending {
            by_key.reverse()
        } else {
            by_key
        };
        by_key.then_with(|| a.pid.cmp(&b.pid))
    }

    pub fn sort(&self, processes: &mut [ProcessSnapshot]) {
        processes.sort_by(|a, b| self.compare(a, b));
    }
}

/// Filter typed into the search box.
///
/// `pid:<n>` selects one identifier, anything else is a case-insensitive
/// substring match on the name or the decimal pid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessQuery {
    All,
    Pid(Pid),
    Text(String),
}

impl From<&str> for ProcessQuery {
    fn from(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() {
            return ProcessQuery::All;
        }
        if let Some(rest) = s.strip_prefix("pid:") {
            if let Ok(pid) = rest.trim().parse::<u32>() {
                return ProcessQuery::Pid(Pid::from_u32(pid));
            }
        }
        ProcessQuery::Text(s.to_lowercase())
    }
}

impl ProcessQuery {
    pub fn matches(&self, process: &ProcessSnapshot) -> bool {
        match self {
            ProcessQuery::All => true,
            ProcessQuery::Pid(pid) => process.pid == *pid,
            ProcessQuery::Text(needle) => {
                process.name.to_lowercase().contains(needle.as_str())
                    || process.pid.to_string().contains(needle.as_str())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pid: u32, name: &str, cpu: f64, memory_mb: f64) -> ProcessSnapshot {
        ProcessSnapshot {
            cpu_percent: cpu,
            memory_mb,
            ..ProcessSnapshot::new(Pid::from_u32(pid), name)
        }
    }

    fn pids(processes: &[ProcessSnapshot]) -> Vec<u32> {
        processes.iter().map(|p| p.pid.as_u32()).collect()
    }

    #[test]
    fn sorts_by_each_key() {
        let mut list = vec![
            snapshot(3, "bash", 1.0, 300.0),
            snapshot(1, "zsh", 50.0, 10.0),
            snapshot(2, "cargo", 20.0, 900.0),
        ];

        SortSpec::new(SortKey::Cpu, true).sort(&mut list);
        assert_eq!(pids(&list), [1, 2, 3]);

        SortSpec::new(SortKey::Memory, true).sort(&mut list);
        assert_eq!(pids(&list), [2, 3, 1]);

        SortSpec::new(SortKey::Name, false).sort(&mut list);
        assert_eq!(pids(&list), [3, 2, 1]);

        SortSpec::new(SortKey::Pid, false).sort(&mut list);
        assert_eq!(pids(&list), [1, 2, 3]);
    }

    #[test]
    fn equal_keys_fall_back_to_pid_ascending() {
        let mut list = vec![
            snapshot(9, "a", 5.0, 1.0),
            snapshot(4, "b", 5.0, 1.0),
            snapshot(6, "c", 5.0, 1.0),
        ];
        SortSpec::new(SortKey::Cpu, true).sort(&mut list);
        assert_eq!(pids(&list), [4, 6, 9]);
        SortSpec::new(SortKey::Memory, false).sort(&mut list);
        assert_eq!(pids(&list), [4, 6, 9]);
    }

    #[test]
    fn parses_sort_keys() {
        assert_eq!("CPU".parse::<SortKey>(), Ok(SortKey::Cpu));
        assert_eq!("mem".parse::<SortKey>(), Ok(SortKey::Memory));
        assert!("disk".parse::<SortKey>().is_err());
    }

    #[test]
    fn default_sort_is_cpu_descending() {
        assert_eq!(SortKey::default(), SortKey::Cpu);
        assert_eq!(SortSpec::default(), SortSpec::new(SortKey::Cpu, true));
    }

    #[test]
    fn query_matches_name_and_pid() {
        let firefox = snapshot(1234, "Firefox", 0.0, 0.0);
        assert!(ProcessQuery::from("fire").matches(&firefox));
        assert!(ProcessQuery::from("23").matches(&firefox));
        assert!(ProcessQuery::from("").matches(&firefox));
        assert!(ProcessQuery::from("pid:1234").matches(&firefox));
        assert!(!ProcessQuery::from("pid:123").matches(&firefox));
        assert!(!ProcessQuery::from("chrome").matches(&firefox));
    }
}
