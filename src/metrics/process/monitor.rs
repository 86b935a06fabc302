use crate::error::SourceError;
use crate::metrics::source::{BasicReading, DetailedReading, MetricSource, SystemTotals};
use log::debug;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant, SystemTime};
use sysinfo::{Pid, Process, ProcessRefreshKind, ProcessesToUpdate, System};

/// [`MetricSource`] backed by `sysinfo`.
///
/// Process and system totals use separate `System` handles so the system
/// loop never waits behind a full process refresh.
#[derive(Debug)]
pub struct SysinfoSource {
    processes: Mutex<System>,
    totals: Mutex<System>,
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

fn percent_of(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

impl SysinfoSource {
    pub fn new() -> Self {
        let mut totals = System::new();
        // CPU usage is a delta between refreshes; take the first one now.
        totals.refresh_cpu_usage();
        Self {
            processes: Mutex::new(System::new()),
            totals: Mutex::new(totals),
        }
    }

    fn processes(&self) -> MutexGuard<'_, System> {
        self.processes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn basic_reading(process: &Process, total_memory: u64) -> BasicReading {
        BasicReading {
            name: process.name().to_string_lossy().into_owned(),
            cpu_percent: f64::from(process.cpu_usage()),
            memory_mb: bytes_to_mb(process.memory()),
            memory_percent: percent_of(process.memory(), total_memory),
        }
    }
}

impl MetricSource for SysinfoSource {
    fn live_pids(&self) -> Result<Vec<Pid>, SourceError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(SourceError::Unsupported);
        }
        let mut system = self.processes();
        system.refresh_memory();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );

        // Linux exposes threads as tasks; only real processes are ranked.
        let pids: Vec<Pid> = system
            .processes()
            .iter()
            .filter(|(_, p)| p.thread_kind().is_none())
            .map(|(pid, _)| *pid)
            .collect();
        if pids.is_empty() {
            return Err(SourceError::Enumeration {
                reason: "process table is empty".into(),
            });
        }
        debug!("enumerated {} processes", pids.len());
        Ok(pids)
    }

    fn read_basic(&self, pid: Pid) -> Result<BasicReading, SourceError> {
        let system = self.processes();
        system
            .process(pid)
            .map(|p| Self::basic_reading(p, system.total_memory()))
            .ok_or(SourceError::ProcessGone { pid })
    }

    fn read_detailed(&self, pid: Pid) -> Result<DetailedReading, SourceError> {
        let mut system = self.processes();
        // The entry from the last enumeration outlives the process; only a
        // successful refresh proves it is still running.
        let refreshed = system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            false,
            ProcessRefreshKind::nothing().with_disk_usage(),
        );
        if refreshed == 0 {
            return Err(SourceError::ProcessGone { pid });
        }
        let sampled_at = Instant::now();
        let process = system
            .process(pid)
            .ok_or(SourceError::ProcessGone { pid })?;

        let disk = process.disk_usage();
        let created_at = match process.start_time() {
            0 => None,
            secs => Some(SystemTime::UNIX_EPOCH + Duration::from_secs(secs)),
        };

        Ok(DetailedReading {
            basic: Self::basic_reading(process, system.total_memory()),
            created_at,
            read_bytes: disk.total_read_bytes,
            written_bytes: disk.total_written_bytes,
            sampled_at,
        })
    }

    fn read_system_totals(&self) -> Result<SystemTotals, SourceError> {
        let mut system = self.totals.lock().unwrap_or_else(PoisonError::into_inner);
        system.refresh_cpu_usage();
        system.refresh_memory();

        let total = system.total_memory();
        if total == 0 {
            return Err(SourceError::Platform {
                reason: "total memory reported as zero".into(),
            });
        }
        let used = system.used_memory();
        Ok(SystemTotals {
            cpu_percent: f64::from(system.global_cpu_usage()),
            memory_percent: percent_of(used, total),
            total_mb: bytes_to_mb(total),
            used_mb: bytes_to_mb(used),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_conversions() {
        assert_eq!(bytes_to_mb(3 * 1024 * 1024), 3.0);
        assert_eq!(percent_of(1, 4), 25.0);
        assert_eq!(percent_of(1, 0), 0.0);
    }

    #[test]
    fn reads_own_process() {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return;
        }
        let source = SysinfoSource::new();
        let own = Pid::from_u32(std::process::id());
        let pids = source.live_pids().unwrap();
        assert!(pids.contains(&own));

        let basic = source.read_basic(own).unwrap();
        assert!(!basic.name.is_empty());
        assert!(basic.memory_mb > 0.0);

        let detailed = source.read_detailed(own).unwrap();
        assert_eq!(detailed.basic.name, basic.name);
    }

    #[test]
    fn system_totals_are_consistent() {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return;
        }
        let totals = SysinfoSource::new().read_system_totals().unwrap();
        assert!(totals.total_mb > 0.0);
        assert!(totals.used_mb <= totals.total_mb);
        assert!((0.0..=100.0).contains(&totals.memory_percent));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn exited_process_fails_detailed_read() {
        let mut child = std::process::Command::new("sleep")
            .arg("30")
            .spawn()
            .unwrap();
        let pid = Pid::from_u32(child.id());
        let source = SysinfoSource::new();
        assert!(source.live_pids().unwrap().contains(&pid));

        child.kill().unwrap();
        child.wait().unwrap();
        assert_eq!(
            source.read_detailed(pid),
            Err(SourceError::ProcessGone { pid })
        );
    }

    #[test]
    fn unknown_pid_is_gone() {
        let source = SysinfoSource::new();
        let pid = Pid::from_u32(u32::MAX - 1);
        assert_eq!(
            source.read_basic(pid),
            Err(SourceError::ProcessGone { pid })
        );
    }
}
