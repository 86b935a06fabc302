pub mod aggregator;
pub mod prioritizer;
pub mod process;
pub mod source;
pub mod system;

use crate::cancel::CancelToken;
use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result, SourceError};
use aggregator::{build_snapshot, compute_rates, DiskRates, IoCounters};
use log::{debug, trace, warn};
use process::{ProcessHistory, ProcessQuery, ProcessSnapshot, SeriesPoint, SortSpec, TimeSeries};
use source::MetricSource;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;
use sysinfo::Pid;
use system::SystemSnapshot;

/// Result of a [`Monitor::run_cycle`] call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A new process list was published
    Published { processes: usize },
    /// Cancellation was observed; nothing was published
    Cancelled,
    /// Another cycle was already running; this trigger was dropped
    Skipped,
}

#[derive(Debug, Default)]
struct MonitorState {
    processes: Vec<ProcessSnapshot>,
    system: Option<SystemSnapshot>,
    history: ProcessHistory,
    io_counters: HashMap<Pid, IoCounters>,
    sort: SortSpec,
}

/// Single source of truth for the current metrics.
///
/// Every read hands back an owned copy, so a slow renderer never holds the
/// lock and never sees a list or series from a half-finished cycle.
#[derive(Debug)]
pub struct Monitor {
    state: RwLock<MonitorState>,
    config: MonitorConfig,
    cycle_in_flight: AtomicBool,
}

struct CycleGuard<'a>(&'a AtomicBool);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            state: RwLock::new(MonitorState {
                history: ProcessHistory::new(config.history_capacity),
                sort: config.sort,
                ..Default::default()
            }),
            config,
            cycle_in_flight: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    fn read(&self) -> RwLockReadGuard<'_, MonitorState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MonitorState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current process list, ordered by the active sort.
    pub fn processes(&self) -> Vec<ProcessSnapshot> {
        self.read().processes.clone()
    }

    pub fn search_processes(&self, query: &str) -> Vec<ProcessSnapshot> {
        let query = ProcessQuery::from(query);
        self.read()
            .processes
            .iter()
            .filter(|p| query.matches(p))
            .cloned()
            .collect()
    }

    /// Last captured system totals; `None` until the first successful read.
    pub fn system_snapshot(&self) -> Option<SystemSnapshot> {
        self.read().system
    }

    pub fn time_series(&self, pid: Pid) -> Option<TimeSeries> {
        self.read().history.get(pid)
    }

    pub fn sort_spec(&self) -> SortSpec {
        self.read().sort
    }

    pub fn tracked_count(&self) -> usize {
        self.read().history.tracked_count()
    }

    /// Changes the ordering and re-sorts the published list right away.
    pub fn set_sort_spec(&self, sort: SortSpec) {
        let mut state = self.write();
        state.sort = sort;
        let mut processes = std::mem::take(&mut state.processes);
        sort.sort(&mut processes);
        state.processes = processes;
    }

    /// Starts an empty series for `pid` if it has none.
    pub fn ensure_tracked(&self, pid: Pid) {
        self.write().history.ensure_tracked(pid);
    }

    /// Drops series and cached counters of every pid not in `live`.
    pub fn cleanup(&self, live: &HashSet<Pid>) -> usize {
        let mut state = self.write();
        state.io_counters.retain(|pid, _| live.contains(pid));
        let removed = state.history.cleanup_histories(live);
        debug!(
            "cleanup removed {removed} series, {} still tracked",
            state.history.tracked_count()
        );
        removed
    }

    /// Enumerates live pids from `source` and runs [`Monitor::cleanup`].
    pub fn cleanup_with<S: MetricSource + ?Sized>(&self, source: &S) -> Result<usize> {
        let live: HashSet<Pid> = source
            .live_pids()
            .map_err(MonitorError::Enumeration)?
            .into_iter()
            .collect();
        Ok(self.cleanup(&live))
    }

    /// Replaces the system snapshot. On failure the previous one stays.
    pub fn refresh_system<S: MetricSource + ?Sized>(&self, source: &S) -> Result<SystemSnapshot> {
        let totals = source
            .read_system_totals()
            .map_err(MonitorError::SystemTotals)?;
        let snapshot = SystemSnapshot::from_totals(totals, SystemTime::now());
        self.write().system = Some(snapshot);
        Ok(snapshot)
    }

    /// Swaps in the new counters for `pid` and derives rates from the old ones
    /// under one write lock.
    fn record_counters(&self, pid: Pid, current: IoCounters) -> DiskRates {
        let previous = self.write().io_counters.insert(pid, current);
        compute_rates(previous.as_ref(), &current, self.config.io_budget_kbs)
    }

    /// Detailed read of one process outside the regular cycle.
    ///
    /// Used when a process below the top-K cut is being inspected: it gets
    /// tracked, one point is appended to its series and the row is returned.
    /// The published list is left alone.
    pub fn sample_process<S: MetricSource + ?Sized>(
        &self,
        source: &S,
        pid: Pid,
    ) -> std::result::Result<ProcessSnapshot, SourceError> {
        self.ensure_tracked(pid);
        let reading = source.read_detailed(pid)?;
        let rates = self.record_counters(pid, IoCounters::from(&reading));
        let snapshot = build_snapshot(pid, &reading, rates);
        self.write()
            .history
            .append(pid, SeriesPoint::from_snapshot(&snapshot, SystemTime::now()));
        Ok(snapshot)
    }

    /// One acquisition cycle: system totals, cheap pass, detailed pass, publish.
    ///
    /// Only one cycle runs at a time; a concurrent call returns
    /// [`CycleOutcome::Skipped`]. Nothing is published until the detailed
    /// pass completes, so a cancelled cycle leaves every read unchanged. A
    /// failed system read does not stop the process update but is still
    /// reported once the list is published.
    pub fn run_cycle<S: MetricSource + ?Sized>(
        &self,
        source: &S,
        cancel: &CancelToken,
    ) -> Result<CycleOutcome> {
        if self
            .cycle_in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            debug!("cycle already in flight, dropping trigger");
            return Ok(CycleOutcome::Skipped);
        }
        let _guard = CycleGuard(&self.cycle_in_flight);

        if cancel.is_cancelled() {
            return Ok(CycleOutcome::Cancelled);
        }

        let (system, system_error) = match source.read_system_totals() {
            Ok(totals) => (
                Some(SystemSnapshot::from_totals(totals, SystemTime::now())),
                None,
            ),
            Err(err) => (None, Some(MonitorError::SystemTotals(err))),
        };

        if cancel.is_cancelled() {
            return Ok(CycleOutcome::Cancelled);
        }

        let pids = match source.live_pids() {
            Ok(pids) => pids,
            Err(err) => {
                if let Some(system_error) = system_error {
                    warn!("{system_error}");
                }
                return Err(MonitorError::Enumeration(err));
            }
        };

        let Some(candidates) = prioritizer::prioritize(
            source,
            &pids,
            self.config.max_detailed_processes,
            self.config.yield_every,
            cancel,
        ) else {
            return Ok(CycleOutcome::Cancelled);
        };

        if cancel.is_cancelled() {
            return Ok(CycleOutcome::Cancelled);
        }

        let mut processes = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            if cancel.is_cancelled() {
                return Ok(CycleOutcome::Cancelled);
            }
            let reading = match source.read_detailed(candidate.pid) {
                Ok(reading) => reading,
                Err(err) if err.is_per_process() => {
                    trace!("dropping {} from this cycle: {err}", candidate.pid);
                    continue;
                }
                Err(err) => {
                    warn!("detailed read of {} failed: {err}", candidate.pid);
                    continue;
                }
            };
            let rates = self.record_counters(candidate.pid, IoCounters::from(&reading));
            processes.push(build_snapshot(candidate.pid, &reading, rates));
        }

        let published = self.publish(processes, system, &pids);
        debug!(
            "cycle published {published} of {} live processes",
            pids.len()
        );

        match system_error {
            Some(err) => Err(err),
            None => Ok(CycleOutcome::Published {
                processes: published,
            }),
        }
    }

    /// Swaps in the cycle's results under one write lock. A missing system
    /// snapshot leaves the previous one in place.
    fn publish(
        &self,
        mut processes: Vec<ProcessSnapshot>,
        system: Option<SystemSnapshot>,
        live: &[Pid],
    ) -> usize {
        let now = SystemTime::now();
        let live: HashSet<Pid> = live.iter().copied().collect();

        let mut state = self.write();
        if system.is_some() {
            state.system = system;
        }
        state.sort.sort(&mut processes);
        for process in &processes {
            state
                .history
                .append(process.pid, SeriesPoint::from_snapshot(process, now));
        }
        state.io_counters.retain(|pid, _| live.contains(pid));
        state.processes = processes;
        state.processes.len()
    }
}
