use crate::cancel::CancelToken;
use crate::config::MonitorConfig;
use crate::metrics::source::MetricSource;
use crate::metrics::{CycleOutcome, Monitor};
use log::{debug, info, warn};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Background sampling for a [`Monitor`].
///
/// Three threads run on independent periods: full process cycles, system
/// totals, and cleanup of dead series. Dropping the app (or calling
/// [`MonitorApp::shutdown`]) cancels them and waits for them to exit.
pub struct MonitorApp<S: MetricSource + 'static> {
    monitor: Arc<Monitor>,
    source: Arc<S>,
    cancel: CancelToken,
    workers: Vec<JoinHandle<()>>,
}

impl<S: MetricSource + 'static> MonitorApp<S> {
    pub fn start(config: MonitorConfig, source: S) -> io::Result<Self> {
        let monitor = Arc::new(Monitor::new(config));
        let source = Arc::new(source);
        let cancel = CancelToken::new();
        let config = monitor.config().clone();

        let mut app = Self {
            monitor,
            source,
            cancel,
            workers: Vec::with_capacity(3),
        };

        app.spawn(
            "procwatch-process",
            config.process_interval(),
            true,
            |monitor, source, cancel| match monitor.run_cycle(source, cancel) {
                Ok(CycleOutcome::Published { processes }) => {
                    debug!("process cycle published {processes} rows")
                }
                Ok(CycleOutcome::Skipped) => debug!("process cycle skipped"),
                Ok(CycleOutcome::Cancelled) => {}
                Err(err) => warn!("process cycle failed: {err}"),
            },
        )?;

        app.spawn(
            "procwatch-system",
            config.system_interval(),
            false,
            |monitor, source, _| {
                if let Err(err) = monitor.refresh_system(source) {
                    warn!("{err}");
                }
            },
        )?;

        app.spawn(
            "procwatch-cleanup",
            config.cleanup_interval(),
            false,
            |monitor, source, _| match monitor.cleanup_with(source) {
                Ok(removed) => debug!("cleanup removed {removed} series"),
                Err(err) => warn!("cleanup skipped: {err}"),
            },
        )?;

        info!(
            "sampling every {:?}, system every {:?}, cleanup every {:?}",
            config.process_interval(),
            config.system_interval(),
            config.cleanup_interval()
        );
        Ok(app)
    }

    fn spawn<F>(
        &mut self,
        name: &str,
        period: Duration,
        run_first: bool,
        tick: F,
    ) -> io::Result<()>
    where
        F: Fn(&Monitor, &S, &CancelToken) + Send + 'static,
    {
        let monitor = Arc::clone(&self.monitor);
        let source = Arc::clone(&self.source);
        let cancel = self.cancel.clone();

        let handle = thread::Builder::new().name(name.to_owned()).spawn(move || {
            if run_first {
                tick(&*monitor, &*source, &cancel);
            }
            while !cancel.sleep(period) {
                tick(&*monitor, &*source, &cancel);
            }
        })?;
        self.workers.push(handle);
        Ok(())
    }

    pub fn monitor(&self) -> Arc<Monitor> {
        Arc::clone(&self.monitor)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.cancel.cancel();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("sampling thread panicked");
            }
        }
    }
}

impl<S: MetricSource + 'static> Drop for MonitorApp<S> {
    fn drop(&mut self) {
        self.stop();
    }
}
