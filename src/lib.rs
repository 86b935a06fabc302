#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod cancel;
pub mod config;
pub mod error;
pub mod metrics;

pub use app::MonitorApp;
pub use cancel::CancelToken;
pub use config::MonitorConfig;
pub use error::{ConfigError, MonitorError, Result, SourceError};
pub use metrics::process::{ProcessSnapshot, SortKey, SortSpec, SysinfoSource};
pub use metrics::source::MetricSource;
pub use metrics::{CycleOutcome, Monitor};
