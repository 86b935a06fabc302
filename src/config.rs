use crate::error::ConfigError;
use crate::metrics::process::SortSpec;
use std::path::Path;
use std::time::Duration;

/// 100 MB/s expressed in KB/s.
pub const DEFAULT_IO_BUDGET_KBS: f64 = 100.0 * 1024.0;

/// Every recognized option of the pipeline and its schedulers.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)] // missing keys in a config file fall back to defaults
pub struct MonitorConfig {
    /// Points retained per process series
    pub history_capacity: usize,
    /// Processes that get the detailed read each cycle
    pub max_detailed_processes: usize,
    /// Throughput treated as "100%" of system I/O. This is an estimate,
    /// not a measured device ceiling. Zero selects the MB/s fallback.
    pub io_budget_kbs: f64,
    pub cleanup_interval_ms: u64,
    pub process_interval_ms: u64,
    pub system_interval_ms: u64,
    pub render_interval_ms: u64,
    /// Cheap-pass batch size between cancellation checks
    pub yield_every: usize,
    pub sort: SortSpec,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            history_capacity: 60,
            max_detailed_processes: 150,
            io_budget_kbs: DEFAULT_IO_BUDGET_KBS,
            cleanup_interval_ms: 30_000,
            process_interval_ms: 2_000,
            system_interval_ms: 1_000,
            render_interval_ms: 1_500,
            yield_every: 50,
            sort: SortSpec::default(),
        }
    }
}

impl MonitorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn non_zero(field: &'static str, value: u64) -> Result<(), ConfigError> {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".into(),
                });
            }
            Ok(())
        }

        non_zero("history_capacity", self.history_capacity as u64)?;
        non_zero("max_detailed_processes", self.max_detailed_processes as u64)?;
        non_zero("yield_every", self.yield_every as u64)?;
        non_zero("cleanup_interval_ms", self.cleanup_interval_ms)?;
        non_zero("process_interval_ms", self.process_interval_ms)?;
        non_zero("system_interval_ms", self.system_interval_ms)?;
        non_zero("render_interval_ms", self.render_interval_ms)?;

        if !self.io_budget_kbs.is_finite() || self.io_budget_kbs < 0.0 {
            return Err(ConfigError::Invalid {
                field: "io_budget_kbs",
                reason: format!("{} is not a finite non-negative rate", self.io_budget_kbs),
            });
        }
        Ok(())
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    pub fn process_interval(&self) -> Duration {
        Duration::from_millis(self.process_interval_ms)
    }

    pub fn system_interval(&self) -> Duration {
        Duration::from_millis(self.system_interval_ms)
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::process::SortKey;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let config = MonitorConfig::default();
        assert_eq!(config.history_capacity, 60);
        assert_eq!(config.max_detailed_processes, 150);
        assert_eq!(config.io_budget_kbs, 102_400.0);
        assert_eq!(config.cleanup_interval(), Duration::from_secs(30));
        assert_eq!(config.process_interval(), Duration::from_secs(2));
        assert_eq!(config.system_interval(), Duration::from_secs(1));
        assert_eq!(config.render_interval(), Duration::from_millis(1500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = MonitorConfig::from_toml(
            r#"
            history_capacity = 10
            io_budget_kbs = 0.0

            [sort]
            key = "memory"
            descending = false
            "#,
        )
        .unwrap();
        assert_eq!(config.history_capacity, 10);
        assert_eq!(config.io_budget_kbs, 0.0);
        assert_eq!(config.max_detailed_processes, 150);
        assert_eq!(config.sort.key, SortKey::Memory);
        assert!(!config.sort.descending);
    }

    #[test]
    fn rejects_zero_capacity_and_negative_budget() {
        let err = MonitorConfig::from_toml("history_capacity = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "history_capacity",
                ..
            }
        ));

        let err = MonitorConfig::from_toml("io_budget_kbs = -1.0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "io_budget_kbs",
                ..
            }
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_detailed_processes = 25").unwrap();
        let config = MonitorConfig::load(file.path()).unwrap();
        assert_eq!(config.max_detailed_processes, 25);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        match MonitorConfig::load(&path) {
            Err(ConfigError::Io { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
