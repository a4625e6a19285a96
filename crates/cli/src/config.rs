//! Configuration management for the CLI
//!
//! Sources, lowest to highest precedence: built-in defaults, the optional
//! config file, `CHECK_USAGE_*` environment variables, command-line flags.

use anyhow::{ensure, Context, Result};
use reporter_lib::scheduler::DEFAULT_LOG_FILE;
use reporter_lib::{KubeConnectOptions, ReportTarget, RunMode, DEFAULT_QUERY_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SELECTOR: &str = "app=guestbook";
pub const DEFAULT_SCALER: &str = "guestbook";

/// Values given explicitly on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub selector: Option<String>,
    pub scaler: Option<String>,
    pub namespace: Option<String>,
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
    pub timeout: Option<u64>,
    pub interval: Option<u64>,
    pub count: Option<u64>,
    pub log_file: Option<PathBuf>,
}

/// Effective reporter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReporterConfig {
    /// Label selector for the workload's pods
    pub selector: String,
    /// Horizontal pod autoscaler name
    pub scaler: String,
    /// Namespace (kubeconfig default if unset)
    pub namespace: Option<String>,
    /// Kubeconfig file path
    pub kubeconfig: Option<PathBuf>,
    /// Kubeconfig context
    pub context: Option<String>,
    /// Per-query timeout in seconds
    pub timeout: u64,
    /// Seconds between reports; enables periodic mode
    pub interval: Option<u64>,
    /// Maximum number of periodic reports
    pub count: Option<u64>,
    /// Append-only report log
    pub log_file: Option<PathBuf>,
}

impl ReporterConfig {
    /// Load configuration from the default config file, environment and flags
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let file = Self::config_path().ok();
        Self::load_from(file.as_deref(), overrides)
    }

    /// Load configuration using `file` (without extension) as the config file
    pub fn load_from(file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("selector", DEFAULT_SELECTOR)?
            .set_default("scaler", DEFAULT_SCALER)?
            .set_default("timeout", DEFAULT_QUERY_TIMEOUT.as_secs())?;

        if let Some(path) = file {
            builder = builder.add_source(
                config::File::with_name(&path.to_string_lossy()).required(false),
            );
        }

        let config = builder
            .add_source(config::Environment::with_prefix("CHECK_USAGE"))
            .set_override_option("selector", overrides.selector.clone())?
            .set_override_option("scaler", overrides.scaler.clone())?
            .set_override_option("namespace", overrides.namespace.clone())?
            .set_override_option("kubeconfig", path_value(&overrides.kubeconfig))?
            .set_override_option("context", overrides.context.clone())?
            .set_override_option("timeout", overrides.timeout)?
            .set_override_option("interval", overrides.interval)?
            .set_override_option("count", overrides.count)?
            .set_override_option("log_file", path_value(&overrides.log_file))?
            .build()
            .context("Failed to read configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(!self.selector.trim().is_empty(), "selector must not be empty");
        ensure!(!self.scaler.trim().is_empty(), "scaler name must not be empty");
        ensure!(self.timeout > 0, "timeout must be at least 1 second");
        ensure!(
            self.interval.map_or(true, |i| i > 0),
            "interval must be at least 1 second"
        );
        ensure!(
            self.count.is_none() || self.interval.is_some(),
            "count requires an interval"
        );
        ensure!(self.count != Some(0), "count must be at least 1");
        Ok(())
    }

    pub fn target(&self) -> ReportTarget {
        ReportTarget::new(self.selector.clone(), self.scaler.clone())
    }

    pub fn connect_options(&self) -> KubeConnectOptions {
        KubeConnectOptions {
            kubeconfig: self.kubeconfig.clone(),
            context: self.context.clone(),
            namespace: self.namespace.clone(),
        }
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn run_mode(&self) -> RunMode {
        match self.interval {
            Some(secs) => RunMode::Periodic {
                interval: Duration::from_secs(secs),
                max_runs: self.count,
            },
            None => RunMode::Once,
        }
    }

    /// Log file for the given mode; periodic runs always log
    pub fn log_file_for(&self, mode: RunMode) -> Option<PathBuf> {
        match (mode, &self.log_file) {
            (_, Some(path)) => Some(path.clone()),
            (RunMode::Periodic { .. }, None) => Some(PathBuf::from(DEFAULT_LOG_FILE)),
            (RunMode::Once, None) => None,
        }
    }

    /// Get the configuration file path (extension resolved by the loader)
    fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("check-usage").join("config"))
    }
}

fn path_value(path: &Option<PathBuf>) -> Option<String> {
    path.as_ref().map(|p| p.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ReporterConfig::load_from(None, &Overrides::default()).unwrap();

        assert_eq!(config.selector, DEFAULT_SELECTOR);
        assert_eq!(config.scaler, DEFAULT_SCALER);
        assert_eq!(config.query_timeout(), Duration::from_secs(30));
        assert_eq!(config.run_mode(), RunMode::Once);
        assert_eq!(config.log_file_for(RunMode::Once), None);
    }

    #[test]
    fn test_file_then_flags() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("config.toml"),
            "selector = \"app=frontend\"\nscaler = \"frontend\"\ntimeout = 5\n",
        )
        .unwrap();

        let overrides = Overrides {
            scaler: Some("frontend-hpa".to_string()),
            interval: Some(60),
            ..Default::default()
        };
        let config =
            ReporterConfig::load_from(Some(&temp_dir.path().join("config")), &overrides).unwrap();

        assert_eq!(config.selector, "app=frontend");
        assert_eq!(config.scaler, "frontend-hpa");
        assert_eq!(config.timeout, 5);

        let mode = config.run_mode();
        assert_eq!(
            mode,
            RunMode::Periodic {
                interval: Duration::from_secs(60),
                max_runs: None
            }
        );
        assert_eq!(config.log_file_for(mode), Some(PathBuf::from(DEFAULT_LOG_FILE)));
    }

    #[test]
    fn test_explicit_log_file_in_once_mode() {
        let overrides = Overrides {
            log_file: Some(PathBuf::from("/var/log/usage.log")),
            ..Default::default()
        };
        let config = ReporterConfig::load_from(None, &overrides).unwrap();

        assert_eq!(
            config.log_file_for(RunMode::Once),
            Some(PathBuf::from("/var/log/usage.log"))
        );
    }

    #[test]
    fn test_rejects_empty_selector() {
        let overrides = Overrides {
            selector: Some("  ".to_string()),
            ..Default::default()
        };
        let err = ReporterConfig::load_from(None, &overrides).unwrap_err();
        assert!(err.to_string().contains("selector"));
    }

    #[test]
    fn test_rejects_count_without_interval() {
        let overrides = Overrides {
            count: Some(3),
            ..Default::default()
        };
        assert!(ReporterConfig::load_from(None, &overrides).is_err());
    }

    #[test]
    fn test_count_with_interval_from_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("config.toml"), "interval = 60\n").unwrap();

        let overrides = Overrides {
            count: Some(3),
            ..Default::default()
        };
        let config =
            ReporterConfig::load_from(Some(&temp_dir.path().join("config")), &overrides).unwrap();

        assert_eq!(
            config.run_mode(),
            RunMode::Periodic {
                interval: Duration::from_secs(60),
                max_runs: Some(3)
            }
        );
    }

    #[test]
    fn test_connect_options() {
        let overrides = Overrides {
            namespace: Some("web".to_string()),
            context: Some("staging".to_string()),
            ..Default::default()
        };
        let options = ReporterConfig::load_from(None, &overrides)
            .unwrap()
            .connect_options();

        assert_eq!(options.namespace.as_deref(), Some("web"));
        assert_eq!(options.context.as_deref(), Some("staging"));
        assert!(options.kubeconfig.is_none());
    }
}
