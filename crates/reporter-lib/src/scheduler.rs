//! Report scheduling
//!
//! Decides when reports are produced: once on demand, or periodically on a
//! fixed interval. Periodic runs are strictly serialized; a report is fully
//! written before the next tick is awaited.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::debug;

use crate::error::RunError;
use crate::observability::RunLogger;
use crate::report::{self, ReportFormat};
use crate::snapshot::SnapshotCollector;

/// Log file used by periodic mode when none is configured
pub const DEFAULT_LOG_FILE: &str = "check-usage.log";

/// When reports are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Run once, write the report, return
    Once,
    /// Re-run every `interval` until shutdown or `max_runs` is reached
    Periodic {
        interval: Duration,
        max_runs: Option<u64>,
    },
}

/// Outcome of an invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub runs: u64,
    pub failures: u64,
    pub last_error: Option<String>,
}

impl RunSummary {
    /// True when at least one run happened and none succeeded
    pub fn all_failed(&self) -> bool {
        self.runs > 0 && self.failures == self.runs
    }
}

/// Destination for rendered reports
///
/// Reports always go to `out`. If a log file is set, each report is also
/// appended to it; the file is never truncated.
pub struct ReportSink<W> {
    out: W,
    log: Option<ReportLog>,
}

/// Report log held open in append mode
struct ReportLog {
    path: PathBuf,
    file: File,
}

impl<W: AsyncWrite + Unpin> ReportSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, log: None }
    }

    /// Open `path` for appending before any report is written.
    ///
    /// Fails if the file can't be created or opened, so an unusable log
    /// path is reported before anything reaches `out`.
    pub async fn with_log_file(mut self, path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        debug!(path = %path.display(), "Opened report log");

        self.log = Some(ReportLog { path, file });
        Ok(self)
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log.as_ref().map(|log| log.path.as_path())
    }

    /// Write one rendered report
    pub async fn write_report(&mut self, rendered: &str) -> std::io::Result<()> {
        self.out.write_all(rendered.as_bytes()).await?;
        self.out.flush().await?;

        if let Some(log) = &mut self.log {
            // One write per report
            let entry = format!("{}\n", rendered);
            log.file.write_all(entry.as_bytes()).await?;
            log.file.flush().await?;
            debug!(path = %log.path.display(), bytes = entry.len(), "Appended report to log");
        }

        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Runs snapshot collection, rendering and output
pub struct Invoker<W> {
    collector: SnapshotCollector,
    format: ReportFormat,
    sink: ReportSink<W>,
    logger: RunLogger,
    runs: u64,
}

impl<W: AsyncWrite + Unpin> Invoker<W> {
    pub fn new(collector: SnapshotCollector, format: ReportFormat, sink: ReportSink<W>) -> Self {
        let logger = RunLogger::new(collector.namespace(), collector.target().selector.clone());
        Self {
            collector,
            format,
            sink,
            logger,
            runs: 0,
        }
    }

    /// Produce a single report
    ///
    /// On failure nothing is written to the sink.
    pub async fn run_once(&mut self) -> Result<(), RunError> {
        self.runs += 1;
        let run = self.runs;
        let start = Instant::now();
        self.logger.log_started(run);

        let snapshot = self.collector.collect().await?;
        let rendered = report::render(&snapshot, self.format)?;
        self.sink.write_report(&rendered).await?;

        self.logger.log_completed(run, &snapshot, start.elapsed());
        Ok(())
    }

    /// Run in the given mode until done or `shutdown` resolves.
    ///
    /// In once mode any failure is returned. In periodic mode failed query
    /// runs are logged and counted, and only output failures stop the loop.
    pub async fn run(
        &mut self,
        mode: RunMode,
        shutdown: impl Future<Output = ()>,
    ) -> Result<RunSummary, RunError> {
        match mode {
            RunMode::Once => {
                self.run_once().await.inspect_err(|e| self.logger.log_failed(self.runs, e))?;
                Ok(RunSummary {
                    runs: 1,
                    failures: 0,
                    last_error: None,
                })
            }
            RunMode::Periodic {
                interval: period,
                max_runs,
            } => self.run_periodic(period, max_runs, shutdown).await,
        }
    }

    async fn run_periodic(
        &mut self,
        period: Duration,
        max_runs: Option<u64>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<RunSummary, RunError> {
        let mut summary = RunSummary::default();
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let reason = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    summary.runs += 1;
                    match self.run_once().await {
                        Ok(()) => {}
                        Err(err @ RunError::Query(_)) => {
                            self.logger.log_failed(self.runs, &err);
                            summary.failures += 1;
                            summary.last_error = Some(err.to_string());
                        }
                        Err(e) => {
                            self.logger.log_failed(self.runs, &e);
                            return Err(e);
                        }
                    }

                    if max_runs.is_some_and(|max| summary.runs >= max) {
                        break "run limit reached";
                    }
                }
                _ = &mut shutdown => {
                    break "shutdown requested";
                }
            }
        };

        self.logger.log_shutdown(summary.runs, summary.failures, reason);
        Ok(summary)
    }

    pub fn sink(&self) -> &ReportSink<W> {
        &self.sink
    }

    pub fn into_sink(self) -> ReportSink<W> {
        self.sink
    }
}
