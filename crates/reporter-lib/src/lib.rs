//! Reporter library for workload usage snapshots
//!
//! This crate provides the core functionality for:
//! - Read-only queries against the Kubernetes control plane
//! - Snapshot collection with per-query timeouts
//! - Fixed-section report rendering
//! - On-demand and periodic report scheduling
//! - Structured logging

pub mod control_plane;
pub mod error;
pub mod models;
pub mod observability;
pub mod report;
pub mod scheduler;
pub mod snapshot;


pub use control_plane::{ControlPlane, KubeConnectOptions, KubeControlPlane};
pub use error::{QueryError, RunError, ScalerError};
pub use models::*;
pub use observability::{init_tracing, RunLogger};
pub use report::{Report, ReportFormat, Section, SectionKind};
pub use scheduler::{Invoker, ReportSink, RunMode, RunSummary};
pub use snapshot::{SnapshotCollector, DEFAULT_QUERY_TIMEOUT};
