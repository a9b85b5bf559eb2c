//! GPU and process telemetry snapshots.
//!
//! [`SnapshotBuilder::build`] queries the GPU driver for every device and the
//! compute processes on it, enriches each process from the OS process table,
//! and returns one [`Snapshot`]. [`units`] converts snapshot values for
//! display.

pub mod error;
pub mod metrics;
pub mod types;
pub mod units;

pub use error::{DeviceError, EnrichError, TelemetryError};
pub use metrics::{
    host_builder, shutdown_driver, HostSnapshotBuilder, SnapshotBuilder, SnapshotSource,
};
pub use types::{DeviceMemory, DeviceSample, Metric, ProcessSample, ProcessStatus, Snapshot};
