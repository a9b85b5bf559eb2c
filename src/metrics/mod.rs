//! Telemetry collection: GPU driver queries, process enrichment, snapshots.

pub mod gpu;
pub mod process;
pub mod snapshot;

pub use gpu::{shutdown_driver, GpuDevice, GpuDriver, GpuProcess, NvmlDriver};
pub use process::{
    ProcessEnricher, ProcessInspector, ProcessStats, ProcessTable, SysinfoTable,
    DEFAULT_CPU_SAMPLE_INTERVAL,
};
pub use snapshot::{SnapshotBuilder, SnapshotSource};

use std::time::Duration;

use crate::error::TelemetryError;

/// Snapshot builder wired to NVML and `sysinfo`.
pub type HostSnapshotBuilder = SnapshotBuilder<NvmlDriver, ProcessEnricher<SysinfoTable>>;

/// Initialize the driver and build a [`HostSnapshotBuilder`].
pub fn host_builder(cpu_sample_interval: Duration) -> Result<HostSnapshotBuilder, TelemetryError> {
    let driver = NvmlDriver::init()?;
    let inspector = ProcessEnricher::new(SysinfoTable::new(), cpu_sample_interval);
    Ok(SnapshotBuilder::new(driver, inspector))
}
