//! Snapshot assembly: one pass over every device and its processes.

use log::{debug, info, warn};

use crate::error::{DeviceError, EnrichError, TelemetryError};
use crate::metrics::gpu::{GpuDevice, GpuDriver};
use crate::metrics::process::ProcessInspector;
use crate::types::{DeviceSample, Metric, ProcessSample, Snapshot};

/// Builds [`Snapshot`]s from a GPU driver and a process inspector.
///
/// A device whose counters cannot be read is still reported, with those
/// counters marked [`Metric::Unavailable`], so the device count stays stable.
/// Processes that vanish or cannot be inspected are dropped. Nothing is
/// retried within a build.
pub struct SnapshotBuilder<D, P> {
    driver: D,
    inspector: P,
}

impl<D: GpuDriver, P: ProcessInspector> SnapshotBuilder<D, P> {
    pub fn new(driver: D, inspector: P) -> Self {
        Self { driver, inspector }
    }

    pub fn inspector(&self) -> &P {
        &self.inspector
    }

    /// Build one snapshot. Fails only if the devices cannot be enumerated.
    pub fn build(&mut self) -> Result<Snapshot, TelemetryError> {
        let driver_version = read_metric(None, "driver version", self.driver.driver_version());

        let handles = self.driver.list_devices()?;
        let devices = handles
            .iter()
            .map(|device| self.sample_device(device.as_ref()))
            .collect();

        Ok(Snapshot::new(driver_version, devices))
    }

    fn sample_device(&mut self, device: &dyn GpuDevice) -> DeviceSample {
        let id = device.index();
        let name = device.name().unwrap_or_else(|err| {
            warn!("GPU {}: failed to read name: {}", id, err);
            "Unknown GPU".into()
        });

        let memory = read_metric(Some(id), "memory info", device.memory_info());
        let temperature_celsius = read_metric(Some(id), "temperature", device.temperature());
        let fan_speed_percent = match device.fan_speed() {
            Ok(Some(speed)) => Metric::Available(speed),
            Ok(None) | Err(DeviceError::NotSupported) => Metric::Absent,
            Err(err) => {
                warn!("GPU {}: failed to read fan speed: {}", id, err);
                Metric::Unavailable
            }
        };
        let power_usage_milliwatts = read_metric(Some(id), "power usage", device.power_usage());
        let power_state = read_metric(Some(id), "power state", device.power_state());

        let processes = match device.running_processes() {
            Ok(procs) => procs
                .into_iter()
                .filter_map(|p| self.enrich(id, p.pid, p.used_gpu_memory_bytes))
                .collect(),
            Err(err) => {
                warn!("GPU {}: failed to list running processes: {}", id, err);
                Vec::new()
            }
        };

        DeviceSample {
            id,
            name,
            memory,
            temperature_celsius,
            fan_speed_percent,
            power_usage_milliwatts,
            power_state,
            processes,
        }
    }

    fn enrich(&mut self, device: u32, pid: u32, used: Option<u64>) -> Option<ProcessSample> {
        match self.inspector.enrich(pid, used) {
            Ok(sample) => Some(sample),
            Err(EnrichError::NotFound(_)) => {
                debug!("GPU {}: pid {} exited before it could be inspected", device, pid);
                None
            }
            Err(EnrichError::PermissionDenied(_)) => {
                info!("GPU {}: no permission to inspect pid {}, skipping", device, pid);
                None
            }
        }
    }
}

/// Turn a counter read into a metric. Unsupported sensors are absent; other
/// failures are logged and marked unavailable.
fn read_metric<T>(device: Option<u32>, what: &str, result: Result<T, DeviceError>) -> Metric<T> {
    match result {
        Ok(value) => Metric::Available(value),
        Err(DeviceError::NotSupported) => Metric::Absent,
        Err(err) => {
            match device {
                Some(id) => warn!("GPU {}: failed to read {}: {}", id, what, err),
                None => warn!("failed to read {}: {}", what, err),
            }
            Metric::Unavailable
        }
    }
}

/// Anything that can produce snapshots on demand.
pub trait SnapshotSource {
    fn build(&mut self) -> Result<Snapshot, TelemetryError>;
}

impl<D: GpuDriver, P: ProcessInspector> SnapshotSource for SnapshotBuilder<D, P> {
    fn build(&mut self) -> Result<Snapshot, TelemetryError> {
        SnapshotBuilder::build(self)
    }
}
