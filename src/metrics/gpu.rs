//! GPU device queries over NVML.

use log::{debug, info};
use nvml_wrapper::enum_wrappers::device::{PerformanceState, TemperatureSensor};
use nvml_wrapper::enums::device::UsedGpuMemory;
use nvml_wrapper::error::NvmlError;
use nvml_wrapper::{Device, Nvml};
use parking_lot::{const_mutex, Mutex};

use crate::error::{DeviceError, TelemetryError};
use crate::types::DeviceMemory;

/// A process holding a compute context, as the driver reports it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GpuProcess {
    pub pid: u32,
    pub used_gpu_memory_bytes: Option<u64>,
}

/// Per-device counter accessors.
pub trait GpuDevice {
    /// Enumeration index of the device.
    fn index(&self) -> u32;
    fn name(&self) -> Result<String, DeviceError>;
    fn memory_info(&self) -> Result<DeviceMemory, DeviceError>;
    fn temperature(&self) -> Result<u32, DeviceError>;
    /// `Ok(None)` when the device has no fan sensor.
    fn fan_speed(&self) -> Result<Option<u32>, DeviceError>;
    /// Milliwatts.
    fn power_usage(&self) -> Result<u32, DeviceError>;
    fn power_state(&self) -> Result<u32, DeviceError>;
    fn running_processes(&self) -> Result<Vec<GpuProcess>, DeviceError>;
}

/// Driver-level queries.
pub trait GpuDriver {
    fn driver_version(&self) -> Result<String, DeviceError>;
    /// Devices in the driver's own index order.
    fn list_devices(&self) -> Result<Vec<Box<dyn GpuDevice>>, TelemetryError>;
}

// ============================================================================
// Process-wide driver state
// ============================================================================

enum DriverState {
    Uninitialized,
    Ready(Nvml),
    ShutDown,
}

static DRIVER: Mutex<DriverState> = const_mutex(DriverState::Uninitialized);

/// Run `f` against the initialized driver handle.
fn with_nvml<T>(f: impl FnOnce(&Nvml) -> Result<T, NvmlError>) -> Result<T, DeviceError> {
    let state = DRIVER.lock();
    match &*state {
        DriverState::Ready(nvml) => f(nvml).map_err(DeviceError::from),
        DriverState::Uninitialized => Err(DeviceError::Driver("driver not initialized".into())),
        DriverState::ShutDown => Err(DeviceError::Driver("driver shut down".into())),
    }
}

/// Resolve the device at `index` and run `f` on it.
fn with_device<T>(
    index: u32,
    f: impl FnOnce(&Device<'_>) -> Result<T, NvmlError>,
) -> Result<T, DeviceError> {
    with_nvml(|nvml| {
        let device = nvml.device_by_index(index)?;
        f(&device)
    })
}

/// Shut the driver library down.
///
/// Call once before process exit. The driver is never initialized again
/// afterwards; later snapshot builds fail with [`TelemetryError::DriverShutDown`].
pub fn shutdown_driver() -> Result<(), TelemetryError> {
    let mut state = DRIVER.lock();
    match std::mem::replace(&mut *state, DriverState::ShutDown) {
        DriverState::Ready(nvml) => {
            info!("shutting down NVML");
            nvml.shutdown().map_err(TelemetryError::Shutdown)
        }
        DriverState::Uninitialized | DriverState::ShutDown => Ok(()),
    }
}

/// NVML-backed [`GpuDriver`].
///
/// Holds no handle itself: the library handle lives in process-wide state
/// that is initialized on first use.
#[derive(Debug)]
pub struct NvmlDriver {
    _private: (),
}

impl NvmlDriver {
    /// Initialize the driver library if it has not been already.
    pub fn init() -> Result<Self, TelemetryError> {
        let mut state = DRIVER.lock();
        match &*state {
            DriverState::Ready(_) => {}
            DriverState::ShutDown => return Err(TelemetryError::DriverShutDown),
            DriverState::Uninitialized => {
                let nvml = Nvml::init()?;
                info!("NVML initialized");
                *state = DriverState::Ready(nvml);
            }
        }
        Ok(Self { _private: () })
    }
}

impl GpuDriver for NvmlDriver {
    fn driver_version(&self) -> Result<String, DeviceError> {
        with_nvml(|nvml| nvml.sys_driver_version())
    }

    fn list_devices(&self) -> Result<Vec<Box<dyn GpuDevice>>, TelemetryError> {
        let count = {
            let state = DRIVER.lock();
            match &*state {
                DriverState::Ready(nvml) => nvml
                    .device_count()
                    .map_err(|e| TelemetryError::Enumeration(e.into()))?,
                DriverState::ShutDown => return Err(TelemetryError::DriverShutDown),
                DriverState::Uninitialized => {
                    return Err(TelemetryError::Enumeration(DeviceError::Driver(
                        "driver not initialized".into(),
                    )))
                }
            }
        };

        Ok((0..count)
            .map(|index| Box::new(NvmlDevice { index }) as Box<dyn GpuDevice>)
            .collect())
    }
}

/// One NVML device, addressed by index.
///
/// The handle is re-resolved on every read so nothing borrows the driver
/// between calls.
#[derive(Debug, Clone, Copy)]
pub struct NvmlDevice {
    index: u32,
}

impl GpuDevice for NvmlDevice {
    fn index(&self) -> u32 {
        self.index
    }

    fn name(&self) -> Result<String, DeviceError> {
        with_device(self.index, |d| d.name())
    }

    fn memory_info(&self) -> Result<DeviceMemory, DeviceError> {
        with_device(self.index, |d| d.memory_info()).map(|m| DeviceMemory {
            free_bytes: m.free,
            used_bytes: m.used,
            total_bytes: m.total,
        })
    }

    fn temperature(&self) -> Result<u32, DeviceError> {
        with_device(self.index, |d| d.temperature(TemperatureSensor::Gpu))
    }

    fn fan_speed(&self) -> Result<Option<u32>, DeviceError> {
        match with_device(self.index, |d| d.fan_speed(0)) {
            Ok(speed) => Ok(Some(speed)),
            Err(DeviceError::NotSupported) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn power_usage(&self) -> Result<u32, DeviceError> {
        with_device(self.index, |d| d.power_usage())
    }

    fn power_state(&self) -> Result<u32, DeviceError> {
        with_device(self.index, |d| d.performance_state()).map(pstate_ordinal)
    }

    fn running_processes(&self) -> Result<Vec<GpuProcess>, DeviceError> {
        let procs = with_device(self.index, |d| d.running_compute_processes())?;
        Ok(procs
            .into_iter()
            .map(|p| GpuProcess {
                pid: p.pid,
                used_gpu_memory_bytes: match p.used_gpu_memory {
                    UsedGpuMemory::Used(bytes) => Some(bytes),
                    UsedGpuMemory::Unavailable => {
                        debug!("GPU {}: memory usage of pid {} unavailable", self.index, p.pid);
                        None
                    }
                },
            })
            .collect())
    }
}

/// NVML's numeric code for a performance state.
pub fn pstate_ordinal(state: PerformanceState) -> u32 {
    match state {
        PerformanceState::Zero => 0,
        PerformanceState::One => 1,
        PerformanceState::Two => 2,
        PerformanceState::Three => 3,
        PerformanceState::Four => 4,
        PerformanceState::Five => 5,
        PerformanceState::Six => 6,
        PerformanceState::Seven => 7,
        PerformanceState::Eight => 8,
        PerformanceState::Nine => 9,
        PerformanceState::Ten => 10,
        PerformanceState::Eleven => 11,
        PerformanceState::Twelve => 12,
        PerformanceState::Thirteen => 13,
        PerformanceState::Fourteen => 14,
        PerformanceState::Fifteen => 15,
        PerformanceState::Unknown => PSTATE_UNKNOWN,
    }
}

/// NVML_PSTATE_UNKNOWN.
pub const PSTATE_UNKNOWN: u32 = 32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pstate_ordinals_follow_driver_codes() {
        assert_eq!(pstate_ordinal(PerformanceState::Zero), 0);
        assert_eq!(pstate_ordinal(PerformanceState::Eight), 8);
        assert_eq!(pstate_ordinal(PerformanceState::Fifteen), 15);
        assert_eq!(pstate_ordinal(PerformanceState::Unknown), PSTATE_UNKNOWN);
    }
}
