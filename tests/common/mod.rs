//! Synthetic driver and process table for snapshot tests.

#![allow(dead_code)]

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use nvdash::metrics::{GpuDevice, GpuDriver, GpuProcess, ProcessInspector};
use nvdash::{DeviceError, DeviceMemory, EnrichError, ProcessSample, ProcessStatus, TelemetryError};

pub const MIB: u64 = 1024 * 1024;

#[derive(Clone, Debug)]
pub struct FakeDevice {
    pub index: u32,
    pub name: Result<String, DeviceError>,
    pub memory: Result<DeviceMemory, DeviceError>,
    pub temperature: Result<u32, DeviceError>,
    pub fan: Result<Option<u32>, DeviceError>,
    pub power: Result<u32, DeviceError>,
    pub power_state: Result<u32, DeviceError>,
    pub processes: Result<Vec<GpuProcess>, DeviceError>,
}

impl FakeDevice {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            name: Ok(format!("NVIDIA Test GPU {}", index)),
            memory: Ok(DeviceMemory {
                free_bytes: 12 * 1024 * MIB,
                used_bytes: 4 * 1024 * MIB,
                total_bytes: 16 * 1024 * MIB,
            }),
            temperature: Ok(45),
            fan: Ok(Some(30)),
            power: Ok(70_000),
            power_state: Ok(0),
            processes: Ok(Vec::new()),
        }
    }

    pub fn with_processes(mut self, procs: &[(u32, u64)]) -> Self {
        self.processes = Ok(procs
            .iter()
            .map(|&(pid, used)| GpuProcess {
                pid,
                used_gpu_memory_bytes: Some(used),
            })
            .collect());
        self
    }
}

impl GpuDevice for FakeDevice {
    fn index(&self) -> u32 {
        self.index
    }

    fn name(&self) -> Result<String, DeviceError> {
        self.name.clone()
    }

    fn memory_info(&self) -> Result<DeviceMemory, DeviceError> {
        self.memory.clone()
    }

    fn temperature(&self) -> Result<u32, DeviceError> {
        self.temperature.clone()
    }

    fn fan_speed(&self) -> Result<Option<u32>, DeviceError> {
        self.fan.clone()
    }

    fn power_usage(&self) -> Result<u32, DeviceError> {
        self.power.clone()
    }

    fn power_state(&self) -> Result<u32, DeviceError> {
        self.power_state.clone()
    }

    fn running_processes(&self) -> Result<Vec<GpuProcess>, DeviceError> {
        self.processes.clone()
    }
}

pub struct FakeDriver {
    pub version: Result<String, DeviceError>,
    pub devices: Result<Vec<FakeDevice>, DeviceError>,
}

impl FakeDriver {
    pub fn new(devices: Vec<FakeDevice>) -> Self {
        Self {
            version: Ok("550.54.15".into()),
            devices: Ok(devices),
        }
    }
}

impl GpuDriver for FakeDriver {
    fn driver_version(&self) -> Result<String, DeviceError> {
        self.version.clone()
    }

    fn list_devices(&self) -> Result<Vec<Box<dyn GpuDevice>>, TelemetryError> {
        match &self.devices {
            Ok(devices) => Ok(devices
                .iter()
                .cloned()
                .map(|d| Box::new(d) as Box<dyn GpuDevice>)
                .collect()),
            Err(err) => Err(TelemetryError::Enumeration(err.clone())),
        }
    }
}

/// Host stats for one pid: (memory_percent, cpu_percent).
pub struct FakeInspector {
    pub processes: HashMap<u32, Result<(f32, f32), EnrichError>>,
    pub calls: Vec<u32>,
}

impl FakeInspector {
    pub fn new(processes: Vec<(u32, Result<(f32, f32), EnrichError>)>) -> Self {
        Self {
            processes: processes.into_iter().collect(),
            calls: Vec::new(),
        }
    }
}

pub fn start_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

impl ProcessInspector for FakeInspector {
    fn enrich(
        &mut self,
        pid: u32,
        used_gpu_memory_bytes: Option<u64>,
    ) -> Result<ProcessSample, EnrichError> {
        self.calls.push(pid);
        let (memory_percent, cpu_percent) = self
            .processes
            .get(&pid)
            .cloned()
            .unwrap_or(Err(EnrichError::NotFound(pid)))?;

        Ok(ProcessSample {
            pid,
            used_gpu_memory_bytes,
            memory_percent,
            cpu_percent,
            status: ProcessStatus::Running,
            username: "alice".into(),
            name: "python".into(),
            cmdline: format!("python worker.py --pid {}", pid),
            num_threads: 8,
            cpu_affinity_count: 16,
            create_time: start_time(),
        })
    }
}
