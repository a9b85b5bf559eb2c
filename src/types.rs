//! Data types produced by the snapshot builder.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A device counter that may be missing.
///
/// `Absent` means the hardware does not expose the sensor at all, while
/// `Unavailable` means the read failed this time around. Neither is ever
/// treated as zero.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric<T> {
    Available(T),
    Absent,
    Unavailable,
}

impl<T> Metric<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Metric::Available(v) => Some(v),
            Metric::Absent | Metric::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Metric::Available(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Metric<U> {
        match self {
            Metric::Available(v) => Metric::Available(f(v)),
            Metric::Absent => Metric::Absent,
            Metric::Unavailable => Metric::Unavailable,
        }
    }
}

impl<T: Copy> Metric<T> {
    pub fn get(&self) -> Option<T> {
        self.value().copied()
    }
}

/// Framebuffer memory as reported by the driver, in bytes.
///
/// The driver guarantees `free_bytes + used_bytes == total_bytes`; it is not
/// re-checked here.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeviceMemory {
    pub free_bytes: u64,
    pub used_bytes: u64,
    pub total_bytes: u64,
}

/// Scheduler state of a host process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Running,
    Sleeping,
    DiskSleep,
    Idle,
    Stopped,
    TracingStop,
    Zombie,
    Dead,
    Unknown,
}

impl ProcessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Running => "running",
            ProcessStatus::Sleeping => "sleeping",
            ProcessStatus::DiskSleep => "disk-sleep",
            ProcessStatus::Idle => "idle",
            ProcessStatus::Stopped => "stopped",
            ProcessStatus::TracingStop => "tracing-stop",
            ProcessStatus::Zombie => "zombie",
            ProcessStatus::Dead => "dead",
            ProcessStatus::Unknown => "unknown",
        }
    }
}

/// One OS process holding a compute context on a device.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProcessSample {
    pub pid: u32,
    /// `None` when the driver cannot attribute memory to the process.
    pub used_gpu_memory_bytes: Option<u64>,
    pub memory_percent: f32,
    pub cpu_percent: f32,
    pub status: ProcessStatus,
    pub username: String,
    pub name: String,
    pub cmdline: String,
    pub num_threads: u32,
    pub cpu_affinity_count: u32,
    pub create_time: DateTime<Utc>,
}

/// One physical accelerator at one point in time.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DeviceSample {
    pub id: u32,
    pub name: String,
    pub memory: Metric<DeviceMemory>,
    pub temperature_celsius: Metric<u32>,
    pub fan_speed_percent: Metric<u32>,
    pub power_usage_milliwatts: Metric<u32>,
    /// Vendor performance-state ordinal (P0..P15, 32 = unknown).
    pub power_state: Metric<u32>,
    /// In driver enumeration order.
    pub processes: Vec<ProcessSample>,
}

impl DeviceSample {
    pub fn memory_free_bytes(&self) -> Option<u64> {
        self.memory.value().map(|m| m.free_bytes)
    }

    pub fn memory_used_bytes(&self) -> Option<u64> {
        self.memory.value().map(|m| m.used_bytes)
    }

    pub fn memory_total_bytes(&self) -> Option<u64> {
        self.memory.value().map(|m| m.total_bytes)
    }
}

/// A complete, immutable readout of every device and its processes.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    pub driver_version: Metric<String>,
    pub device_count: usize,
    pub devices: Vec<DeviceSample>,
    pub taken_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(driver_version: Metric<String>, devices: Vec<DeviceSample>) -> Self {
        Self {
            driver_version,
            device_count: devices.len(),
            devices,
            taken_at: Utc::now(),
        }
    }
}
