//! Unit conversion and display formatting for snapshot values.
//!
//! Snapshots carry raw driver units (bytes, milliwatts). Everything here is a
//! pure function of a snapshot value, and anything missing formats as
//! [`UNKNOWN`] rather than zero.

use std::fmt::Display;

use chrono::{DateTime, Local, Utc};
use humansize::{format_size, BINARY};

use crate::metrics::gpu::PSTATE_UNKNOWN;
use crate::types::{DeviceMemory, DeviceSample, Metric};

/// Marker rendered for absent or unavailable values.
pub const UNKNOWN: &str = "unknown";

const MIB: f64 = 1024.0 * 1024.0;

pub fn bytes_to_mib(bytes: u64) -> f64 {
    bytes as f64 / MIB
}

pub fn milliwatts_to_watts(milliwatts: u32) -> f64 {
    milliwatts as f64 / 1000.0
}

/// Used share of device memory in percent, `None` for a zero-sized pool.
pub fn memory_used_percent(memory: &DeviceMemory) -> Option<f64> {
    if memory.total_bytes == 0 {
        return None;
    }
    Some(memory.used_bytes as f64 / memory.total_bytes as f64 * 100.0)
}

/// Format a metric with `f`, or [`UNKNOWN`] when it has no value.
pub fn format_metric<T>(metric: &Metric<T>, f: impl FnOnce(&T) -> String) -> String {
    metric.value().map(f).unwrap_or_else(|| UNKNOWN.to_string())
}

pub fn format_with_unit<T: Display>(metric: &Metric<T>, unit: &str) -> String {
    format_metric(metric, |v| format!("{}{}", v, unit))
}

pub fn format_fan_speed(fan: &Metric<u32>) -> String {
    format_with_unit(fan, "%")
}

pub fn format_temperature(temperature: &Metric<u32>) -> String {
    format_with_unit(temperature, "°C")
}

pub fn format_power(milliwatts: &Metric<u32>) -> String {
    format_metric(milliwatts, |mw| format!("{:.1} W", milliwatts_to_watts(*mw)))
}

pub fn format_power_state(state: &Metric<u32>) -> String {
    format_metric(state, |&p| {
        if p == PSTATE_UNKNOWN {
            "P?".to_string()
        } else {
            format!("P{}", p)
        }
    })
}

pub fn format_bytes(bytes: u64) -> String {
    format_size(bytes, BINARY)
}

pub fn format_optional_bytes(bytes: Option<u64>) -> String {
    bytes.map(format_bytes).unwrap_or_else(|| UNKNOWN.to_string())
}

/// Process start time in local time, `YYYY-mm-dd HH:MM:SS`.
pub fn format_local_time(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Device values converted to display units.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceReadout {
    pub id: u32,
    pub name: String,
    pub free_mib: Option<f64>,
    pub used_mib: Option<f64>,
    pub total_mib: Option<f64>,
    pub used_percent: Option<f64>,
    pub temperature_celsius: Option<u32>,
    pub fan_speed_percent: Option<u32>,
    pub power_watts: Option<f64>,
    pub power_state: Option<u32>,
    pub process_count: usize,
}

impl From<&DeviceSample> for DeviceReadout {
    fn from(device: &DeviceSample) -> Self {
        let memory = device.memory.value();
        Self {
            id: device.id,
            name: device.name.clone(),
            free_mib: memory.map(|m| bytes_to_mib(m.free_bytes)),
            used_mib: memory.map(|m| bytes_to_mib(m.used_bytes)),
            total_mib: memory.map(|m| bytes_to_mib(m.total_bytes)),
            used_percent: memory.and_then(memory_used_percent),
            temperature_celsius: device.temperature_celsius.get(),
            fan_speed_percent: device.fan_speed_percent.get(),
            power_watts: device.power_usage_milliwatts.get().map(milliwatts_to_watts),
            power_state: device.power_state.get(),
            process_count: device.processes.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn device(fan: Metric<u32>) -> DeviceSample {
        DeviceSample {
            id: 1,
            name: "Tesla T4".into(),
            memory: Metric::Available(DeviceMemory {
                free_bytes: 3 * 1024 * 1024 * 1024,
                used_bytes: 1024 * 1024 * 1024,
                total_bytes: 4 * 1024 * 1024 * 1024,
            }),
            temperature_celsius: Metric::Available(41),
            fan_speed_percent: fan,
            power_usage_milliwatts: Metric::Available(27_500),
            power_state: Metric::Available(8),
            processes: Vec::new(),
        }
    }

    #[test]
    fn converts_bytes_and_power() {
        assert_eq!(bytes_to_mib(500 * 1024 * 1024), 500.0);
        assert_eq!(milliwatts_to_watts(27_500), 27.5);
    }

    #[test]
    fn memory_percent_of_empty_pool_is_unknown() {
        assert_eq!(memory_used_percent(&DeviceMemory::default()), None);
        let half = DeviceMemory {
            free_bytes: 50,
            used_bytes: 50,
            total_bytes: 100,
        };
        assert_eq!(memory_used_percent(&half), Some(50.0));
    }

    #[test]
    fn absent_fan_renders_unknown_not_zero() {
        assert_eq!(format_fan_speed(&Metric::Absent), "unknown");
        assert_eq!(format_fan_speed(&Metric::Unavailable), "unknown");
        assert_eq!(format_fan_speed(&Metric::Available(0)), "0%");
        assert_eq!(format_fan_speed(&Metric::Available(35)), "35%");
    }

    #[test]
    fn readout_keeps_absent_fan_absent() {
        let readout = DeviceReadout::from(&device(Metric::Absent));
        assert_eq!(readout.fan_speed_percent, None);
        assert_eq!(readout.free_mib, Some(3072.0));
        assert_eq!(readout.used_mib, Some(1024.0));
        assert_eq!(readout.used_percent, Some(25.0));
        assert_eq!(readout.power_watts, Some(27.5));
    }

    #[test]
    fn unavailable_memory_has_no_readout() {
        let mut d = device(Metric::Available(30));
        d.memory = Metric::Unavailable;
        let readout = DeviceReadout::from(&d);
        assert_eq!(readout.free_mib, None);
        assert_eq!(readout.used_percent, None);
    }

    #[test]
    fn formats_power_state_and_power() {
        assert_eq!(format_power_state(&Metric::Available(2)), "P2");
        assert_eq!(format_power_state(&Metric::Available(PSTATE_UNKNOWN)), "P?");
        assert_eq!(format_power(&Metric::Available(70_300)), "70.3 W");
        assert_eq!(format_power(&Metric::Unavailable), "unknown");
    }

    #[test]
    fn formats_sizes() {
        assert_eq!(format_bytes(500 * 1024 * 1024), "500 MiB");
        assert_eq!(format_optional_bytes(None), "unknown");
    }
}
