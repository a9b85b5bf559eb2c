//! Plain-text snapshot report for `--once`.

use std::fmt::Write;

use nvdash::units::{
    format_bytes, format_fan_speed, format_local_time, format_optional_bytes, format_power,
    format_power_state, format_temperature, UNKNOWN,
};
use nvdash::Snapshot;

pub fn render_report(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let driver = snapshot
        .driver_version
        .value()
        .map(String::as_str)
        .unwrap_or(UNKNOWN);

    let _ = writeln!(out, "Driver version: {}", driver);
    let _ = writeln!(out, "Devices: {}", snapshot.device_count);

    for device in &snapshot.devices {
        let _ = writeln!(
            out,
            "\n[{}] {} ({})",
            device.id,
            device.name,
            format_power_state(&device.power_state)
        );
        match device.memory.value() {
            Some(mem) => {
                let _ = writeln!(
                    out,
                    "    memory: {} free, {} used, {} total",
                    format_bytes(mem.free_bytes),
                    format_bytes(mem.used_bytes),
                    format_bytes(mem.total_bytes)
                );
            }
            None => {
                let _ = writeln!(out, "    memory: {}", UNKNOWN);
            }
        }
        let _ = writeln!(
            out,
            "    temperature: {}  fan: {}  power: {}",
            format_temperature(&device.temperature_celsius),
            format_fan_speed(&device.fan_speed_percent),
            format_power(&device.power_usage_milliwatts)
        );

        if device.processes.is_empty() {
            let _ = writeln!(out, "    no compute processes");
            continue;
        }
        for p in &device.processes {
            let _ = writeln!(
                out,
                "    pid {:<7} {:<10} {:<9} cpu {:>5.1}%  mem {:>4.1}%  gpu {:>10}  threads {:<4} cpus {:<3} started {}  {}",
                p.pid,
                p.username,
                p.status.as_str(),
                p.cpu_percent,
                p.memory_percent,
                format_optional_bytes(p.used_gpu_memory_bytes),
                p.num_threads,
                p.cpu_affinity_count,
                format_local_time(p.create_time),
                if p.cmdline.is_empty() { &p.name } else { &p.cmdline }
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nvdash::{DeviceMemory, DeviceSample, Metric, ProcessSample, ProcessStatus};

    fn snapshot() -> Snapshot {
        let process = ProcessSample {
            pid: 100,
            used_gpu_memory_bytes: Some(500 * 1024 * 1024),
            memory_percent: 3.2,
            cpu_percent: 12.5,
            status: ProcessStatus::Running,
            username: "alice".into(),
            name: "python".into(),
            cmdline: "python train.py".into(),
            num_threads: 12,
            cpu_affinity_count: 8,
            create_time: Utc::now(),
        };
        let device = |id, fan, processes| DeviceSample {
            id,
            name: "Tesla T4".into(),
            memory: Metric::Available(DeviceMemory {
                free_bytes: 1024,
                used_bytes: 1024,
                total_bytes: 2048,
            }),
            temperature_celsius: Metric::Available(50),
            fan_speed_percent: fan,
            power_usage_milliwatts: Metric::Available(30_000),
            power_state: Metric::Available(0),
            processes,
        };
        Snapshot::new(
            Metric::Available("550.54".into()),
            vec![
                device(0, Metric::Available(40), vec![process]),
                device(1, Metric::Absent, Vec::new()),
            ],
        )
    }

    #[test]
    fn report_lists_devices_and_processes() {
        let report = render_report(&snapshot());
        assert!(report.contains("Driver version: 550.54"));
        assert!(report.contains("Devices: 2"));
        assert!(report.contains("pid 100"));
        assert!(report.contains("500 MiB"));
        assert!(report.contains("python train.py"));
    }

    #[test]
    fn absent_fan_reported_as_unknown() {
        let report = render_report(&snapshot());
        assert!(report.contains("fan: 40%"));
        assert!(report.contains("fan: unknown"));
        assert!(!report.contains("fan: 0%"));
    }
}
