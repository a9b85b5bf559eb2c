//! Host process enrichment (CPU, memory, owner, command line).

use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sysinfo::{
    CpuRefreshKind, MemoryRefreshKind, Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind,
    System, UpdateKind, Users,
};

use crate::error::EnrichError;
use crate::types::{ProcessSample, ProcessStatus};

/// Default delay between the two CPU readings.
pub const DEFAULT_CPU_SAMPLE_INTERVAL: Duration = Duration::from_millis(50);

/// Turns a pid reported by the GPU driver into a full [`ProcessSample`].
pub trait ProcessInspector {
    fn enrich(
        &mut self,
        pid: u32,
        used_gpu_memory_bytes: Option<u64>,
    ) -> Result<ProcessSample, EnrichError>;
}

/// Single-shot fields of one process table entry.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessStats {
    pub memory_percent: f32,
    pub status: ProcessStatus,
    pub username: String,
    pub name: String,
    pub cmdline: String,
    pub num_threads: u32,
    pub cpu_affinity_count: u32,
    pub create_time: DateTime<Utc>,
}

/// Raw access to the OS process table.
pub trait ProcessTable {
    /// Forget every entry read so far.
    fn reset(&mut self);

    /// Refresh the entry for `pid` and return its CPU percentage since the
    /// previous refresh. The first call for a pid has no baseline.
    fn sample_cpu(&mut self, pid: u32) -> Result<f32, EnrichError>;

    /// Read every other field from the entry refreshed by the last
    /// [`ProcessTable::sample_cpu`].
    fn stats(&mut self, pid: u32) -> Result<ProcessStats, EnrichError>;
}

/// [`ProcessInspector`] running the two-read CPU protocol over a
/// [`ProcessTable`].
///
/// Every enrichment starts from an empty table, so nothing read for one pid
/// survives into the next record. The first CPU reading of a freshly opened
/// entry is meaningless, so it is taken, discarded, and a second reading is
/// taken after `cpu_sample_interval`.
/// The sleep blocks the caller: a build over P processes takes at least
/// P × `cpu_sample_interval`.
pub struct ProcessEnricher<T> {
    table: T,
    cpu_sample_interval: Duration,
}

impl<T: ProcessTable> ProcessEnricher<T> {
    pub fn new(table: T, cpu_sample_interval: Duration) -> Self {
        Self {
            table,
            cpu_sample_interval: cpu_sample_interval.max(Duration::from_millis(1)),
        }
    }

    pub fn cpu_sample_interval(&self) -> Duration {
        self.cpu_sample_interval
    }

    pub fn table(&self) -> &T {
        &self.table
    }
}

impl<T: ProcessTable> ProcessInspector for ProcessEnricher<T> {
    fn enrich(
        &mut self,
        pid: u32,
        used_gpu_memory_bytes: Option<u64>,
    ) -> Result<ProcessSample, EnrichError> {
        self.table.reset();
        let _ = self.table.sample_cpu(pid)?;
        thread::sleep(self.cpu_sample_interval);
        let cpu_percent = self.table.sample_cpu(pid)?;
        let stats = self.table.stats(pid)?;

        Ok(ProcessSample {
            pid,
            used_gpu_memory_bytes,
            memory_percent: stats.memory_percent,
            cpu_percent,
            status: stats.status,
            username: stats.username,
            name: stats.name,
            cmdline: stats.cmdline,
            num_threads: stats.num_threads,
            cpu_affinity_count: stats.cpu_affinity_count,
            create_time: stats.create_time,
        })
    }
}

// ============================================================================
// sysinfo backend
// ============================================================================

/// [`ProcessTable`] backed by `sysinfo`.
pub struct SysinfoTable {
    system: System,
    users: Users,
}

impl Default for SysinfoTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoTable {
    pub fn new() -> Self {
        Self {
            system: empty_system(),
            users: Users::new_with_refreshed_list(),
        }
    }

    fn username(&self, process: &sysinfo::Process) -> String {
        process
            .user_id()
            .and_then(|uid| self.users.get_user_by_id(uid))
            .map(|user| user.name().to_string())
            .unwrap_or_else(|| "?".into())
    }
}

/// A `System` with RAM totals loaded and no processes.
fn empty_system() -> System {
    System::new_with_specifics(
        RefreshKind::new()
            .with_memory(MemoryRefreshKind::new().with_ram())
            .with_cpu(CpuRefreshKind::new()),
    )
}

impl ProcessTable for SysinfoTable {
    fn reset(&mut self) {
        self.system = empty_system();
        self.users.refresh_list();
    }

    fn sample_cpu(&mut self, pid: u32) -> Result<f32, EnrichError> {
        let sys_pid = Pid::from_u32(pid);
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[sys_pid]),
            true,
            ProcessRefreshKind::new()
                .with_cpu()
                .with_memory()
                .with_user(UpdateKind::OnlyIfNotSet)
                .with_cmd(UpdateKind::OnlyIfNotSet),
        );

        self.system
            .process(sys_pid)
            .map(|p| p.cpu_usage())
            .ok_or(EnrichError::NotFound(pid))
    }

    fn stats(&mut self, pid: u32) -> Result<ProcessStats, EnrichError> {
        let process = self
            .system
            .process(Pid::from_u32(pid))
            .ok_or(EnrichError::NotFound(pid))?;

        let (num_threads, cpu_affinity_count) =
            thread_and_affinity_counts(pid, process, &self.system)?;

        let total_memory = self.system.total_memory();
        let memory_percent = if total_memory > 0 {
            (process.memory() as f64 / total_memory as f64 * 100.0) as f32
        } else {
            0.0
        };

        let cmdline = process
            .cmd()
            .iter()
            .map(|s| s.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ");

        let create_time =
            DateTime::from_timestamp(process.start_time() as i64, 0).unwrap_or_default();

        Ok(ProcessStats {
            memory_percent,
            status: map_status(process.status()),
            username: self.username(process),
            name: process.name().to_string_lossy().into_owned(),
            cmdline,
            num_threads,
            cpu_affinity_count,
            create_time,
        })
    }
}

#[cfg(target_os = "linux")]
fn thread_and_affinity_counts(
    pid: u32,
    _process: &sysinfo::Process,
    _system: &System,
) -> Result<(u32, u32), EnrichError> {
    let status = std::fs::read_to_string(format!("/proc/{}/status", pid))
        .map_err(|e| EnrichError::from_io(pid, &e))?;
    let parsed = parse_proc_status(&status);
    match (parsed.threads, parsed.cpus_allowed) {
        (Some(threads), Some(cpus)) => Ok((threads, cpus)),
        _ => Err(EnrichError::NotFound(pid)),
    }
}

#[cfg(not(target_os = "linux"))]
fn thread_and_affinity_counts(
    _pid: u32,
    process: &sysinfo::Process,
    system: &System,
) -> Result<(u32, u32), EnrichError> {
    let threads = process.tasks().map_or(1, |t| t.len().max(1) as u32);
    Ok((threads, system.cpus().len() as u32))
}

/// Fields of interest from `/proc/<pid>/status`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProcStatus {
    pub threads: Option<u32>,
    pub cpus_allowed: Option<u32>,
}

pub fn parse_proc_status(contents: &str) -> ProcStatus {
    let mut parsed = ProcStatus::default();
    for line in contents.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key {
            "Threads" => parsed.threads = value.trim().parse().ok(),
            "Cpus_allowed_list" => parsed.cpus_allowed = count_cpu_list(value.trim()),
            _ => {}
        }
    }
    parsed
}

/// Count the CPUs in a kernel cpu list such as `0-3,8,10-11`.
pub fn count_cpu_list(list: &str) -> Option<u32> {
    if list.is_empty() {
        return None;
    }
    let mut count = 0u32;
    for part in list.split(',') {
        match part.split_once('-') {
            Some((lo, hi)) => {
                let lo: u32 = lo.trim().parse().ok()?;
                let hi: u32 = hi.trim().parse().ok()?;
                if hi < lo {
                    return None;
                }
                count = count.checked_add((hi - lo).checked_add(1)?)?;
            }
            None => {
                part.trim().parse::<u32>().ok()?;
                count = count.checked_add(1)?;
            }
        }
    }
    Some(count)
}

fn map_status(status: sysinfo::ProcessStatus) -> ProcessStatus {
    use sysinfo::ProcessStatus as Sys;
    match status {
        Sys::Run => ProcessStatus::Running,
        Sys::Sleep => ProcessStatus::Sleeping,
        Sys::UninterruptibleDiskSleep => ProcessStatus::DiskSleep,
        Sys::Idle => ProcessStatus::Idle,
        Sys::Stop => ProcessStatus::Stopped,
        Sys::Tracing => ProcessStatus::TracingStop,
        Sys::Zombie => ProcessStatus::Zombie,
        Sys::Dead => ProcessStatus::Dead,
        _ => ProcessStatus::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use test_log::test;

    /// Table that replays scripted CPU readings.
    struct ScriptedTable {
        cpu: VecDeque<Result<f32, EnrichError>>,
        stats: Result<ProcessStats, EnrichError>,
        stats_calls: usize,
        resets: usize,
    }

    fn stats() -> ProcessStats {
        ProcessStats {
            memory_percent: 3.2,
            status: ProcessStatus::Running,
            username: "alice".into(),
            name: "python".into(),
            cmdline: "python train.py --epochs 3".into(),
            num_threads: 12,
            cpu_affinity_count: 8,
            create_time: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    impl ProcessTable for ScriptedTable {
        fn reset(&mut self) {
            self.resets += 1;
        }

        fn sample_cpu(&mut self, pid: u32) -> Result<f32, EnrichError> {
            self.cpu.pop_front().unwrap_or(Err(EnrichError::NotFound(pid)))
        }

        fn stats(&mut self, _pid: u32) -> Result<ProcessStats, EnrichError> {
            self.stats_calls += 1;
            self.stats.clone()
        }
    }

    fn enricher(
        cpu: Vec<Result<f32, EnrichError>>,
        stats: Result<ProcessStats, EnrichError>,
    ) -> ProcessEnricher<ScriptedTable> {
        ProcessEnricher::new(
            ScriptedTable {
                cpu: cpu.into(),
                stats,
                stats_calls: 0,
                resets: 0,
            },
            Duration::from_millis(1),
        )
    }

    #[test]
    fn keeps_second_cpu_reading() {
        let mut e = enricher(vec![Ok(0.0), Ok(12.5)], Ok(stats()));
        let sample = e.enrich(100, Some(500 * 1024 * 1024)).unwrap();
        assert_eq!(sample.cpu_percent, 12.5);
        assert_eq!(sample.pid, 100);
        assert_eq!(sample.used_gpu_memory_bytes, Some(500 * 1024 * 1024));
        assert_eq!(sample.memory_percent, 3.2);
        assert_eq!(sample.cmdline, "python train.py --epochs 3");
    }

    #[test]
    fn first_reading_is_discarded_even_when_large() {
        let mut e = enricher(vec![Ok(97.0), Ok(4.0)], Ok(stats()));
        assert_eq!(e.enrich(1, None).unwrap().cpu_percent, 4.0);
    }

    #[test]
    fn exit_between_readings_is_not_found() {
        let mut e = enricher(vec![Ok(0.0), Err(EnrichError::NotFound(5))], Ok(stats()));
        assert_eq!(e.enrich(5, None), Err(EnrichError::NotFound(5)));
        assert_eq!(e.table().stats_calls, 0);
    }

    #[test]
    fn permission_denied_on_stats_aborts_record() {
        let mut e = enricher(
            vec![Ok(0.0), Ok(1.0)],
            Err(EnrichError::PermissionDenied(9)),
        );
        assert_eq!(e.enrich(9, None), Err(EnrichError::PermissionDenied(9)));
    }

    #[test]
    fn zero_interval_is_raised() {
        let e = ProcessEnricher::new(SysinfoTable::new(), Duration::ZERO);
        assert!(e.cpu_sample_interval() > Duration::ZERO);
    }

    #[test]
    fn counts_cpu_lists() {
        assert_eq!(count_cpu_list("0-3"), Some(4));
        assert_eq!(count_cpu_list("0-3,8,10-11"), Some(7));
        assert_eq!(count_cpu_list("5"), Some(1));
        assert_eq!(count_cpu_list(""), None);
        assert_eq!(count_cpu_list("3-1"), None);
        assert_eq!(count_cpu_list("x"), None);
        assert_eq!(count_cpu_list("0-4294967295"), None);
        assert_eq!(count_cpu_list("0-4294967294,7"), None);
    }

    #[test]
    fn every_enrichment_starts_from_an_empty_table() {
        let mut e = enricher(vec![Ok(0.0), Ok(1.0), Ok(0.0), Ok(2.0)], Ok(stats()));
        e.enrich(1, None).unwrap();
        assert_eq!(e.table().resets, 1);
        e.enrich(1, None).unwrap();
        assert_eq!(e.table().resets, 2);
    }

    #[test]
    fn parses_proc_status() {
        let contents = "Name:\tpython\nState:\tS (sleeping)\nThreads:\t17\nCpus_allowed:\tff\nCpus_allowed_list:\t0-7\n";
        assert_eq!(
            parse_proc_status(contents),
            ProcStatus {
                threads: Some(17),
                cpus_allowed: Some(8),
            }
        );
    }

    #[test]
    fn own_process_is_inspectable() {
        let mut table = SysinfoTable::new();
        let pid = std::process::id();
        table.sample_cpu(pid).unwrap();
        let stats = table.stats(pid).unwrap();
        assert!(stats.num_threads >= 1);
        assert!(stats.cpu_affinity_count >= 1);
        assert!(!stats.name.is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn command_line_follows_exec() {
        use std::process::Command;

        let mut child = Command::new("sh")
            .args(["-c", "sleep 0.5; exec sleep 30"])
            .spawn()
            .unwrap();
        let pid = child.id();
        let mut e = ProcessEnricher::new(SysinfoTable::new(), Duration::from_millis(10));

        let before = e.enrich(pid, None).map(|p| p.cmdline);
        thread::sleep(Duration::from_millis(1200));
        let after = e.enrich(pid, None).map(|p| p.cmdline);

        child.kill().unwrap();
        child.wait().unwrap();

        assert_eq!(before.unwrap(), "sh -c sleep 0.5; exec sleep 30");
        assert_eq!(after.unwrap(), "sleep 30");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn exited_processes_are_not_kept() {
        use std::process::Command;

        let mut e = ProcessEnricher::new(SysinfoTable::new(), Duration::from_millis(1));
        let mut children: Vec<_> = (0..3)
            .map(|_| Command::new("sleep").arg("30").spawn().unwrap())
            .collect();
        for child in &children {
            e.enrich(child.id(), None).unwrap();
        }
        let pids: Vec<u32> = children.iter().map(|c| c.id()).collect();
        for child in &mut children {
            child.kill().unwrap();
            child.wait().unwrap();
        }

        e.enrich(std::process::id(), None).unwrap();

        let cached = e.table().system.processes();
        assert!(pids.iter().all(|&pid| !cached.contains_key(&Pid::from_u32(pid))));
        assert!(cached.contains_key(&Pid::from_u32(std::process::id())));
    }
}
