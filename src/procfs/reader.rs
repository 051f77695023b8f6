//! Query operations over the system and per-process metrics exposed by procfs
//!
//! Every operation reads its backing file once, from scratch, and keeps nothing between calls.
//! A file which cannot be accessed is never an error: the process it belongs to may simply have exited
//! between the moment its PID was listed and the moment the file is opened.
//! A file which can be accessed but holds unexpected content is reported as an error.

use std::fs::{read_dir, DirEntry};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::procfs::libc::clock_ticks;
use crate::procfs::parsers::passwd::Passwd;
use crate::procfs::parsers::process::{Cmdline, PidStat, PidStatus};
use crate::procfs::parsers::system::{CpuSample, KernelVersion, MemInfo, OsRelease, ProcessCounts, Uptime};
use crate::procfs::parsers::{read_file, read_process_data, read_system_data};
use crate::procfs::{Pid, ProcfsError};

/// Locations of the files read by a `SystemMetricsReader`
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ReaderConfig {
    /// Root of the process information filesystem
    pub proc_dir: PathBuf,
    pub os_release_path: PathBuf,
    /// Table of the user accounts of the system
    pub passwd_path: PathBuf,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            proc_dir: PathBuf::from("/proc"),
            os_release_path: PathBuf::from("/etc/os-release"),
            passwd_path: PathBuf::from("/etc/passwd"),
        }
    }
}

/// Reads system and process metrics from the files described by a `ReaderConfig`
#[derive(Debug, Clone)]
pub struct SystemMetricsReader {
    config: ReaderConfig,
    clock_ticks: u64,
}

impl SystemMetricsReader {
    /// Returns a reader of the live `/proc` filesystem
    pub fn new() -> Result<Self, ProcfsError> {
        Self::with_config(ReaderConfig::default())
    }

    pub fn with_config(config: ReaderConfig) -> Result<Self, ProcfsError> {
        Ok(SystemMetricsReader {
            config,
            clock_ticks: clock_ticks()?,
        })
    }

    /// Overrides the amount of clock ticks per second reported by the system
    pub fn with_clock_ticks(mut self, clock_ticks: u64) -> Self {
        self.clock_ticks = clock_ticks.max(1);
        self
    }

    fn proc_dir(&self) -> &Path {
        self.config.proc_dir.as_path()
    }

    /// Returns the name of the running operating system distribution, or an empty string if unknown
    pub fn operating_system(&self) -> String {
        let os_release = read_file::<OsRelease>(&self.config.os_release_path);

        or_default(os_release, "OS release")
            .pretty_name()
            .unwrap_or_default()
            .to_string()
    }

    /// Returns the release of the running kernel, or an empty string if unknown
    pub fn kernel(&self) -> String {
        let version = read_system_data::<KernelVersion>(self.proc_dir()).map(KernelVersion::into_release);

        or_default(version, "kernel version")
    }

    /// Returns the PIDs of currently running processes, in no particular order
    pub fn pids(&self) -> Vec<Pid> {
        let dir_iter = match read_dir(self.proc_dir()) {
            Ok(dir_iter) => dir_iter,
            Err(e) => {
                debug!("Could not scan processes in {:?}: {}", self.proc_dir(), e);
                return Vec::new();
            }
        };

        dir_iter
            // only retrieve dir entry which are not err
            .filter_map(|r| r.ok())
            // only retrieve directories
            .filter(|de| de.file_type().map(|ft| ft.is_dir()).unwrap_or(false))
            .filter_map(|de: DirEntry| pid_from_proc_dir(de.file_name().to_str()?))
            .collect()
    }

    /// Returns the ratio of memory in use by the system, between 0 and 1
    ///
    /// Returns 0 if memory information is not available, and an error if it does not contain both the
    /// total and free amounts of memory
    pub fn memory_utilization(&self) -> Result<f64, ProcfsError> {
        match read_system_data::<MemInfo>(self.proc_dir()) {
            Ok(meminfo) => meminfo.utilization(),
            Err(e) if e.is_absence() => {
                debug!("Could not access memory information: {}", e);
                Ok(0.)
            }
            Err(e) => Err(e),
        }
    }

    /// Returns the amount of seconds elapsed since the system booted, or 0 if unknown
    pub fn uptime(&self) -> u64 {
        let uptime = read_system_data::<Uptime>(self.proc_dir()).map(|u| u.seconds());

        or_default(uptime, "system uptime")
    }

    /// Returns the aggregated CPU counters of the system
    pub fn cpu_sample(&self) -> Result<CpuSample, ProcfsError> {
        default_if_absent(read_system_data(self.proc_dir()), "CPU statistics")
    }

    /// Returns the total amount of clock ticks spent by all CPUs since boot
    pub fn jiffies(&self) -> Result<u64, ProcfsError> {
        Ok(self.cpu_sample()?.total())
    }

    /// Returns the amount of clock ticks spent by all CPUs in the idle task since boot
    pub fn idle_jiffies(&self) -> Result<u64, ProcfsError> {
        Ok(self.cpu_sample()?.idle())
    }

    /// Returns the amount of clock ticks spent by all CPUs outside of the idle task since boot
    pub fn active_jiffies(&self) -> Result<u64, ProcfsError> {
        Ok(self.cpu_sample()?.active())
    }

    /// Returns the amount of clock ticks during which the process or its waited-for children were scheduled
    pub fn pid_active_jiffies(&self, pid: Pid) -> Result<u64, ProcfsError> {
        Ok(self.pid_stat(pid)?.running_time())
    }

    /// Returns the amount of seconds elapsed since the process started
    ///
    /// If the process does not exist anymore, its start time is considered to be the boot time
    pub fn pid_uptime(&self, pid: Pid) -> Result<u64, ProcfsError> {
        let start_seconds = self.pid_stat(pid)?.starttime() / self.clock_ticks;

        Ok(self.uptime().saturating_sub(start_seconds))
    }

    fn pid_stat(&self, pid: Pid) -> Result<PidStat, ProcfsError> {
        default_if_absent(read_process_data(self.proc_dir(), pid), "process statistics")
    }

    /// Returns the amount of processes created since boot
    pub fn total_processes(&self) -> Result<u64, ProcfsError> {
        Ok(self.process_counts()?.processes()?.unwrap_or(0))
    }

    /// Returns the amount of processes currently in a runnable state
    pub fn running_processes(&self) -> Result<u64, ProcfsError> {
        Ok(self.process_counts()?.procs_running()?.unwrap_or(0))
    }

    fn process_counts(&self) -> Result<ProcessCounts, ProcfsError> {
        default_if_absent(read_system_data(self.proc_dir()), "process counters")
    }

    /// Returns the command line which started the process, or an empty string if unknown
    pub fn command(&self, pid: Pid) -> String {
        let cmdline = read_process_data::<Cmdline>(self.proc_dir(), pid).map(Cmdline::into_command);

        or_default(cmdline, "process command line")
    }

    /// Returns the virtual memory size of the process in MB, or "0" if unknown
    pub fn ram(&self, pid: Pid) -> Result<String, ProcfsError> {
        let status: PidStatus = default_if_absent(read_process_data(self.proc_dir(), pid), "process status")?;

        Ok(status.vm_size_mb()?.unwrap_or(0).to_string())
    }

    /// Returns the UID of the owner of the process, or an empty string if unknown
    pub fn uid(&self, pid: Pid) -> String {
        let status = read_process_data::<PidStatus>(self.proc_dir(), pid);

        or_default(status, "process status")
            .uid()
            .unwrap_or_default()
            .to_string()
    }

    /// Returns the name of the owner of the process, or an empty string if unknown
    pub fn user(&self, pid: Pid) -> String {
        let uid = self.uid(pid);
        if uid.is_empty() {
            return String::new();
        }

        let passwd = read_file::<Passwd>(&self.config.passwd_path);

        or_default(passwd, "user accounts")
            .user_name(&uid)
            .unwrap_or_default()
            .to_string()
    }
}

/// Parses a PID from a directory name, if it only consists of decimal digits
fn pid_from_proc_dir(dir_name: &str) -> Option<Pid> {
    if dir_name.is_empty() || !dir_name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    dir_name.parse().ok()
}

/// Substitutes the default value of `D` to an error caused by a file which could not be accessed
fn default_if_absent<D>(data: Result<D, ProcfsError>, description: &str) -> Result<D, ProcfsError>
where
    D: Default,
{
    match data {
        Err(e) if e.is_absence() => {
            debug!("Could not access {}: {}", description, e);
            Ok(D::default())
        }
        data => data,
    }
}

/// Substitutes the default value of `D` to any error
fn or_default<D>(data: Result<D, ProcfsError>, description: &str) -> D
where
    D: Default,
{
    default_if_absent(data, description).unwrap_or_else(|e| {
        warn!("Invalid {}: {}", description, e);
        D::default()
    })
}


#[cfg(test)]
mod test_default_substitution {
    use std::io;

    use super::*;

    fn absent() -> Result<u64, ProcfsError> {
        Err(io::Error::new(io::ErrorKind::NotFound, "gone").into())
    }

    fn malformed() -> Result<u64, ProcfsError> {
        Err(ProcfsError::InvalidFileContent("garbage".to_string()))
    }

    #[test]
    fn test_absent_data_should_be_defaulted() {
        assert!(matches!(default_if_absent(absent(), "test"), Ok(0)));
        assert_eq!(or_default(absent(), "test"), 0);
    }

    #[test]
    fn test_malformed_data_should_only_be_defaulted_on_demand() {
        assert!(matches!(
            default_if_absent(malformed(), "test"),
            Err(ProcfsError::InvalidFileContent(_))
        ));
        assert_eq!(or_default(malformed(), "test"), 0);
    }

    #[test]
    fn test_valid_data_should_be_kept() {
        assert!(matches!(default_if_absent(Ok(7), "test"), Ok(7)));
        assert_eq!(or_default(Ok(7), "test"), 7);
    }
}
