use std::path::{Path, PathBuf};

use crate::procfs::parsers::{Parse, Separator, SystemData, TokenParser};
use crate::procfs::ProcfsError;

/// Represents data from `/etc/os-release`
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct OsRelease {
    pretty_name: Option<String>,
}

impl OsRelease {
    /// Returns the name of the distribution in a format suitable for presentation to the user
    pub fn pretty_name(&self) -> Option<&str> {
        self.pretty_name.as_deref()
    }
}

impl Parse for OsRelease {
    fn parse(token_parser: &TokenParser) -> Result<Self, ProcfsError> {
        let pretty_name = token_parser
            .key_values(Separator::Equals)
            .get("PRETTY_NAME")
            .map(|kv| kv.unquoted().to_string());

        Ok(OsRelease { pretty_name })
    }
}


/// Represents data from `/proc/version`
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct KernelVersion {
    release: String,
}

impl KernelVersion {
    /// Returns the release of the running kernel (e.g. `6.1.0-13-amd64`)
    pub fn into_release(self) -> String {
        self.release
    }
}

impl Parse for KernelVersion {
    fn parse(token_parser: &TokenParser) -> Result<Self, ProcfsError> {
        // Linux version 6.1.0-13-amd64 (debian-kernel@lists.debian.org) ...
        Ok(KernelVersion {
            release: token_parser.token(0, 2)?,
        })
    }
}

impl SystemData for KernelVersion {
    fn filepath(proc_dir: &Path) -> PathBuf {
        proc_dir.join("version")
    }
}

#[cfg(test)]
mod test_kernel_version {
    use crate::procfs::parsers::system::KernelVersion;
    use crate::procfs::parsers::{Parse, TokenParser};

    #[test]
    fn test_parse_version_file() {
        let content = "Linux version 6.1.0-13-amd64 (debian-kernel@lists.debian.org) (gcc-12 (Debian 12.2.0-14) \
12.2.0, GNU ld (GNU Binutils for Debian) 2.40) #1 SMP PREEMPT_DYNAMIC Debian 6.1.55-1 (2023-09-29)\n";

        let version = KernelVersion::parse(&TokenParser::new(content)).expect("Could not read KernelVersion");

        assert_eq!(version.into_release(), "6.1.0-13-amd64");
    }

    #[test]
    fn test_parse_truncated_version_file() {
        assert!(KernelVersion::parse(&TokenParser::new("Linux version")).is_err());
    }
}

/// Represents data from `/proc/meminfo`
#[derive(Eq, PartialEq, Debug, Copy, Clone)]
pub struct MemInfo {
    /// Total usable RAM, in kB
    total: u64,
    /// RAM left unused by the system, in kB
    free: u64,
}

impl MemInfo {
    const TOTAL_KEY: &'static str = "MemTotal";
    const FREE_KEY: &'static str = "MemFree";

    pub fn new(total: u64, free: u64) -> Self {
        MemInfo { total, free }
    }

    /// Returns the ratio of RAM in use, between 0 and 1
    pub fn utilization(&self) -> Result<f64, ProcfsError> {
        if self.total == 0 {
            return Err(ProcfsError::InvalidFileContent(format!("{} is 0", Self::TOTAL_KEY)));
        }

        Ok(self.total.saturating_sub(self.free) as f64 / self.total as f64)
    }
}

impl Parse for MemInfo {
    fn parse(token_parser: &TokenParser) -> Result<Self, ProcfsError> {
        let mut total: Option<u64> = None;
        let mut free: Option<u64> = None;

        for kv in token_parser.key_values(Separator::Colon).entries() {
            match kv.key() {
                Self::TOTAL_KEY => total = Some(kv.token(0)?),
                Self::FREE_KEY => free = Some(kv.token(0)?),
                _ => continue,
            }

            if total.is_some() && free.is_some() {
                break;
            }
        }

        match (total, free) {
            (Some(total), Some(free)) => Ok(MemInfo { total, free }),
            (total, free) => {
                let mut missing_keys = Vec::new();
                if total.is_none() {
                    missing_keys.push(Self::TOTAL_KEY);
                }
                if free.is_none() {
                    missing_keys.push(Self::FREE_KEY);
                }
                Err(ProcfsError::MissingKeys(missing_keys))
            }
        }
    }
}

impl SystemData for MemInfo {
    fn filepath(proc_dir: &Path) -> PathBuf {
        proc_dir.join("meminfo")
    }
}


/// Represents data from `/proc/uptime`
#[derive(Eq, PartialEq, Debug, Copy, Clone)]
pub struct Uptime {
    /// Represents the amount of seconds elapsed since the system booted
    // scanf format: unspecified
    uptime: u64,
}

impl Uptime {
    pub fn seconds(&self) -> u64 {
        self.uptime
    }
}

impl Parse for Uptime {
    fn parse(token_parser: &TokenParser) -> Result<Self, ProcfsError> {
        let uptime: f64 = token_parser.token(0, 0)?;

        if !uptime.is_finite() || uptime < 0. {
            return Err(ProcfsError::InvalidFileContent(format!("Invalid uptime: {}", uptime)));
        }

        Ok(Uptime { uptime: uptime as u64 })
    }
}

impl SystemData for Uptime {
    fn filepath(proc_dir: &Path) -> PathBuf {
        proc_dir.join("uptime")
    }
}

#[cfg(test)]
mod test_uptime {
    use crate::procfs::parsers::system::Uptime;
    use crate::procfs::parsers::{Parse, TokenParser};

    #[test]
    fn test_parse_uptime() {
        let content = "10281.87 123230.54".to_string();

        let token_parser = TokenParser::new(&content);

        let uptime = Uptime::parse(&token_parser).expect("Could not read Uptime");

        assert_eq!(uptime.seconds(), 10281);
    }

    #[test]
    fn test_parse_negative_uptime() {
        assert!(Uptime::parse(&TokenParser::new("-3.5 10.0")).is_err());
    }
}

/// Represents the aggregated CPU line of `/proc/stat`
///
/// All values are expressed in clock ticks (jiffies) since boot
#[derive(Eq, PartialEq, Debug, Copy, Clone, Default)]
pub struct CpuSample {
    /// Time spent in user mode
    user: u64,
    /// Time spent in user mode with low priority (nice)
    nice: u64,
    /// Time spent in system mode
    system: u64,
    /// Time spent in the idle task
    idle: u64,
    /// Time waiting for I/O to complete
    iowait: u64,
    /// Time servicing interrupts
    irq: u64,
    /// Time servicing softirqs
    softirq: u64,
    /// Stolen time, spent in other operating systems when running in a virtualized environment
    steal: u64,
    /// Time spent running a virtual CPU for guest operating systems under the control of the Linux
    /// kernel
    guest: u64,
    /// Time spent running a niced guest
    guest_nice: u64,
}

impl CpuSample {
    const MARKER: &'static str = "cpu";
    const FIELD_COUNT: usize = 10;

    fn from_fields(fields: [u64; 10]) -> Self {
        let [user, nice, system, idle, iowait, irq, softirq, steal, guest, guest_nice] = fields;

        CpuSample {
            user,
            nice,
            system,
            idle,
            iowait,
            irq,
            softirq,
            steal,
            guest,
            guest_nice,
        }
    }

    fn fields(&self) -> [u64; 10] {
        [
            self.user,
            self.nice,
            self.system,
            self.idle,
            self.iowait,
            self.irq,
            self.softirq,
            self.steal,
            self.guest,
            self.guest_nice,
        ]
    }

    /// Returns the sum of all counters
    ///
    /// Parsing guarantees that this sum fits in a `u64`
    pub fn total(&self) -> u64 {
        self.fields().iter().sum()
    }

    pub fn idle(&self) -> u64 {
        self.idle
    }

    /// Returns the ticks spent doing anything else than idling
    pub fn active(&self) -> u64 {
        self.total() - self.idle
    }
}

impl Parse for CpuSample {
    fn parse(token_parser: &TokenParser) -> Result<Self, ProcfsError> {
        let line = token_parser
            .line(0)
            .map_err(|_| ProcfsError::MalformedCpuLine("missing CPU line".to_string()))?;

        match line.split_first() {
            Some((&Self::MARKER, counters)) if counters.len() == Self::FIELD_COUNT => {
                let mut fields = [0; Self::FIELD_COUNT];

                for (field, counter) in fields.iter_mut().zip(counters) {
                    *field = counter
                        .parse()
                        .map_err(|_| ProcfsError::MalformedCpuLine(format!("invalid counter '{}'", counter)))?;
                }

                fields
                    .iter()
                    .try_fold(0u64, |total, field| total.checked_add(*field))
                    .ok_or_else(|| {
                        let err_msg = format!("counters overflow: {}", line.join(" "));
                        ProcfsError::MalformedCpuLine(err_msg)
                    })?;

                Ok(Self::from_fields(fields))
            }
            _ => Err(ProcfsError::MalformedCpuLine(line.join(" "))),
        }
    }
}

impl SystemData for CpuSample {
    fn filepath(proc_dir: &Path) -> PathBuf {
        proc_dir.join("stat")
    }
}

#[cfg(test)]
mod test_cpu_sample {
    use rstest::*;

    use super::*;

    #[test]
    fn test_parse_stat_file() {
        let content = "cpu  10132153 290696 3084719 46828483 16683 0 25195 0 175628 0
cpu0 1393280 32966 572056 13343292 6130 0 17875 0 23933 0"
            .to_string();

        let token_parser = TokenParser::new(&content);

        let cpu_sample = CpuSample::parse(&token_parser).expect("Could not read CpuSample");

        assert_eq!(
            cpu_sample,
            CpuSample::from_fields([10132153, 290696, 3084719, 46828483, 16683, 0, 25195, 0, 175628, 0])
        );
    }

    #[rstest]
    #[case("cpu 1 2 3 4 5 6 7 8 9")]
    #[case("cpu 1 2 3 4 5 6 7 8 9 10 11")]
    #[case("cpu0 1 2 3 4 5 6 7 8 9 10")]
    #[case("cpu 1 2 3 4 5 6 7 8 9 ten")]
    #[case("cpu 18446744073709551615 1 0 0 0 0 0 0 0 0")]
    #[case("")]
    fn test_should_reject_malformed_cpu_line(#[case] content: &str) {
        let ret = CpuSample::parse(&TokenParser::new(content));

        assert!(matches!(ret, Err(ProcfsError::MalformedCpuLine(_))));
    }

    #[test]
    fn test_jiffies() {
        let sample = CpuSample::from_fields([1, 2, 4, 8, 16, 32, 64, 128, 256, 512]);

        assert_eq!(sample.total(), 1023);
        assert_eq!(sample.idle(), 8);
        assert_eq!(sample.active(), 1015);
        assert_eq!(sample.active() + sample.idle(), sample.total());
    }

    #[test]
    fn test_parse_counters_summing_to_max_value() {
        let content = "cpu 18446744073709551614 1 0 0 0 0 0 0 0 0";

        let cpu_sample = CpuSample::parse(&TokenParser::new(content)).expect("Could not read CpuSample");

        assert_eq!(cpu_sample.total(), u64::MAX);
        assert_eq!(cpu_sample.active(), u64::MAX);
    }
}

/// Represents the process counters of `/proc/stat`
///
/// Counters are kept as raw tokens, so that an invalid value for one counter does not prevent reading
/// the other one
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ProcessCounts {
    /// Number of forks since boot
    processes: Option<String>,
    /// Number of processes in a runnable state
    procs_running: Option<String>,
}

impl ProcessCounts {
    pub fn processes(&self) -> Result<Option<u64>, ProcfsError> {
        Self::counter("processes", self.processes.as_deref())
    }

    pub fn procs_running(&self) -> Result<Option<u64>, ProcfsError> {
        Self::counter("procs_running", self.procs_running.as_deref())
    }

    fn counter(key: &str, raw: Option<&str>) -> Result<Option<u64>, ProcfsError> {
        raw.map(|token| {
            token.parse().map_err(|_| {
                let err_msg = format!("Invalid value '{}' for key {}", token, key);
                ProcfsError::InvalidFileContent(err_msg)
            })
        })
        .transpose()
    }
}

impl Parse for ProcessCounts {
    fn parse(token_parser: &TokenParser) -> Result<Self, ProcfsError> {
        let key_values = token_parser.key_values(Separator::Whitespace);
        let raw_counter = |key: &str| key_values.get(key).map(|kv| kv.tokens().next().unwrap_or("").to_string());

        Ok(ProcessCounts {
            processes: raw_counter("processes"),
            procs_running: raw_counter("procs_running"),
        })
    }
}

impl SystemData for ProcessCounts {
    fn filepath(proc_dir: &Path) -> PathBuf {
        proc_dir.join("stat")
    }
}

#[cfg(test)]
mod test_process_counts {
    use super::*;

    #[test]
    fn test_parse_stat_file() {
        let content = "cpu  10132153 290696 3084719 46828483 16683 0 25195 0 175628 0
intr 61913917 9 0 0 0 0 0 0 0 1 0 0 0 0
ctxt 130547830
btime 1697438230
processes 231857
procs_running 3
procs_blocked 0";

        let counts = ProcessCounts::parse(&TokenParser::new(content)).expect("Could not read ProcessCounts");

        assert_eq!(counts.processes().expect("Could not read processes"), Some(231857));
        assert_eq!(counts.procs_running().expect("Could not read procs_running"), Some(3));
    }

    #[test]
    fn test_parse_stat_file_without_counters() {
        let counts = ProcessCounts::parse(&TokenParser::new("cpu 1 2 3")).expect("Could not read ProcessCounts");

        assert!(matches!(counts.processes(), Ok(None)));
        assert!(matches!(counts.procs_running(), Ok(None)));
    }

    #[test]
    fn test_invalid_counter_should_not_affect_other_counter() {
        let counts = ProcessCounts::parse(&TokenParser::new("processes many\nprocs_running 3"))
            .expect("Could not read ProcessCounts");

        assert!(matches!(counts.processes(), Err(ProcfsError::InvalidFileContent(_))));
        assert!(matches!(counts.procs_running(), Ok(Some(3))));
    }

    #[test]
    fn test_counter_without_value_should_be_invalid() {
        let counts = ProcessCounts::parse(&TokenParser::new("processes\nprocs_running 3"))
            .expect("Could not read ProcessCounts");

        assert!(counts.processes().is_err());
    }
}

#[cfg(test)]
mod test_system_paths {
    use std::path::{Path, PathBuf};

    use crate::procfs::parsers::system::{CpuSample, MemInfo, Uptime};
    use crate::procfs::parsers::SystemData;

    #[test]
    fn test_paths_should_be_relative_to_proc_dir() {
        let proc_dir = Path::new("/fake/proc");

        assert_eq!(CpuSample::filepath(proc_dir), PathBuf::from("/fake/proc/stat"));
        assert_eq!(MemInfo::filepath(proc_dir), PathBuf::from("/fake/proc/meminfo"));
        assert_eq!(Uptime::filepath(proc_dir), PathBuf::from("/fake/proc/uptime"));
    }
}
