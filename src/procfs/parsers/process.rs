use std::path::{Path, PathBuf};

use crate::procfs::parsers::{Parse, ProcessData, Separator, TokenParser};
use crate::procfs::{Pid, ProcfsError};

fn process_filepath(proc_dir: &Path, pid: Pid, filename: &str) -> PathBuf {
    let mut path = proc_dir.to_path_buf();

    path.push(pid.to_string());
    path.push(filename);

    path
}

/// Represents data from `/proc/[PID]/cmdline`
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Cmdline {
    command: String,
}

impl Cmdline {
    /// Returns the command line of the process, with its arguments still separated by NUL characters
    pub fn into_command(self) -> String {
        self.command
    }
}

impl Parse for Cmdline {
    fn parse(token_parser: &TokenParser) -> Result<Self, ProcfsError> {
        Ok(Cmdline {
            command: token_parser.raw_line(0).unwrap_or_default().to_string(),
        })
    }
}

impl ProcessData for Cmdline {
    fn filepath(proc_dir: &Path, pid: Pid) -> PathBuf {
        process_filepath(proc_dir, pid, "cmdline")
    }
}


/// Represents data from `/proc/[PID]/stat`
///
/// Fields are identified by their number as documented in proc(5), starting at 1 for the PID
#[derive(Eq, PartialEq, Debug, Copy, Clone, Default)]
pub struct PidStat {
    /// Time spent by the process in user mode
    // scanf format: %lu
    utime: u64,
    /// Time spent by the process in kernel mode
    // scanf format: %lu
    stime: u64,
    /// Time spent by the process waiting for children processes in user mode
    // scanf format: %ld
    cutime: u64,
    /// Time spent by the process waiting for children processes in kernel mode
    // scanf format: %ld
    cstime: u64,
    /// The time the process started after system boot, expressed in clock ticks
    // scanf format: %llu
    starttime: u64,
}

impl PidStat {
    /// The state field, which directly follows the parenthesized command name
    const STATE_FIELD: usize = 3;
    const UTIME_FIELD: usize = 14;
    const STIME_FIELD: usize = 15;
    const CUTIME_FIELD: usize = 16;
    const CSTIME_FIELD: usize = 17;
    const STARTTIME_FIELD: usize = 22;

    #[cfg(test)]
    pub fn new(utime: u64, stime: u64, cutime: u64, cstime: u64, starttime: u64) -> Self {
        PidStat {
            utime,
            stime,
            cutime,
            cstime,
            starttime,
        }
    }

    /// Time spent by the process and its waited-for children, in user and kernel mode
    ///
    /// Parsing guarantees that this sum fits in a `u64`
    pub fn running_time(&self) -> u64 {
        self.utime + self.stime + self.cutime + self.cstime
    }

    /// Indicates how long after boot time the process started
    /// This value is expressed in clock ticks. It must be divided by `sysconf(_SC_CLK_TCK)` to get its value in seconds
    pub fn starttime(&self) -> u64 {
        self.starttime
    }

    /// Returns the fields following the command name, the first one being `STATE_FIELD`
    ///
    /// The command name may contain spaces and parentheses, so the last closing parenthesis marks its end
    fn fields_after_command<'a>(token_parser: &TokenParser<'a>) -> Result<Vec<&'a str>, ProcfsError> {
        let line = token_parser.raw_line(0).unwrap_or_default();

        let (_, remainder) = line
            .rsplit_once(')')
            .ok_or_else(|| ProcfsError::InvalidFileFormat(format!("No command name found in stat line '{}'", line)))?;

        let fields: Vec<&str> = remainder.split_whitespace().collect();
        let expected_len = Self::STARTTIME_FIELD - Self::STATE_FIELD + 1;

        if fields.len() < expected_len {
            let err_msg = format!(
                "Stat line has {} fields after command, expected at least {}",
                fields.len(),
                expected_len
            );
            return Err(ProcfsError::InvalidFileFormat(err_msg));
        }

        Ok(fields)
    }

    fn field(fields: &[&str], field_no: usize) -> Result<u64, ProcfsError> {
        let token = fields[field_no - Self::STATE_FIELD];

        token.parse().map_err(|_| {
            let err_msg = format!("Field {} of stat line is invalid: '{}'", field_no, token);
            ProcfsError::InvalidFileContent(err_msg)
        })
    }
}

impl Parse for PidStat {
    fn parse(token_parser: &TokenParser) -> Result<Self, ProcfsError> {
        let fields = Self::fields_after_command(token_parser)?;

        let pid_stat = PidStat {
            utime: Self::field(&fields, Self::UTIME_FIELD)?,
            stime: Self::field(&fields, Self::STIME_FIELD)?,
            cutime: Self::field(&fields, Self::CUTIME_FIELD)?,
            cstime: Self::field(&fields, Self::CSTIME_FIELD)?,
            starttime: Self::field(&fields, Self::STARTTIME_FIELD)?,
        };

        [pid_stat.stime, pid_stat.cutime, pid_stat.cstime]
            .iter()
            .try_fold(pid_stat.utime, |total, time| total.checked_add(*time))
            .ok_or_else(|| ProcfsError::InvalidFileContent("Process running time overflows".to_string()))?;

        Ok(pid_stat)
    }
}

impl ProcessData for PidStat {
    fn filepath(proc_dir: &Path, pid: Pid) -> PathBuf {
        process_filepath(proc_dir, pid, "stat")
    }
}


/// Represents data from `/proc/[PID]/status`
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct PidStatus {
    /// Virtual memory size, along with the unit it is expressed in
    vm_size: Option<(u64, String)>,
    /// Real user ID of the owner of the process
    uid: Option<String>,
}

impl PidStatus {
    const VM_SIZE_KEY: &'static str = "VmSize";
    const UID_KEY: &'static str = "Uid";
    const EXPECTED_UNIT: &'static str = "kB";

    /// Returns the virtual memory size of the process in MB, or `None` if it is not reported
    ///
    /// Kernel threads do not report any memory size
    pub fn vm_size_mb(&self) -> Result<Option<u64>, ProcfsError> {
        match &self.vm_size {
            None => Ok(None),
            Some((size, unit)) if unit == Self::EXPECTED_UNIT => Ok(Some(size / 1024)),
            Some((_, unit)) => Err(ProcfsError::UnexpectedUnit {
                key: Self::VM_SIZE_KEY,
                unit: unit.clone(),
            }),
        }
    }

    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }
}

impl Parse for PidStatus {
    fn parse(token_parser: &TokenParser) -> Result<Self, ProcfsError> {
        let mut status = PidStatus::default();

        for kv in token_parser.key_values(Separator::Colon).entries() {
            match kv.key() {
                Self::VM_SIZE_KEY => {
                    let size = kv.token(0)?;
                    let unit = kv.tokens().nth(1).unwrap_or_default().to_string();
                    status.vm_size = Some((size, unit));
                }
                Self::UID_KEY => status.uid = kv.tokens().next().map(str::to_string),
                _ => continue,
            }

            if status.vm_size.is_some() && status.uid.is_some() {
                break;
            }
        }

        Ok(status)
    }
}

impl ProcessData for PidStatus {
    fn filepath(proc_dir: &Path, pid: Pid) -> PathBuf {
        process_filepath(proc_dir, pid, "status")
    }
}

#[cfg(test)]
mod test_pid_status {
    use rstest::*;

    use super::*;

    const STATUS_CONTENT: &str = "Name:\tbash
Umask:\t0022
State:\tS (sleeping)
Tgid:\t2211
Pid:\t2211
PPid:\t2203
Uid:\t1000\t1000\t1000\t1000
Gid:\t1000\t1000\t1000\t1000
VmPeak:\t   11556 kB
VmSize:\t    4096 kB
VmRSS:\t    5432 kB";

    #[test]
    fn test_parse_status_file() {
        let status = PidStatus::parse(&TokenParser::new(STATUS_CONTENT)).expect("Could not read PidStatus");

        assert_eq!(status.uid(), Some("1000"));
        assert!(matches!(status.vm_size_mb(), Ok(Some(4))));
    }

    #[test]
    fn test_parse_kernel_thread_status_file() {
        let content = "Name:\tkthreadd\nUid:\t0\t0\t0\t0\n";

        let status = PidStatus::parse(&TokenParser::new(content)).expect("Could not read PidStatus");

        assert_eq!(status.uid(), Some("0"));
        assert!(matches!(status.vm_size_mb(), Ok(None)));
    }

    #[rstest]
    #[case("VmSize:\t 2048 mB")]
    #[case("VmSize:\t 2048")]
    fn test_vm_size_with_unexpected_unit(#[case] content: &str) {
        let status = PidStatus::parse(&TokenParser::new(content)).expect("Could not read PidStatus");

        assert!(matches!(
            status.vm_size_mb(),
            Err(ProcfsError::UnexpectedUnit { key: "VmSize", .. })
        ));
    }

    #[rstest]
    #[case(1023, 0)]
    #[case(1024, 1)]
    #[case(1048575, 1023)]
    fn test_vm_size_should_be_truncated_to_mb(#[case] size_kb: u64, #[case] expected_mb: u64) {
        let content = format!("VmSize:\t{} kB", size_kb);

        let status = PidStatus::parse(&TokenParser::new(&content)).expect("Could not read PidStatus");

        assert_eq!(status.vm_size_mb().ok().flatten(), Some(expected_mb));
    }

    #[test]
    fn filepath_should_contain_pid() {
        assert_eq!(
            PidStatus::filepath(Path::new("/proc"), 42),
            PathBuf::from("/proc/42/status")
        );
    }
}
