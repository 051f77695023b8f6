use libc::{c_long, sysconf, _SC_CLK_TCK};

use crate::procfs::ProcfsError;

/// Returns the clock ticks value of the system
///
/// `sysconf` returns -1 when the value is unavailable, and process start times are divided by this value,
/// so any non-positive value is rejected
pub(crate) fn clock_ticks() -> Result<u64, ProcfsError> {
    let clock_ticks_value;

    unsafe {
        clock_ticks_value = sysconf(_SC_CLK_TCK);
    }

    ticks_from_sysconf(clock_ticks_value)
}

fn ticks_from_sysconf(value: c_long) -> Result<u64, ProcfsError> {
    match value {
        v if v <= 0 => Err(ProcfsError::SysconfError),
        v => Ok(v as u64),
    }
}
