//! This module reads system and process metrics from the `/proc` filesystem of Linux hosts

use std::io;

use thiserror::Error;

mod libc;
pub mod parsers;
pub mod reader;

/// Represents the unique ID of a running process
///
/// On Linux 64 bits, the maximum value for a PID is 4194304, hence u32
pub type Pid = u32;

#[derive(Error, Debug)]
pub enum ProcfsError {
    #[error(transparent)]
    IOError(#[from] io::Error),
    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),
    #[error("Invalid file content: {0}")]
    InvalidFileContent(String),
    #[error("Malformed CPU line: {0}")]
    MalformedCpuLine(String),
    #[error("Required keys not found: {0:?}")]
    MissingKeys(Vec<&'static str>),
    #[error("Unexpected unit '{unit}' for key '{key}'")]
    UnexpectedUnit { key: &'static str, unit: String },
    #[error("Could not retrieve system configuration value")]
    SysconfError,
}

impl ProcfsError {
    /// Indicates if this error was caused by a file which could not be accessed, rather than by a file
    /// with invalid content
    ///
    /// Files under `/proc/[pid]` disappear when their process exits, which is not an exceptional situation
    pub fn is_absence(&self) -> bool {
        matches!(self, ProcfsError::IOError(_))
    }
}

#[cfg(test)]
mod test_procfs_error {
    use std::io;

    use crate::procfs::ProcfsError;

    #[test]
    fn test_io_error_should_be_absence() {
        let err: ProcfsError = io::Error::new(io::ErrorKind::NotFound, "gone").into();

        assert!(err.is_absence());
    }

    #[test]
    fn test_content_error_should_not_be_absence() {
        assert!(!ProcfsError::MalformedCpuLine("cpu 1 2".to_string()).is_absence());
        assert!(!ProcfsError::MissingKeys(vec!["MemTotal"]).is_absence());
    }
}
