//! Parsers to read structured data from the /proc directory

use std::fs::File;
use std::io::Read;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::str::SplitWhitespace;

use crate::procfs::{Pid, ProcfsError};

pub mod passwd;
pub mod process;
pub mod system;

/// Type which can be parsed from a `TokenParser`
pub trait Parse: Sized {
    fn parse(token_parser: &TokenParser) -> Result<Self, ProcfsError>;
}

/// Specialization of a `Parse` type which is not associated to a process (directly in `/proc`)
pub trait SystemData: Parse {
    fn filepath(proc_dir: &Path) -> PathBuf;
}

/// Specialization of a `Parse` type which is associated to a process (in `/proc/[pid]/`)
pub trait ProcessData: Parse {
    fn filepath(proc_dir: &Path, pid: Pid) -> PathBuf;
}

/// Opens the file at `filepath`, reads its whole content and parses it as a `D`
///
/// The file is closed before this function returns
pub fn read_file<D>(filepath: &Path) -> Result<D, ProcfsError>
where
    D: Parse,
{
    let file = File::open(filepath)?;
    DataReader::new(file).read()
}

pub fn read_system_data<D>(proc_dir: &Path) -> Result<D, ProcfsError>
where
    D: SystemData,
{
    read_file(D::filepath(proc_dir).as_path())
}

pub fn read_process_data<D>(proc_dir: &Path, pid: Pid) -> Result<D, ProcfsError>
where
    D: ProcessData,
{
    read_file(D::filepath(proc_dir, pid).as_path())
}

struct DataReader<R, D>
where
    R: Read,
    D: Parse,
{
    src: R,
    phantom: PhantomData<D>,
}

impl<R, D> DataReader<R, D>
where
    R: Read,
    D: Parse,
{
    pub fn new(src: R) -> Self {
        DataReader {
            src,
            phantom: PhantomData,
        }
    }

    pub fn read(&mut self) -> Result<D, ProcfsError> {
        let mut raw_content = Vec::new();
        self.src.read_to_end(&mut raw_content)?;

        // Command lines may hold arguments which are not valid UTF-8
        let content = String::from_utf8_lossy(&raw_content);
        let tp = TokenParser::new(&content);

        D::parse(&tp)
    }
}


/// Parses whitespace-separated tokens from a given multi-line string slice
pub struct TokenParser<'a> {
    content: &'a str,
    lines: Vec<Vec<&'a str>>,
}

impl<'a> TokenParser<'a> {
    /// Builds a token parser from a string slice
    /// # Arguments
    ///  * `content` The string slice from which to parse tokens
    pub fn new(content: &'a str) -> TokenParser<'a> {
        let lines = content
            .split('\n')
            .map(|line| line.split_whitespace().collect())
            .collect();

        TokenParser { content, lines }
    }

    /// Get the value of a token from the parser
    /// # Arguments
    ///  * `line_no`: The line number from which to retrieve the token
    ///  * `pos`: The position of the token in the line (e.g. 1 for token 'b' in line 'a b c')
    pub fn token<T>(&self, line_no: usize, pos: usize) -> Result<T, ProcfsError>
    where
        T: std::str::FromStr,
    {
        self.line(line_no)?
            .get(pos)
            .ok_or_else(|| {
                let err_msg = format!("Could not get token at line {} and position {}", line_no, pos);
                ProcfsError::InvalidFileFormat(err_msg)
            })?
            .parse::<T>()
            .map_err(|_| {
                let err_msg = format!("The token at line {} and position {} could not be parsed", line_no, pos);
                ProcfsError::InvalidFileContent(err_msg)
            })
    }

    /// Returns all the tokens of a line
    pub fn line(&self, line_no: usize) -> Result<&[&'a str], ProcfsError> {
        self.lines.get(line_no).map(Vec::as_slice).ok_or_else(|| {
            let err_msg = format!("Could not get data at line {}", line_no);
            ProcfsError::InvalidFileFormat(err_msg)
        })
    }

    /// Returns the content of a line, without splitting it into tokens
    pub fn raw_line(&self, line_no: usize) -> Option<&'a str> {
        self.content.split('\n').nth(line_no)
    }

    /// Iterates over the lines of the content, without splitting them into tokens
    pub fn raw_lines(&self) -> std::str::Lines<'a> {
        self.content.lines()
    }

    /// Reads the content as a list of `key<separator>value` lines
    pub fn key_values(&self, separator: Separator) -> KeyValueParser<'a> {
        KeyValueParser::new(self.content, separator)
    }
}


/// Character separating a key from its value in a `key<separator>value` line
#[derive(Eq, PartialEq, Debug, Copy, Clone)]
pub enum Separator {
    /// `MemTotal:    16314112 kB`
    Colon,
    /// `PRETTY_NAME="Debian GNU/Linux 12 (bookworm)"`
    Equals,
    /// `procs_running 3`
    Whitespace,
}

/// A single `key<separator>value` line, with both parts trimmed
#[derive(Eq, PartialEq, Debug, Copy, Clone)]
pub struct KeyValue<'a> {
    key: &'a str,
    value: &'a str,
}

impl<'a> KeyValue<'a> {
    pub fn key(&self) -> &'a str {
        self.key
    }

    pub fn value(&self) -> &'a str {
        self.value
    }

    /// Returns the value without its surrounding double quotes, if any
    pub fn unquoted(&self) -> &'a str {
        self.value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(self.value)
    }

    pub fn tokens(&self) -> SplitWhitespace<'a> {
        self.value.split_whitespace()
    }

    /// Get a whitespace-separated token of the value
    /// # Arguments
    ///  * `pos`: The position of the token in the value (e.g. 1 for token 'kB' in value '1024 kB')
    pub fn token<T>(&self, pos: usize) -> Result<T, ProcfsError>
    where
        T: std::str::FromStr,
    {
        self.tokens()
            .nth(pos)
            .ok_or_else(|| {
                let err_msg = format!("Key '{}' has no token at position {}", self.key, pos);
                ProcfsError::InvalidFileFormat(err_msg)
            })?
            .parse::<T>()
            .map_err(|_| {
                let err_msg = format!("Token {} of key '{}' could not be parsed", pos, self.key);
                ProcfsError::InvalidFileContent(err_msg)
            })
    }
}

/// Parses files made of one `key<separator>value` entry per line
///
/// Lines are only split when iterated over, so a scan can stop as soon as the wanted keys are found.
pub struct KeyValueParser<'a> {
    content: &'a str,
    separator: Separator,
}

impl<'a> KeyValueParser<'a> {
    pub fn new(content: &'a str, separator: Separator) -> Self {
        KeyValueParser { content, separator }
    }

    /// Iterates over the entries of the content, skipping lines without a separator
    pub fn entries(&self) -> impl Iterator<Item = KeyValue<'a>> + 'a {
        let separator = self.separator;

        self.content
            .lines()
            .filter_map(move |line| Self::split_line(line, separator))
    }

    /// Returns the first entry with the given key
    pub fn get(&self, key: &str) -> Option<KeyValue<'a>> {
        self.entries().find(|kv| kv.key == key)
    }

    fn split_line(line: &'a str, separator: Separator) -> Option<KeyValue<'a>> {
        let (key, value) = match separator {
            Separator::Colon => line.split_once(':')?,
            Separator::Equals => line.split_once('=')?,
            Separator::Whitespace => {
                let line = line.trim_start();
                line.split_once(char::is_whitespace).unwrap_or((line, ""))
            }
        };

        let key = key.trim();
        if key.is_empty() {
            return None;
        }

        Some(KeyValue {
            key,
            value: value.trim(),
        })
    }
}
