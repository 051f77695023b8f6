use log::warn;

use crate::procfs::parsers::{Parse, TokenParser};
use crate::procfs::ProcfsError;

/// A single account of the `/etc/passwd` table
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Account {
    name: String,
    uid: String,
}

impl Account {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Represents data from `/etc/passwd`
///
/// Each line has the form `name:password:uid:gid:gecos:home:shell`
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Passwd {
    accounts: Vec<Account>,
}

impl Passwd {
    /// Returns the name of the first account whose UID is exactly `uid`
    pub fn user_name(&self, uid: &str) -> Option<&str> {
        self.accounts
            .iter()
            .find(|account| account.uid == uid)
            .map(Account::name)
    }

    fn parse_line(line: &str) -> Option<Account> {
        let mut fields = line.split(':');

        let name = fields.next()?;
        let uid = fields.nth(1)?;

        Some(Account {
            name: name.to_string(),
            uid: uid.to_string(),
        })
    }
}

impl Parse for Passwd {
    fn parse(token_parser: &TokenParser) -> Result<Self, ProcfsError> {
        let mut accounts = Vec::new();

        for (line_no, line) in token_parser.raw_lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match Self::parse_line(line) {
                Some(account) => accounts.push(account),
                None => warn!("Skipping malformed account entry at line {}", line_no + 1),
            }
        }

        Ok(Passwd { accounts })
    }
}
