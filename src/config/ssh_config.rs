use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use super::{ConfigEntry, DeviceSource, Endpoint};
use crate::error::{ConfigError, ResolveError};

/// The user's `~/.ssh/config`, re-read on every call.
///
/// Only `Host`, `HostName` and `Port` are understood. `Include`, `Match` and
/// wildcard patterns are not; a `Host` line's argument is taken verbatim as
/// the alias.
#[derive(Debug, Clone)]
pub struct SshConfigFile {
    path: PathBuf,
}

impl SshConfigFile {
    pub fn new(path: PathBuf) -> Self {
        SshConfigFile { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<BufReader<File>, ConfigError> {
        File::open(&self.path)
            .map(BufReader::new)
            .map_err(|source| self.open_error(source))
    }

    fn open_error(&self, source: io::Error) -> ConfigError {
        warn!(path = %self.path.display(), %source, "failed to read SSH config");
        ConfigError::Open {
            path: self.path.clone(),
            source,
        }
    }
}

impl DeviceSource for SshConfigFile {
    fn lookup(&self, device: &str) -> Result<Endpoint, ResolveError> {
        let reader = self.open()?;
        let entry = find_entry(reader, device).map_err(|e| self.open_error(e))?;
        match entry {
            Some(entry) => {
                debug!(device, host = %entry.host, port = ?entry.port, "found SSH config entry");
                entry.endpoint()
            }
            None => Err(ResolveError::NotInConfig(device.to_string())),
        }
    }

    fn entries(&self) -> Result<Vec<ConfigEntry>, ConfigError> {
        let reader = self.open()?;
        parse_entries(reader).map_err(|e| self.open_error(e))
    }
}

/// The three directives we act on; anything else is skipped.
#[derive(Debug, PartialEq, Eq)]
enum Directive<'a> {
    Host(&'a str),
    HostName(&'a str),
    Port(&'a str),
    Other,
}

/// Classify one config line. Blank lines, comments and keywords without an
/// argument yield `None`.
fn parse_line(line: &str) -> Option<Directive<'_>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    // Keyword and argument are separated by whitespace or a single `=`.
    let split = line.find(|c: char| c.is_whitespace() || c == '=')?;
    let (keyword, rest) = line.split_at(split);
    let rest = rest.trim_start();
    let argument = rest.strip_prefix('=').unwrap_or(rest).trim();
    if argument.is_empty() {
        return None;
    }

    let directive = match keyword.to_ascii_lowercase().as_str() {
        "host" => Directive::Host(argument),
        "hostname" => Directive::HostName(argument),
        "port" => Directive::Port(argument),
        _ => Directive::Other,
    };
    Some(directive)
}

/// Fields gathered for a `Host` alias.
#[derive(Debug)]
struct Candidate {
    alias: String,
    host: Option<String>,
    port: Option<String>,
}

impl Candidate {
    fn new(alias: &str) -> Self {
        Candidate {
            alias: alias.to_string(),
            host: None,
            port: None,
        }
    }

    /// Apply a field directive. A later value replaces an earlier one.
    fn apply(&mut self, directive: Directive<'_>) {
        match directive {
            Directive::HostName(host) => self.host = Some(host.to_string()),
            Directive::Port(port) => self.port = Some(port.to_string()),
            _ => {}
        }
    }

    fn is_full(&self) -> bool {
        self.host.is_some() && self.port.is_some()
    }

    /// An entry counts once it has a host; a missing port is filled in later.
    fn complete(self) -> Option<ConfigEntry> {
        let host = self.host?;
        Some(ConfigEntry {
            alias: self.alias,
            host,
            port: self.port,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    Seeking,
    Collecting,
}

/// Scan forward, collecting fields from every block whose alias is `device`,
/// until both a host and a port are known.
///
/// Fields carry over between blocks with the same alias, so a `Port` in one
/// block and a `HostName` in a later one combine into a single entry.
fn find_entry(reader: impl BufRead, device: &str) -> io::Result<Option<ConfigEntry>> {
    let mut state = ParserState::Seeking;
    let mut candidate = Candidate::new(device);

    for line in reader.lines() {
        let line = line?;
        let Some(directive) = parse_line(&line) else {
            continue;
        };

        match directive {
            Directive::Host(alias) if alias == device => state = ParserState::Collecting,
            Directive::Host(_) => state = ParserState::Seeking,
            field if state == ParserState::Collecting => {
                candidate.apply(field);
                if candidate.is_full() {
                    break;
                }
            }
            _ => {}
        }
    }

    Ok(candidate.complete())
}

/// Every complete block in file order, including the one still open at EOF.
/// Blocks without a `HostName` are dropped.
fn parse_entries(reader: impl BufRead) -> io::Result<Vec<ConfigEntry>> {
    let mut entries = Vec::new();
    let mut current: Option<Candidate> = None;

    for line in reader.lines() {
        let line = line?;
        match parse_line(&line) {
            Some(Directive::Host(alias)) => {
                entries.extend(current.take().and_then(Candidate::complete));
                current = Some(Candidate::new(alias));
            }
            Some(directive) => {
                if let Some(candidate) = current.as_mut() {
                    candidate.apply(directive);
                }
            }
            None => {}
        }
    }
    entries.extend(current.and_then(Candidate::complete));

    Ok(entries)
}
