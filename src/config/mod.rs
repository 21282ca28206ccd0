use std::{fmt, path::PathBuf};

use tracing::debug;

use crate::error::{ConfigError, ResolveError};

mod ssh_config;

pub use ssh_config::SshConfigFile;

pub const DEFAULT_PORT: u16 = 22;
pub const DEFAULT_USER: &str = "root";
pub const DEFAULT_PROGRAM: &str = "scp";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A device known by alias, as shown by `--list`.
///
/// The port is kept as written in the config file; it is only parsed once the
/// entry is resolved for an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub alias: String,
    pub host: String,
    pub port: Option<String>,
}

impl ConfigEntry {
    pub fn port_or_default(&self) -> String {
        self.port.clone().unwrap_or_else(|| DEFAULT_PORT.to_string())
    }

    pub fn endpoint(&self) -> Result<Endpoint, ResolveError> {
        let port = match &self.port {
            None => DEFAULT_PORT,
            Some(port) => port.parse().map_err(|_| ResolveError::InvalidPort {
                device: self.alias.clone(),
                port: port.clone(),
            })?,
        };
        Ok(Endpoint {
            host: self.host.clone(),
            port,
        })
    }
}

/// Anything that can map a device alias to an endpoint.
pub trait DeviceSource {
    fn lookup(&self, device: &str) -> Result<Endpoint, ResolveError>;

    /// Every complete entry, in the order it should be listed.
    fn entries(&self) -> Result<Vec<ConfigEntry>, ConfigError>;
}

/// Fallback devices used when there is no SSH config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTable {
    devices: Vec<ConfigEntry>,
}

impl DeviceTable {
    pub fn builtin() -> Self {
        let device = |alias: &str, host: &str, port: u16| ConfigEntry {
            alias: alias.to_string(),
            host: host.to_string(),
            port: Some(port.to_string()),
        };
        DeviceTable {
            devices: vec![
                device("tcl", "192.168.1.12", 8022),
                device("redmi", "192.168.1.15", 22),
                device("server", "192.168.1.20", 22),
            ],
        }
    }

    fn known_aliases(&self) -> String {
        let aliases: Vec<&str> = self.devices.iter().map(|d| d.alias.as_str()).collect();
        match aliases.split_last() {
            None => String::new(),
            Some((last, [])) => last.to_string(),
            Some((last, rest)) => format!("{}, or {}", rest.join(", "), last),
        }
    }
}

impl Default for DeviceTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DeviceSource for DeviceTable {
    fn lookup(&self, device: &str) -> Result<Endpoint, ResolveError> {
        self.devices
            .iter()
            .find(|d| d.alias == device)
            .ok_or_else(|| ResolveError::InvalidDevice {
                device: device.to_string(),
                known: self.known_aliases(),
            })?
            .endpoint()
    }

    /// Listed alphabetically; error messages keep definition order.
    fn entries(&self) -> Result<Vec<ConfigEntry>, ConfigError> {
        let mut devices = self.devices.clone();
        devices.sort_by(|a, b| a.alias.cmp(&b.alias));
        Ok(devices)
    }
}

/// Everything the resolver and the uploader need, gathered up front.
#[derive(Debug, Clone)]
pub struct Settings {
    /// `None` when no home directory could be determined.
    pub ssh_config: Option<PathBuf>,
    pub identity_file: PathBuf,
    pub user: String,
    pub program: String,
    pub builtin: DeviceTable,
}

impl Settings {
    pub fn from_home(home: Option<PathBuf>) -> Self {
        let ssh_dir = home.as_ref().map(|home| home.join(".ssh"));
        let identity_file = ssh_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("/.ssh"))
            .join("server");
        Settings {
            ssh_config: ssh_dir.map(|dir| dir.join("config")),
            identity_file,
            user: DEFAULT_USER.to_string(),
            program: DEFAULT_PROGRAM.to_string(),
            builtin: DeviceTable::builtin(),
        }
    }

    pub fn from_env() -> Self {
        Self::from_home(dirs::home_dir())
    }

    /// The SSH config file, provided it exists.
    pub fn ssh_config_file(&self) -> Result<SshConfigFile, ConfigError> {
        let path = self.ssh_config.as_ref().ok_or(ConfigError::HomeDir)?;
        match path.try_exists() {
            Ok(true) => Ok(SshConfigFile::new(path.clone())),
            Ok(false) => Err(ConfigError::NotFound(path.clone())),
            Err(source) => Err(ConfigError::Open {
                path: path.clone(),
                source,
            }),
        }
    }
}

/// Picks the SSH config file when present, the built-in table otherwise.
pub struct Resolver<'a> {
    settings: &'a Settings,
}

impl<'a> Resolver<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Resolver { settings }
    }

    pub fn resolve(&self, device: &str) -> Result<Endpoint, ResolveError> {
        let endpoint = match self.settings.ssh_config_file() {
            Ok(file) => file.lookup(device)?,
            Err(ConfigError::NotFound(path)) => {
                debug!(path = %path.display(), "no SSH config, using built-in devices");
                self.settings.builtin.lookup(device)?
            }
            Err(e) => return Err(e.into()),
        };
        debug!(device, %endpoint, "resolved device");
        Ok(endpoint)
    }
}
