use std::{io, path::PathBuf, process::ExitStatus};

use thiserror::Error;

/// Failures reading the SSH client config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to get home directory")]
    HomeDir,

    #[error("~/.ssh/config not found.")]
    NotFound(PathBuf),

    #[error("Unable to open ~/.ssh/config")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures turning a device alias into an endpoint.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Invalid device '{device}'. Use {known}.")]
    InvalidDevice { device: String, known: String },

    #[error("Device '{0}' not found in ~/.ssh/config.")]
    NotInConfig(String),

    #[error("Device '{device}' has an invalid port '{port}' in ~/.ssh/config.")]
    InvalidPort { device: String, port: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Status(ExitStatus),
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("File or directory not specified.")]
    MissingFile,

    #[error("File or directory does not exist.")]
    NotFound(PathBuf),

    #[error("File upload failed: {0}")]
    Transfer(#[from] TransferError),
}

impl UploadError {
    /// Resolution failures end the process; everything else is only reported.
    pub fn is_fatal(&self) -> bool {
        matches!(self, UploadError::Resolve(_))
    }
}
