use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::config::Settings;

const AFTER_HELP: &str = "\
Example: upload --device redmi --file ./file.txt --remote /sdcard/
Example: upload -d server -f ./folder --remote /ffp/home/root/";

/// Upload a file to a remote server.
#[derive(Parser, Debug)]
#[command(
    name = "upload",
    author,
    version,
    disable_help_flag = true,
    disable_version_flag = true,
    after_help = AFTER_HELP
)]
pub struct CmdArgs {
    /// Show this help message
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub help: bool,

    /// Show version information
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub version: bool,

    /// Device to upload to: tcl, redmi, server, or any Host alias in ~/.ssh/config
    #[arg(short, long, default_value = "")]
    pub device: String,

    /// Remote directory to upload to
    #[arg(short, long, default_value = "")]
    pub remote: String,

    /// File or folder to upload
    #[arg(short, long, default_value = "")]
    pub file: String,

    /// List available devices for upload
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub list: bool,

    /// SSH client config to read instead of ~/.ssh/config
    #[arg(long, value_name = "PATH")]
    pub ssh_config: Option<PathBuf>,

    /// Identity file passed to scp
    #[arg(short, long, value_name = "PATH")]
    pub identity: Option<PathBuf>,

    /// Remote user to log in as
    #[arg(short, long)]
    pub user: Option<String>,

    /// scp program to run
    #[arg(long, value_name = "PROGRAM")]
    pub scp: Option<String>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

/// What a parsed command line asks for, highest priority first.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    Help,
    Version,
    List,
    Upload,
}

impl CmdArgs {
    pub fn action(&self) -> Action {
        if self.help {
            Action::Help
        } else if self.version {
            Action::Version
        } else if self.list {
            Action::List
        } else if self.device.is_empty() || self.file.is_empty() {
            Action::Help
        } else {
            Action::Upload
        }
    }

    /// Apply command line overrides on top of `settings`.
    pub fn settings(&self, mut settings: Settings) -> Settings {
        if let Some(path) = &self.ssh_config {
            settings.ssh_config = Some(path.clone());
        }
        if let Some(identity) = &self.identity {
            settings.identity_file = identity.clone();
        }
        if let Some(user) = &self.user {
            settings.user = user.clone();
        }
        if let Some(program) = &self.scp {
            settings.program = program.clone();
        }
        settings
    }
}
