use std::{env, io, process};

use clap::{CommandFactory, Parser};
use cmd::{Action, CmdArgs};
use config::Settings;
use console::{style, Emoji};
use error::UploadError;
use ssh::{ScpProcess, UploadRequest};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod cmd;
mod config;
mod error;
mod list;
mod ssh;

static TRUCK: Emoji<'_, '_> = Emoji("🚚  ", "");
static CONNECTING: Emoji<'_, '_> = Emoji("🔍  ", "");

fn main() {
    let cmds = CmdArgs::parse_from(env::args_os());
    init_logging(&cmds.log_level);

    let settings = cmds.settings(Settings::from_env());

    match cmds.action() {
        Action::Help => show_help(),
        Action::Version => show_version(),
        Action::List => {
            if let Err(e) = list::list(&mut io::stdout().lock(), &settings) {
                error!(%e, "failed to write device list");
            }
        }
        Action::Upload => {
            let request = UploadRequest {
                device: cmds.device.clone(),
                file: cmds.file.clone(),
                remote: cmds.remote.clone(),
            };
            match ssh::upload(&request, &settings, &ScpProcess) {
                Ok(_) => println!("{}", style("File uploaded successfully!").green()),
                Err(e) => report(e),
            }
        }
    }
}

/// Print an upload failure; only resolution failures change the exit code.
fn report(e: UploadError) {
    println!("{} {}", style("Error:").red().bold(), e);
    if e.is_fatal() {
        process::exit(1);
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn show_help() {
    if let Err(e) = CmdArgs::command().print_help() {
        error!(%e, "failed to print help");
    }
}

fn show_version() {
    println!("upload v{}", env!("CARGO_PKG_VERSION"));
    for author in env!("CARGO_PKG_AUTHORS").split(':') {
        println!("by {}", author);
    }
}
