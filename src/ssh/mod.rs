use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Command,
};

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::config::{Endpoint, Resolver, Settings};
use crate::error::{TransferError, UploadError};
use crate::{CONNECTING, TRUCK};

/// What the user asked to copy, and where.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub device: String,
    pub file: String,
    pub remote: String,
}

/// A fully built `scp` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScpInvocation {
    pub program: String,
    pub port: u16,
    pub identity: PathBuf,
    pub recursive: bool,
    pub source: PathBuf,
    pub target: String,
}

impl ScpInvocation {
    pub fn new(
        settings: &Settings,
        endpoint: &Endpoint,
        source: &Path,
        remote: &str,
    ) -> Self {
        let remote = if remote.is_empty() { "/" } else { remote };
        ScpInvocation {
            program: settings.program.clone(),
            port: endpoint.port,
            identity: settings.identity_file.clone(),
            recursive: source.is_dir(),
            source: source.to_path_buf(),
            target: format!("{}@{}:{}", settings.user, endpoint.host, remote),
        }
    }

    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-P".into(),
            self.port.to_string().into(),
            "-i".into(),
            self.identity.clone().into(),
        ];
        if self.recursive {
            args.push("-r".into());
        }
        args.push(self.source.clone().into());
        args.push(self.target.clone().into());
        args
    }
}

/// Something that can carry out an [`ScpInvocation`].
pub trait Transport {
    fn transfer(&self, invocation: &ScpInvocation) -> Result<(), TransferError>;
}

/// Runs the external `scp` binary and waits for it.
#[derive(Debug, Default)]
pub struct ScpProcess;

impl Transport for ScpProcess {
    fn transfer(&self, invocation: &ScpInvocation) -> Result<(), TransferError> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
        );
        spinner.set_message(format!(
            "Copying {} to {}",
            invocation.source.display(),
            invocation.target
        ));
        spinner.tick();

        debug!(program = %invocation.program, args = ?invocation.args(), "running scp");
        // scp owns the terminal while it runs: prompts and its progress meter.
        let status = spinner.suspend(|| {
            Command::new(&invocation.program)
                .args(invocation.args())
                .status()
        });

        let status = status.map_err(|source| {
            spinner.finish_and_clear();
            TransferError::Spawn {
                program: invocation.program.clone(),
                source,
            }
        })?;
        if !status.success() {
            spinner.finish_and_clear();
            return Err(TransferError::Status(status));
        }
        spinner.finish_with_message(format!("Copied to {}", invocation.target));
        Ok(())
    }
}

/// Resolve the device, check the local path, then hand the copy to `transport`.
pub fn upload(
    request: &UploadRequest,
    settings: &Settings,
    transport: &dyn Transport,
) -> Result<ScpInvocation, UploadError> {
    println!(
        "{} {} Resolving device {} ...",
        style("[1/2]").bold().dim(),
        CONNECTING,
        request.device
    );
    let endpoint = Resolver::new(settings).resolve(&request.device)?;

    if request.file.is_empty() {
        return Err(UploadError::MissingFile);
    }
    let source = Path::new(&request.file);
    if !source.exists() {
        return Err(UploadError::NotFound(source.to_path_buf()));
    }

    let invocation = ScpInvocation::new(settings, &endpoint, source, &request.remote);
    println!(
        "{} {} Copying to {} ...",
        style("[2/2]").bold().dim(),
        TRUCK,
        invocation.target
    );
    transport.transfer(&invocation)?;
    info!(target = %invocation.target, "upload finished");

    Ok(invocation)
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, fs};

    use tempfile::TempDir;

    use super::*;
    use crate::error::ResolveError;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<ScpInvocation>>,
        fail: bool,
    }

    impl Transport for Recorder {
        fn transfer(&self, invocation: &ScpInvocation) -> Result<(), TransferError> {
            self.calls.borrow_mut().push(invocation.clone());
            if self.fail {
                return Err(TransferError::Spawn {
                    program: invocation.program.clone(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no scp"),
                });
            }
            Ok(())
        }
    }

    /// A home directory without `.ssh/config`, so built-in devices apply.
    fn home() -> (TempDir, Settings) {
        let dir = TempDir::new().unwrap();
        let settings = Settings::from_home(Some(dir.path().to_path_buf()));
        (dir, settings)
    }

    fn request(device: &str, file: &str, remote: &str) -> UploadRequest {
        UploadRequest {
            device: device.into(),
            file: file.into(),
            remote: remote.into(),
        }
    }

    #[test]
    fn nonexistent_source_never_reaches_transport() {
        let (dir, settings) = home();
        let missing = dir.path().join("nope.txt");
        let recorder = Recorder::default();

        let err = upload(
            &request("redmi", missing.to_str().unwrap(), "/sdcard/"),
            &settings,
            &recorder,
        )
        .unwrap_err();

        assert!(matches!(err, UploadError::NotFound(_)));
        assert!(!err.is_fatal());
        assert!(recorder.calls.borrow().is_empty());
    }

    #[test]
    fn empty_file_argument() {
        let (_dir, settings) = home();
        let recorder = Recorder::default();

        let err = upload(&request("redmi", "", ""), &settings, &recorder).unwrap_err();
        assert!(matches!(err, UploadError::MissingFile));
        assert!(recorder.calls.borrow().is_empty());
    }

    #[test]
    fn alias_missing_from_config_is_fatal() {
        let (dir, settings) = home();
        fs::create_dir(dir.path().join(".ssh")).unwrap();
        fs::write(
            dir.path().join(".ssh").join("config"),
            "Host nas\n    HostName 10.0.0.9\n",
        )
        .unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "hi").unwrap();
        let recorder = Recorder::default();

        let err = upload(
            &request("redmi", file.to_str().unwrap(), ""),
            &settings,
            &recorder,
        )
        .unwrap_err();
        assert!(matches!(
            &err,
            UploadError::Resolve(ResolveError::NotInConfig(alias)) if alias == "redmi"
        ));
        assert!(err.is_fatal());
        assert!(recorder.calls.borrow().is_empty());
    }

    #[test]
    fn resolution_failure_is_fatal() {
        let (dir, settings) = home();
        let file = dir.path().join("a.txt");
        fs::write(&file, "hi").unwrap();
        let recorder = Recorder::default();

        let err = upload(
            &request("laptop", file.to_str().unwrap(), ""),
            &settings,
            &recorder,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            UploadError::Resolve(ResolveError::InvalidDevice { .. })
        ));
        assert!(err.is_fatal());
        assert!(recorder.calls.borrow().is_empty());
    }

    #[test]
    fn empty_remote_defaults_to_root() {
        let (dir, settings) = home();
        let file = dir.path().join("a.txt");
        fs::write(&file, "hi").unwrap();
        let recorder = Recorder::default();

        let invocation = upload(
            &request("tcl", file.to_str().unwrap(), ""),
            &settings,
            &recorder,
        )
        .unwrap();

        assert_eq!(invocation.target, "root@192.168.1.12:/");
        assert_eq!(recorder.calls.borrow().as_slice(), [invocation]);
    }

    #[test]
    fn invocation_arguments() {
        let (dir, settings) = home();
        let file = dir.path().join("a.txt");
        fs::write(&file, "hi").unwrap();
        let recorder = Recorder::default();

        let invocation = upload(
            &request("tcl", file.to_str().unwrap(), "/sdcard/"),
            &settings,
            &recorder,
        )
        .unwrap();

        let expected: Vec<OsString> = vec![
            "-P".into(),
            "8022".into(),
            "-i".into(),
            dir.path().join(".ssh").join("server").into(),
            file.clone().into(),
            "root@192.168.1.12:/sdcard/".into(),
        ];
        assert_eq!(invocation.args(), expected);
    }

    #[test]
    fn directory_sources_are_copied_recursively() {
        let (dir, settings) = home();
        let folder = dir.path().join("folder");
        fs::create_dir(&folder).unwrap();
        let recorder = Recorder::default();

        let invocation = upload(
            &request("server", folder.to_str().unwrap(), "/ffp/home/root/"),
            &settings,
            &recorder,
        )
        .unwrap();

        assert!(invocation.recursive);
        assert!(invocation.args().contains(&OsString::from("-r")));
        assert_eq!(invocation.target, "root@192.168.1.20:/ffp/home/root/");
    }

    #[test]
    fn transfer_failure_is_reported_not_fatal() {
        let (dir, settings) = home();
        let file = dir.path().join("a.txt");
        fs::write(&file, "hi").unwrap();
        let recorder = Recorder {
            fail: true,
            ..Default::default()
        };

        let err = upload(
            &request("redmi", file.to_str().unwrap(), "/sdcard/"),
            &settings,
            &recorder,
        )
        .unwrap_err();

        assert!(matches!(err, UploadError::Transfer(_)));
        assert!(!err.is_fatal());
        assert!(err.to_string().starts_with("File upload failed:"));
        assert_eq!(recorder.calls.borrow().len(), 1);
    }

    #[test]
    fn spawn_failure_from_real_process() {
        let (dir, mut settings) = home();
        settings.program = dir
            .path()
            .join("definitely-not-scp")
            .to_string_lossy()
            .into_owned();
        let file = dir.path().join("a.txt");
        fs::write(&file, "hi").unwrap();

        let err = upload(
            &request("redmi", file.to_str().unwrap(), ""),
            &settings,
            &ScpProcess,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            UploadError::Transfer(TransferError::Spawn { .. })
        ));
    }
}
