//! Platform secret storage behind one interface.
//!
//! Every backend has an "active" slot (the credentials Claude Code reads on
//! startup) and one slot per managed account, keyed by account number and
//! email. A missing entry reads as `None`; deleting a missing entry succeeds.
//! Whether the backend is reachable at all is checked once, in [`connect`].

mod dpapi;
mod keychain;
mod keyring;
#[cfg(test)]
pub mod memory;

use anyhow::{bail, Context, Result};
use log::debug;
use std::{
    fs, io,
    io::Write,
    path::PathBuf,
    process::{Command, Output, Stdio},
};

use crate::{error::SwitchError, files, paths::Paths, platform::Platform};

pub use dpapi::DpapiBackend;
pub use keychain::KeychainBackend;
pub use keyring::KeyringBackend;

/// Keychain service Claude Code currently stores its credentials under.
pub const DEFAULT_SERVICE: &str = "Claude Code-credentials";

pub trait SecretBackend {
    fn kind(&self) -> Platform;

    /// Name of the keychain service the live credentials sit under right now.
    fn active_service_name(&self) -> Result<Option<String>> {
        Ok(Some(DEFAULT_SERVICE.to_string()))
    }

    fn read_active(&self) -> Result<Option<String>>;

    /// Make `blob` the live credentials. `service_name` only matters where
    /// the live slot has more than one possible name.
    fn write_active(&self, blob: &str, service_name: &str) -> Result<()>;

    fn read_account(&self, num: u32, email: &str) -> Result<Option<String>>;

    fn write_account(&self, num: u32, email: &str, blob: &str) -> Result<()>;

    fn delete_account(&self, num: u32, email: &str) -> Result<()>;
}

/// Pick the backend for `platform` and make sure the programs it drives exist.
pub fn connect(platform: Platform, paths: &Paths) -> Result<Box<dyn SecretBackend>> {
    debug!("connecting to the {platform} secret backend");
    Ok(match platform {
        Platform::MacOS => Box::new(KeychainBackend::connect()?),
        Platform::Linux => Box::new(KeyringBackend::connect(paths)?),
        Platform::Wsl => Box::new(DpapiBackend::connect(paths)?),
    })
}

fn require_program(backend: &'static str, program: &'static str) -> Result<PathBuf, SwitchError> {
    which::which(program).map_err(|_| SwitchError::BackendUnavailable {
        backend,
        reason: format!("`{program}` was not found on PATH"),
    })
}

/// Run an external program to completion, optionally feeding it `stdin`.
/// Arguments go straight to the process, never through a shell.
fn run(program: &str, args: &[&str], stdin: Option<&[u8]>) -> Result<Output> {
    debug!("running {program} {}", args.first().copied().unwrap_or_default());

    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to run `{program}`"))?;

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(input)
            .with_context(|| format!("Failed to send input to `{program}`"))?;
    }

    child
        .wait_with_output()
        .with_context(|| format!("Failed to wait for `{program}`"))
}

fn stdout_text(output: &Output, program: &str) -> Result<String> {
    String::from_utf8(output.stdout.clone())
        .with_context(|| format!("`{program}` returned non-UTF8 data"))
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

/// `~/.claude/.credentials.json`, the live slot on Linux and WSL.
#[derive(Debug, Clone)]
pub(crate) struct LiveCredentialsFile {
    path: PathBuf,
}

impl LiveCredentialsFile {
    pub(crate) fn new(paths: &Paths) -> Self {
        LiveCredentialsFile {
            path: paths.live_credentials_path(),
        }
    }

    fn read(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(non_empty(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e)
                .with_context(|| format!("Cannot read credentials from {}", self.path.display())),
        }
    }

    fn write(&self, blob: &str) -> Result<()> {
        let Some(dir) = self.path.parent() else {
            bail!("Invalid credentials path {}", self.path.display());
        };
        files::create_private_dir(dir)?;
        files::write_private(&self.path, blob.as_bytes())
    }
}
