use anyhow::{bail, Result};
use log::debug;
use std::process::Output;

use super::{non_empty, require_program, run, stdout_text, LiveCredentialsFile, SecretBackend};
use crate::{error::SwitchError, paths::Paths, platform::Platform};

const BACKEND: &str = "Secret Service keyring";

/// Value of the `service` attribute on every entry ccswitch stores.
const SERVICE_ATTR: &str = "ccswitch";

/// Freedesktop Secret Service (GNOME Keyring, KWallet) through `secret-tool`.
/// The live slot is Claude Code's credentials file.
pub struct KeyringBackend {
    live: LiveCredentialsFile,
}

impl KeyringBackend {
    pub fn connect(paths: &Paths) -> Result<Self> {
        require_program(BACKEND, "secret-tool")?;

        // Account 0 is never allocated, so this lookup only ever answers
        // "no match" from a live daemon.
        let output = secret_tool("lookup", &[], 0, "", None)?;
        if let Some(detail) = service_failure(output.status.success(), &output.stderr) {
            return Err(SwitchError::BackendUnavailable {
                backend: BACKEND,
                reason: format!("cannot reach the Secret Service ({detail})"),
            }
            .into());
        }

        Ok(KeyringBackend {
            live: LiveCredentialsFile::new(paths),
        })
    }
}

/// secret-tool exits 1 with nothing on stderr when no item matches. Anything
/// it prints on stderr means the Secret Service itself failed.
fn service_failure(success: bool, stderr: &[u8]) -> Option<String> {
    if success {
        return None;
    }
    let stderr = String::from_utf8_lossy(stderr);
    let detail = stderr.trim();
    (!detail.is_empty()).then(|| detail.to_string())
}

fn attributes(num: u32, email: &str) -> [String; 6] {
    [
        "service".to_string(),
        SERVICE_ATTR.to_string(),
        "account".to_string(),
        num.to_string(),
        "email".to_string(),
        email.to_string(),
    ]
}

fn secret_tool(
    verb: &str,
    extra: &[&str],
    num: u32,
    email: &str,
    stdin: Option<&[u8]>,
) -> Result<Output> {
    let attrs = attributes(num, email);
    let mut args = vec![verb];
    args.extend_from_slice(extra);
    args.extend(attrs.iter().map(String::as_str));
    run("secret-tool", &args, stdin)
}

impl SecretBackend for KeyringBackend {
    fn kind(&self) -> Platform {
        Platform::Linux
    }

    fn read_active(&self) -> Result<Option<String>> {
        self.live.read()
    }

    fn write_active(&self, blob: &str, _service_name: &str) -> Result<()> {
        self.live.write(blob)
    }

    fn read_account(&self, num: u32, email: &str) -> Result<Option<String>> {
        let output = secret_tool("lookup", &[], num, email, None)?;
        if let Some(detail) = service_failure(output.status.success(), &output.stderr) {
            bail!("Failed to read keyring entry for Account {num}: {detail}");
        }
        if !output.status.success() {
            return Ok(None);
        }
        Ok(non_empty(stdout_text(&output, "secret-tool")?))
    }

    fn write_account(&self, num: u32, email: &str, blob: &str) -> Result<()> {
        let label = format!("--label=Claude Code account {num} ({email})");
        let output = secret_tool("store", &[label.as_str()], num, email, Some(blob.as_bytes()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("Failed to write to keyring: {}", stderr.trim());
        }
        Ok(())
    }

    fn delete_account(&self, num: u32, email: &str) -> Result<()> {
        let output = secret_tool("clear", &[], num, email, None)?;
        if let Some(detail) = service_failure(output.status.success(), &output.stderr) {
            bail!("Failed to delete keyring entry for Account {num}: {detail}");
        }
        if !output.status.success() {
            debug!("keyring entry for Account {num} was not there to delete");
        }
        Ok(())
    }
}
