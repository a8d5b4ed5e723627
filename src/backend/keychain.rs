use anyhow::{bail, Result};
use log::debug;
use std::process::Output;

use super::{non_empty, require_program, run, stdout_text, SecretBackend};
use crate::platform::Platform;

/// Service names Claude Code has used for its live credentials, newest first.
const SERVICE_CANDIDATES: [&str; 2] = ["Claude Code-credentials", "Claude Code"];

/// `security(1)` exit status for "item not found".
const ERR_SEC_ITEM_NOT_FOUND: i32 = 44;

/// Runs `security(1)` with the given arguments.
pub trait Security {
    fn security(&self, args: &[&str]) -> Result<Output>;
}

pub struct SecurityCli;

impl Security for SecurityCli {
    fn security(&self, args: &[&str]) -> Result<Output> {
        run("security", args, None)
    }
}

/// macOS login keychain, driven through `security(1)`.
pub struct KeychainBackend<S = SecurityCli> {
    user: String,
    cli: S,
}

impl KeychainBackend<SecurityCli> {
    pub fn connect() -> Result<Self> {
        require_program("macOS Keychain", "security")?;
        Ok(Self::with_cli(
            std::env::var("USER").unwrap_or_default(),
            SecurityCli,
        ))
    }
}

impl<S: Security> KeychainBackend<S> {
    pub(crate) fn with_cli(user: String, cli: S) -> Self {
        KeychainBackend { user, cli }
    }

    fn find(&self, service: &str) -> Result<Option<String>> {
        let output = self
            .cli
            .security(&["find-generic-password", "-s", service, "-w"])?;

        if !output.status.success() {
            if output.status.code() == Some(ERR_SEC_ITEM_NOT_FOUND) {
                return Ok(None);
            }
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("Failed to read keychain entry '{service}': {}", stderr.trim());
        }

        let mut val = stdout_text(&output, "security")?;
        // Strip trailing newline added by security(1)
        if val.ends_with('\n') {
            val.pop();
        }
        Ok(non_empty(val))
    }

    fn store(&self, service: &str, value: &str) -> Result<()> {
        let output = self.cli.security(&[
            "add-generic-password",
            "-U",
            "-s",
            service,
            "-a",
            &self.user,
            "-w",
            value,
        ])?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("Failed to write to keychain: {}", stderr.trim());
        }
        Ok(())
    }

    fn delete(&self, service: &str) -> Result<()> {
        let output = self
            .cli
            .security(&["delete-generic-password", "-s", service])?;
        if output.status.success() {
            return Ok(());
        }
        if output.status.code() == Some(ERR_SEC_ITEM_NOT_FOUND) {
            debug!("keychain entry '{service}' was not there to delete");
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("Failed to delete keychain entry '{service}': {}", stderr.trim());
    }
}

fn account_service(num: u32, email: &str) -> String {
    format!("Claude Code-Account-{num}-{email}")
}

impl<S: Security> SecretBackend for KeychainBackend<S> {
    fn kind(&self) -> Platform {
        Platform::MacOS
    }

    fn active_service_name(&self) -> Result<Option<String>> {
        for service in SERVICE_CANDIDATES {
            if self.find(service)?.is_some() {
                return Ok(Some(service.to_string()));
            }
        }
        Ok(None)
    }

    fn read_active(&self) -> Result<Option<String>> {
        match self.active_service_name()? {
            Some(service) => self.find(&service),
            None => Ok(None),
        }
    }

    fn write_active(&self, blob: &str, service_name: &str) -> Result<()> {
        if let Some(current) = self.active_service_name()? {
            if current != service_name {
                debug!("moving live credentials from '{current}' to '{service_name}'");
                self.delete(&current)?;
            }
        }
        self.store(service_name, blob)
    }

    fn read_account(&self, num: u32, email: &str) -> Result<Option<String>> {
        self.find(&account_service(num, email))
    }

    fn write_account(&self, num: u32, email: &str, blob: &str) -> Result<()> {
        self.store(&account_service(num, email), blob)
    }

    fn delete_account(&self, num: u32, email: &str) -> Result<()> {
        self.delete(&account_service(num, email))
    }
}
