use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::debug;
use std::{
    fs, io,
    path::{Path, PathBuf},
};

use super::{require_program, run, stdout_text, LiveCredentialsFile, SecretBackend};
use crate::{files, paths::Paths, platform::Platform};

/// Encrypts and decrypts bytes for the current Windows user.
pub trait Protector {
    fn protect(&self, plain: &[u8]) -> Result<Vec<u8>>;
    fn unprotect(&self, cipher: &[u8]) -> Result<Vec<u8>>;
}

const POWERSHELL: &str = "powershell.exe";

/// Reads the file named by its second argument, runs it through DPAPI in the
/// direction named by its first, and prints the result as base64.
const DPAPI_SCRIPT: &str = r#"param([string]$Mode, [string]$InPath)
$ErrorActionPreference = 'Stop'
Add-Type -AssemblyName System.Security
$scope = [System.Security.Cryptography.DataProtectionScope]::CurrentUser
$data = [System.IO.File]::ReadAllBytes($InPath)
if ($Mode -eq 'protect') {
    $out = [System.Security.Cryptography.ProtectedData]::Protect($data, $null, $scope)
} else {
    $out = [System.Security.Cryptography.ProtectedData]::Unprotect($data, $null, $scope)
}
[Console]::Out.Write([Convert]::ToBase64String($out))
"#;

/// DPAPI through Windows PowerShell. Input never appears on a command line:
/// the script and its payload are written to an owner-only temp directory
/// and only their paths are passed.
pub struct PowerShellProtector;

impl PowerShellProtector {
    fn transform(&self, mode: &str, input: &[u8]) -> Result<Vec<u8>> {
        let dir = tempfile::Builder::new()
            .prefix("ccswitch-dpapi-")
            .tempdir()
            .context("Cannot create a temp directory for DPAPI")?;

        let script = dir.path().join("dpapi.ps1");
        let payload = dir.path().join("payload.bin");
        files::write_private(&script, DPAPI_SCRIPT.as_bytes())?;
        files::write_private(&payload, input)?;

        let script_win = windows_path(&script)?;
        let payload_win = windows_path(&payload)?;

        let output = run(
            POWERSHELL,
            &[
                "-NoProfile",
                "-NonInteractive",
                "-ExecutionPolicy",
                "Bypass",
                "-File",
                &script_win,
                mode,
                &payload_win,
            ],
            None,
        )?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("DPAPI {mode} failed: {}", stderr.trim());
        }

        let encoded = stdout_text(&output, POWERSHELL)?;
        STANDARD
            .decode(encoded.trim())
            .with_context(|| format!("DPAPI {mode} returned malformed output"))
    }
}

impl Protector for PowerShellProtector {
    fn protect(&self, plain: &[u8]) -> Result<Vec<u8>> {
        self.transform("protect", plain)
    }

    fn unprotect(&self, cipher: &[u8]) -> Result<Vec<u8>> {
        self.transform("unprotect", cipher)
    }
}

fn wslpath(flag: &str, path: &str) -> Result<String> {
    let output = run("wslpath", &[flag, path], None)?;
    if !output.status.success() {
        bail!("wslpath could not convert {path}");
    }
    Ok(stdout_text(&output, "wslpath")?.trim().to_string())
}

fn windows_path(path: &Path) -> Result<String> {
    let Some(s) = path.to_str() else {
        bail!("Path is not valid UTF-8: {}", path.display());
    };
    wslpath("-w", s)
}

/// `%USERPROFILE%` of the Windows user, as a path inside WSL.
fn windows_profile_dir() -> Result<PathBuf> {
    let output = run("cmd.exe", &["/c", "echo %USERPROFILE%"], None)?;
    let profile = stdout_text(&output, "cmd.exe")?.trim().to_string();
    if !output.status.success() || profile.is_empty() || profile.contains('%') {
        bail!("Cannot resolve the Windows user profile directory");
    }
    Ok(PathBuf::from(wslpath("-u", &profile)?))
}

/// WSL: per-account credentials are DPAPI-encrypted files in the Windows
/// profile, so they stay bound to the Windows user. The live slot is Claude
/// Code's credentials file inside WSL.
pub struct DpapiBackend<P = PowerShellProtector> {
    store_dir: PathBuf,
    live: LiveCredentialsFile,
    protector: P,
}

impl DpapiBackend<PowerShellProtector> {
    pub fn connect(paths: &Paths) -> Result<Self> {
        for program in [POWERSHELL, "cmd.exe", "wslpath"] {
            require_program("WSL DPAPI", program)?;
        }
        let store_dir = windows_profile_dir()?
            .join(".claude-switch-backup")
            .join("credentials");
        files::create_private_dir(&store_dir)?;
        debug!("DPAPI credential store at {}", store_dir.display());

        Ok(Self::with_parts(
            store_dir,
            LiveCredentialsFile::new(paths),
            PowerShellProtector,
        ))
    }
}

impl<P: Protector> DpapiBackend<P> {
    pub(crate) fn with_parts(store_dir: PathBuf, live: LiveCredentialsFile, protector: P) -> Self {
        DpapiBackend {
            store_dir,
            live,
            protector,
        }
    }

    fn entry_path(&self, num: u32, email: &str) -> PathBuf {
        self.store_dir
            .join(format!(".claude-credentials-{num}-{email}.dpapi"))
    }
}

impl<P: Protector> SecretBackend for DpapiBackend<P> {
    fn kind(&self) -> Platform {
        Platform::Wsl
    }

    fn read_active(&self) -> Result<Option<String>> {
        self.live.read()
    }

    fn write_active(&self, blob: &str, _service_name: &str) -> Result<()> {
        self.live.write(blob)
    }

    fn read_account(&self, num: u32, email: &str) -> Result<Option<String>> {
        let path = self.entry_path(num, email);
        let cipher = match fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => return Ok(None),
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Cannot read {}", path.display()));
            }
        };

        let plain = self
            .protector
            .unprotect(&cipher)
            .with_context(|| format!("Cannot decrypt credentials for Account {num}"))?;
        let text = String::from_utf8(plain).context("Decrypted credentials are not UTF-8")?;
        Ok(super::non_empty(text))
    }

    fn write_account(&self, num: u32, email: &str, blob: &str) -> Result<()> {
        let cipher = self
            .protector
            .protect(blob.as_bytes())
            .with_context(|| format!("Cannot encrypt credentials for Account {num}"))?;
        files::write_private(&self.entry_path(num, email), &cipher)
    }

    fn delete_account(&self, num: u32, email: &str) -> Result<()> {
        files::remove_if_exists(&self.entry_path(num, email))
    }
}
