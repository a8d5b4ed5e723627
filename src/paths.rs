use anyhow::Result;
use serde_json::Value;
use std::{env, fs, path::PathBuf};

use crate::{error::SwitchError, files};

/// Where everything lives on disk. Resolved once at startup.
#[derive(Debug, Clone)]
pub struct Paths {
    pub home: PathBuf,
    /// Claude Code's own directory (`~/.claude` unless `CLAUDE_CONFIG_DIR` is set).
    pub claude_dir: PathBuf,
    /// Registry and per-account backups (`~/.claude-switch-backup`).
    pub backup_dir: PathBuf,
}

impl Paths {
    pub fn from_env() -> Result<Paths> {
        let home = dirs::home_dir().ok_or(SwitchError::NoHomeDir)?;
        let claude_dir = env::var_os("CLAUDE_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(".claude"));
        let backup_dir = env::var_os("CCSWITCH_BACKUP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(".claude-switch-backup"));
        Ok(Paths {
            home,
            claude_dir,
            backup_dir,
        })
    }

    /// Conventional layout under an arbitrary home directory.
    #[cfg(test)]
    pub fn under(home: &std::path::Path) -> Paths {
        Paths {
            home: home.to_path_buf(),
            claude_dir: home.join(".claude"),
            backup_dir: home.join(".claude-switch-backup"),
        }
    }

    pub fn registry_path(&self) -> PathBuf {
        self.backup_dir.join("sequence.json")
    }

    pub fn configs_dir(&self) -> PathBuf {
        self.backup_dir.join("configs")
    }

    pub fn credentials_dir(&self) -> PathBuf {
        self.backup_dir.join("credentials")
    }

    pub fn config_backup_path(&self, num: u32, email: &str) -> PathBuf {
        self.configs_dir()
            .join(format!(".claude-config-{num}-{email}.json"))
    }

    /// Live credential file read by Claude Code on Linux and WSL.
    pub fn live_credentials_path(&self) -> PathBuf {
        self.claude_dir.join(".credentials.json")
    }

    /// Find the active Claude config file: prefers `<claude dir>/.claude.json`
    /// if it has an oauthAccount, falls back to `~/.claude.json`.
    pub fn session_config_path(&self) -> PathBuf {
        let primary = self.claude_dir.join(".claude.json");
        let fallback = self.home.join(".claude.json");

        let has_account = fs::read_to_string(&primary)
            .ok()
            .and_then(|content| serde_json::from_str::<Value>(&content).ok())
            .is_some_and(|v| v.get("oauthAccount").is_some());

        if has_account {
            primary
        } else {
            fallback
        }
    }

    pub fn setup_dirs(&self) -> Result<()> {
        files::create_private_dir(&self.backup_dir)?;
        files::create_private_dir(&self.configs_dir())?;
        files::create_private_dir(&self.credentials_dir())?;
        Ok(())
    }
}
