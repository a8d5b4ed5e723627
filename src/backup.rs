use anyhow::{Context, Result};
use serde_json::Value;
use std::{fs, io};

use crate::{files, paths::Paths};

/// Per-account copies of Claude's config document, one file per
/// (account number, email).
pub struct ConfigBackups<'a> {
    paths: &'a Paths,
}

impl<'a> ConfigBackups<'a> {
    pub fn new(paths: &'a Paths) -> Self {
        ConfigBackups { paths }
    }

    pub fn write(&self, num: u32, email: &str, content: &str) -> Result<()> {
        let path = self.paths.config_backup_path(num, email);
        files::write_private(&path, content.as_bytes())
            .with_context(|| format!("Cannot write config backup to {}", path.display()))
    }

    /// The parsed backup, or `None` when it is missing or empty.
    pub fn read(&self, num: u32, email: &str) -> Result<Option<Value>> {
        let path = self.paths.config_backup_path(num, email);
        let content = match fs::read_to_string(&path) {
            Ok(c) if c.trim().is_empty() => return Ok(None),
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Cannot read config backup from {}", path.display()));
            }
        };
        serde_json::from_str(&content)
            .map(Some)
            .context("Invalid JSON in config backup")
    }

    pub fn delete(&self, num: u32, email: &str) -> Result<()> {
        files::remove_if_exists(&self.paths.config_backup_path(num, email))
    }
}
