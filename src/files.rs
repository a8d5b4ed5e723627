//! Owner-only file creation and the atomic replace used for every JSON
//! document ccswitch rewrites (the registry and Claude's live config).

use anyhow::{Context, Result};
use log::debug;
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

pub fn create_private_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("Cannot create directory {}", path.display()))?;

    #[cfg(unix)]
    fs::set_permissions(path, fs::Permissions::from_mode(0o700))?;

    Ok(())
}

/// Write `content` to `path`, creating it 0600. Existing files are truncated
/// and re-restricted.
pub fn write_private(path: &Path, content: &[u8]) -> Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut f = options
        .open(path)
        .with_context(|| format!("Cannot write to {}", path.display()))?;
    f.write_all(content)?;
    f.flush()?;

    #[cfg(unix)]
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;

    Ok(())
}

/// Remove a file, treating "already gone" as success.
pub fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Cannot remove {}", path.display())),
    }
}

/// Content fully written to a temp file beside its destination, not yet
/// visible at the destination. Dropping it discards the temp file.
pub struct Staged {
    temp: NamedTempFile,
    target: PathBuf,
}

impl Staged {
    pub fn commit(self) -> Result<()> {
        let target = self.target;
        self.temp
            .persist(&target)
            .map_err(|e| e.error)
            .with_context(|| format!("Cannot finalize file at {}", target.display()))?;

        #[cfg(unix)]
        fs::set_permissions(&target, fs::Permissions::from_mode(0o600))?;

        debug!("replaced {}", target.display());
        Ok(())
    }
}

pub fn stage(path: &Path, content: &[u8]) -> Result<Staged> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    // NamedTempFile is created 0600 on unix.
    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Cannot create temp file in {}", dir.display()))?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    Ok(Staged {
        temp,
        target: path.to_path_buf(),
    })
}

/// Atomically write a JSON file: validate → temp file → rename → chmod 600.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    // Validate JSON before touching the real file
    let _: serde_json::Value =
        serde_json::from_str(content).context("Refusing to write invalid JSON")?;

    stage(path, content.as_bytes())?.commit()
}
