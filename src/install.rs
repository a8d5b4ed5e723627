use anyhow::{Context, Result};
use colored::Colorize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use crate::paths::Paths;

const BIN_NAME: &str = "ccswitch";

fn target(prefix: &Path) -> PathBuf {
    prefix.join("bin").join(BIN_NAME)
}

pub fn default_prefix(paths: &Paths) -> PathBuf {
    paths.home.join(".local")
}

/// Copy the running executable to `<prefix>/bin/ccswitch`.
fn copy_self(prefix: &Path) -> Result<PathBuf> {
    let exe = env::current_exe().context("Cannot locate the running executable")?;
    let dest = target(prefix);
    let bin_dir = prefix.join("bin");
    fs::create_dir_all(&bin_dir)
        .with_context(|| format!("Cannot create {}", bin_dir.display()))?;

    let same_file = fs::canonicalize(&exe).ok() == fs::canonicalize(&dest).ok();
    if !same_file {
        fs::copy(&exe, &dest)
            .with_context(|| format!("Cannot copy {} to {}", exe.display(), dest.display()))?;
    }

    #[cfg(unix)]
    fs::set_permissions(&dest, fs::Permissions::from_mode(0o755))?;

    Ok(dest)
}

fn on_path(dir: &Path) -> bool {
    env::var_os("PATH")
        .map(|p| env::split_paths(&p).any(|entry| entry == dir))
        .unwrap_or(false)
}

pub fn install(prefix: &Path) -> Result<()> {
    let dest = copy_self(prefix)?;
    println!("  {} Installed {}", "✓".green().bold(), dest.display());

    let bin_dir = prefix.join("bin");
    if !on_path(&bin_dir) {
        println!(
            "  {} {} is not on your PATH. Add it to your shell profile.",
            "!".yellow().bold(),
            bin_dir.display()
        );
    }
    Ok(())
}

pub fn uninstall(prefix: &Path) -> Result<()> {
    let dest = target(prefix);
    if dest.exists() {
        fs::remove_file(&dest).with_context(|| format!("Cannot remove {}", dest.display()))?;
        println!("  {} Removed {}", "✓".green().bold(), dest.display());
    } else {
        println!("  {} Nothing installed at {}", "·".yellow(), dest.display());
    }
    Ok(())
}
