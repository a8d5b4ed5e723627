use std::{env, fs, path::Path};

/// The host environment, detected once in `main` and passed down to whatever
/// needs to pick a secret backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOS,
    Linux,
    Wsl,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::MacOS => write!(f, "macOS"),
            Platform::Linux => write!(f, "Linux"),
            Platform::Wsl => write!(f, "WSL"),
        }
    }
}

impl Platform {
    pub fn detect() -> Platform {
        Self::from_parts(
            std::env::consts::OS,
            env::var_os("WSL_DISTRO_NAME").is_some() || env::var_os("WSL_INTEROP").is_some(),
        )
    }

    fn from_parts(os: &str, wsl_markers: bool) -> Platform {
        match os {
            "macos" => Platform::MacOS,
            "linux" if wsl_markers => Platform::Wsl,
            _ => Platform::Linux,
        }
    }
}

pub fn is_container() -> bool {
    if Path::new("/.dockerenv").exists() {
        return true;
    }
    for file in ["/proc/1/cgroup", "/proc/self/mountinfo"] {
        if let Ok(content) = fs::read_to_string(file) {
            if ["docker", "lxc", "containerd", "kubepods", "overlay"]
                .iter()
                .any(|k| content.contains(k))
            {
                return true;
            }
        }
    }
    env::var("CONTAINER").is_ok() || env::var("container").is_ok()
}

pub fn is_root() -> bool {
    std::process::Command::new("id")
        .arg("-u")
        .output()
        .ok()
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim() == "0")
        .unwrap_or(false)
}

/// Root is refused outside containers; `CCSWITCH_ALLOW_ROOT` lifts that.
pub fn root_allowed() -> bool {
    !is_root() || is_container() || env::var_os("CCSWITCH_ALLOW_ROOT").is_some()
}
