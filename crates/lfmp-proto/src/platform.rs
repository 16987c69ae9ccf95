//! Per-user directories for config, prefs and logs.

use std::path::PathBuf;

const APP_DIR: &str = "lfmp";

/// Overrides both directories, e.g. for a throwaway profile.
pub const HOME_ENV: &str = "LFMP_HOME";

fn home_override() -> Option<PathBuf> {
    std::env::var_os(HOME_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Directory of the running binary, when it holds `marker`.
#[cfg_attr(not(windows), allow(dead_code))]
fn portable_dir(marker: &str) -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let dir = exe.parent()?;
    dir.join(marker).exists().then(|| dir.to_path_buf())
}

#[cfg_attr(windows, allow(dead_code))]
fn under_home(parts: &[&str]) -> PathBuf {
    let mut path = dirs::home_dir().unwrap_or_else(temp_dir);
    for part in parts {
        path.push(part);
    }
    path.join(APP_DIR)
}

/// Log file and preference jar live here: `~/.local/share/lfmp` on unix,
/// `%LOCALAPPDATA%\lfmp` on Windows unless a `data/` folder sits next to
/// the executable.
pub fn data_dir() -> PathBuf {
    if let Some(home) = home_override() {
        return home.join("data");
    }
    #[cfg(windows)]
    {
        portable_dir("data")
            .map(|dir| dir.join("data"))
            .unwrap_or_else(|| dirs::data_local_dir().unwrap_or_else(temp_dir).join(APP_DIR))
    }
    #[cfg(not(windows))]
    {
        under_home(&[".local", "share"])
    }
}

/// `config.toml` lives here: `~/.config/lfmp` on unix, the executable's
/// folder on Windows when it carries a `config.toml`.
pub fn config_dir() -> PathBuf {
    if let Some(home) = home_override() {
        return home;
    }
    #[cfg(windows)]
    {
        portable_dir("config.toml")
            .unwrap_or_else(|| dirs::config_dir().unwrap_or_else(temp_dir).join(APP_DIR))
    }
    #[cfg(not(windows))]
    {
        under_home(&[".config"])
    }
}

pub fn temp_dir() -> PathBuf {
    std::env::temp_dir()
}
