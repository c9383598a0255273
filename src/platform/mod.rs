use std::path::{Path, PathBuf};

/// Where botdeck keeps its database and config, and how those paths are
/// locked down on the host OS.
pub trait Platform {
    /// Owner-only access for the data directory. Failures are logged, not fatal.
    fn lock_down_dir(path: &Path);

    /// Owner-only access for the SQLite file. Failures are logged, not fatal.
    fn lock_down_file(path: &Path);

    /// Default data directory before `BOTDECK_DATA_DIR` is applied.
    fn default_data_dir() -> PathBuf;

    fn data_dir() -> PathBuf {
        data_dir_from(std::env::var("BOTDECK_DATA_DIR").ok(), Self::default_data_dir())
    }
}

fn data_dir_from(env_value: Option<String>, fallback: PathBuf) -> PathBuf {
    match env_value {
        Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir.trim()),
        _ => fallback,
    }
}

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::NativePlatform;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::NativePlatform;
