use std::path::{Path, PathBuf};

use super::Platform;

/// ACLs under `%APPDATA%` are already per-user.
pub struct NativePlatform;

impl Platform for NativePlatform {
    fn lock_down_dir(_path: &Path) {}

    fn lock_down_file(_path: &Path) {}

    fn default_data_dir() -> PathBuf {
        match dirs::data_dir() {
            Some(app_data) => app_data.join("botdeck"),
            None => PathBuf::from("botdeck"),
        }
    }
}
