use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use super::Platform;

pub struct NativePlatform;

fn chmod(path: &Path, mode: u32) {
    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)) {
        tracing::warn!(path = %path.display(), "chmod {mode:o} failed: {e}");
    }
}

impl Platform for NativePlatform {
    fn lock_down_dir(path: &Path) {
        chmod(path, 0o700);
    }

    fn lock_down_file(path: &Path) {
        chmod(path, 0o600);
    }

    fn default_data_dir() -> PathBuf {
        match dirs::home_dir() {
            Some(home) => home.join(".botdeck"),
            None => PathBuf::from(".botdeck"),
        }
    }
}
