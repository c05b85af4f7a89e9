use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::errors::KeyfileError;

/// Global file lock table to prevent concurrent writes
static FILE_LOCKS: once_cell::sync::Lazy<Mutex<HashMap<PathBuf, ()>>> =
    once_cell::sync::Lazy::new(|| Mutex::new(HashMap::new()));

fn lock_table() -> std::sync::MutexGuard<'static, HashMap<PathBuf, ()>> {
    // Poisoning only means a panicking holder; the table itself stays valid
    FILE_LOCKS.lock().unwrap_or_else(|e| e.into_inner())
}

/// RAII file lock guard
pub struct FileLockGuard {
    path: PathBuf,
}

impl FileLockGuard {
    pub fn new(path: &Path) -> Result<Self, KeyfileError> {
        let normalized = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        let mut locks = lock_table();
        if locks.contains_key(&normalized) {
            return Err(KeyfileError::Lock(format!(
                "File {} is already being processed",
                path.display()
            )));
        }
        locks.insert(normalized.clone(), ());
        Ok(Self { path: normalized })
    }
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        lock_table().remove(&self.path);
    }
}
