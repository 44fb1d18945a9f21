// src/tmp.rs

//! Allocation of unique, writable artifact paths.
//!
//! Compiled adapters ask the store for a fresh path, hand it to the
//! toolchain as `{output_file}`, and give it back on close. Names are
//! random UUIDs, so concurrently running adapters never collide.
//!
//! The directory either comes from `tmp_dir` in `judge.yaml` or is a
//! managed `tempfile` directory removed when the store is dropped.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tempfile::TempDir;
use uuid::Uuid;

use crate::util::ensure_dir;

#[derive(Debug)]
enum Root {
    Managed(TempDir),
    Fixed(PathBuf),
}

/// Shared allocator for temporary artifacts (wrap in `Arc` to share).
#[derive(Debug)]
pub struct TempStore {
    root: Root,
    allocated: Mutex<HashSet<PathBuf>>,
}

impl TempStore {
    /// Use `dir` when given, otherwise a managed temporary directory.
    pub fn new(dir: Option<&Path>) -> Result<Self> {
        match dir {
            Some(dir) => Self::in_dir(dir),
            None => Self::managed(),
        }
    }

    pub fn managed() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("oijudge-")
            .tempdir()
            .context("Failed to create temp dir")?;

        Ok(Self {
            root: Root::Managed(dir),
            allocated: Mutex::new(HashSet::new()),
        })
    }

    pub fn in_dir(dir: &Path) -> Result<Self> {
        ensure_dir(dir)?;
        Ok(Self {
            root: Root::Fixed(dir.to_path_buf()),
            allocated: Mutex::new(HashSet::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        match &self.root {
            Root::Managed(dir) => dir.path(),
            Root::Fixed(dir) => dir,
        }
    }

    /// A path that does not exist yet and has never been handed out.
    pub fn allocate(&self) -> io::Result<PathBuf> {
        std::fs::create_dir_all(self.dir())?;

        let mut allocated = self
            .allocated
            .lock()
            .map_err(|_| io::Error::other("temp registry poisoned"))?;

        loop {
            let path = self.dir().join(Uuid::new_v4().to_string());
            if !path.exists() && allocated.insert(path.clone()) {
                return Ok(path);
            }
        }
    }

    /// Delete a previously allocated path. Never fails.
    pub fn release(&self, path: &Path) {
        if path.exists() {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove artifact");
            }
        }

        if let Ok(mut allocated) = self.allocated.lock() {
            allocated.remove(path);
        }
    }

    /// Number of paths handed out and not yet released.
    pub fn outstanding(&self) -> usize {
        self.allocated.lock().map(|a| a.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocations_are_unique_and_released() {
        let store = TempStore::managed().unwrap();
        let a = store.allocate().unwrap();
        let b = store.allocate().unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with(store.dir()));
        assert_eq!(store.outstanding(), 2);

        std::fs::write(&a, b"artifact").unwrap();
        store.release(&a);
        assert!(!a.exists());
        assert_eq!(store.outstanding(), 1);

        // releasing something that was never written is fine
        store.release(&b);
        assert_eq!(store.outstanding(), 0);
    }

    #[test]
    fn fixed_dir_is_created() {
        let base = tempfile::tempdir().unwrap();
        let dir = base.path().join("nested").join("artifacts");
        let store = TempStore::new(Some(&dir)).unwrap();
        assert!(dir.is_dir());
        assert!(store.allocate().unwrap().starts_with(&dir));
    }
}
