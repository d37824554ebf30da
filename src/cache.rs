//! Response cache keyed by logical fetch name.
//!
//! Existence of an entry means "already fetched, do not hit the network
//! again" — freshness is an external concern. Entries are never mutated or
//! deleted here, so an interrupted run resumes by skipping everything that
//! made it to disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::Result;

pub trait PageCache {
    fn has(&self, name: &str) -> bool;
    fn get(&self, name: &str) -> Result<Option<Vec<u8>>>;
    fn put(&mut self, name: &str, bytes: &[u8]) -> Result<()>;
}

/// One file per logical name under a cache directory.
///
/// Writes go to a temp file first and are moved into place with a rename,
/// so a crash mid-write never leaves a partial entry behind.
pub struct DirCache {
    dir: PathBuf,
}

impl DirCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.html"))
    }
}

impl PageCache for DirCache {
    fn has(&self, name: &str) -> bool {
        self.entry_path(name).exists()
    }

    fn get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(name);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read(path)?))
    }

    fn put(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let tmp = self.dir.join(format!("{name}.tmp"));
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, self.entry_path(name))?;
        Ok(())
    }
}

/// In-memory cache for tests and dry runs.
#[derive(Default)]
pub struct MemCache {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an entry, as if it had been fetched in an earlier run.
    pub fn seed(&mut self, name: &str, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(name.to_owned(), bytes.into());
    }
}

impl PageCache for MemCache {
    fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    fn get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(name).cloned())
    }

    fn put(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.entries.insert(name.to_owned(), bytes.to_vec());
        Ok(())
    }
}
