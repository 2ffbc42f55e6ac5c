use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Where the ledger is persisted: a flat namespace of text blobs.
/// A key that was never written reads as None.
pub trait BlobStore {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Keeps everything in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: HashMap<String, String>,
}

impl BlobStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.blobs.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        self.blobs.insert(key.into(), value.into());
        Ok(())
    }
}

/// One file per key, in a directory
#[derive(Debug)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// The directory is created if needed
    pub fn new(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)
            .with_context(|| format!("Cannot create {}", root.display()))?;
        Ok(DirStore { root: root.into() })
    }

    fn path(&self, key: &str) -> PathBuf {
        // keys embed account names, which must not escape the directory.
        // Other bytes are written as %XX, so distinct keys never share a
        // file.
        let mut name = String::with_capacity(key.len());
        for b in key.bytes() {
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'-' {
                name.push(char::from(b));
            } else {
                name.push_str(&format!("%{b:02X}"));
            }
        }
        self.root.join(format!("{name}.json"))
    }
}

impl BlobStore for DirStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path(key);
        match std::fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                Err(e).with_context(|| format!("Cannot read {}", path.display()))
            }
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path(key);
        std::fs::write(&path, value)
            .with_context(|| format!("Cannot write {}", path.display()))
    }
}
