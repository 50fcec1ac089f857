use anyhow::{anyhow, Result};
use std::fs;
use std::path::PathBuf;

/// Local key-value store: one UTF-8 file per key under the app data
/// directory. Plays the role the browser's localStorage played in the
/// original client.
///
/// Writes are best-effort. A failed write or remove is logged and swallowed
/// so in-memory state stays authoritative for the running session. There is
/// no cross-process locking; two instances sharing a key race and the last
/// write wins.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Open the store at the default location (`<data_dir>/helpdesk`).
    pub fn open() -> Result<Self> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;
        Ok(Self::at(data_dir.join("helpdesk")))
    }

    /// Open the store at an explicit root (used by tests).
    pub fn at(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.key_path(key)).ok()
    }

    pub fn set(&self, key: &str, value: &str) {
        if let Err(e) = self.try_set(key, value) {
            log::warn!("storage write for key '{}' failed: {}", key, e);
        }
    }

    pub fn remove(&self, key: &str) {
        let path = self.key_path(key);
        if path.exists() {
            if let Err(e) = fs::remove_file(&path) {
                log::warn!("storage remove for key '{}' failed: {}", key, e);
            }
        }
    }

    fn try_set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        fs::write(self.key_path(key), value)?;
        Ok(())
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(sanitize_key(key))
    }
}

/// Map an arbitrary key (may contain an email address) to a filesystem-safe
/// file name. Bytes outside `[A-Za-z0-9.-]` are escaped as `_` plus two hex
/// digits, underscore included, so the mapping is injective: distinct keys
/// never resolve to the same file.
pub fn sanitize_key(key: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(key.len());
    for &b in key.as_bytes() {
        match b {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'.' => out.push(b as char),
            _ => {
                out.push('_');
                out.push(HEX[usize::from(b >> 4)] as char);
                out.push(HEX[usize::from(b & 0x0f)] as char);
            }
        }
    }
    out
}
