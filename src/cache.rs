use crate::core::error::AishError;
use crate::providers::Message;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Deterministic identity of one pipeline invocation: role, full message
/// sequence, model and sampling parameters. Stable across process
/// restarts; any change to a single prior turn changes the fingerprint.
pub fn fingerprint(
    role_id: &str,
    messages: &[Message],
    model: &str,
    temperature: f32,
    top_p: f32,
) -> String {
    let mut hasher = Sha256::new();
    let mut field = |bytes: &[u8]| {
        // Length prefix keeps adjacent fields from colliding
        Digest::update(&mut hasher, (bytes.len() as u64).to_le_bytes());
        Digest::update(&mut hasher, bytes);
    };

    field(role_id.as_bytes());
    for message in messages {
        field(message.role.as_str().as_bytes());
        field(message.content.as_bytes());
    }
    field(model.as_bytes());
    field(temperature.to_string().as_bytes());
    field(top_p.to_string().as_bytes());

    format!("{:x}", hasher.finalize())
}

/// Disk-backed response cache, one file per fingerprint. Bounded by a
/// configured entry count; eviction drops the oldest-inserted entries
/// first. Read faults degrade to misses, they never fail a request.
pub struct ResponseCache {
    dir: PathBuf,
    capacity: usize,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            dir: dir.into(),
            capacity,
        }
    }

    fn path(&self, fingerprint: &str) -> PathBuf {
        self.dir.join(fingerprint)
    }

    /// Cache lookup. Absence is a normal outcome, not an error.
    pub fn get(&self, fingerprint: &str) -> Option<String> {
        let path = self.path(fingerprint);
        match fs::read_to_string(&path) {
            Ok(text) => {
                debug!(%fingerprint, "cache hit");
                Some(text)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(%fingerprint, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    pub fn put(&self, fingerprint: &str, response: &str) -> Result<(), AishError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| AishError::CacheStorage(format!("Create cache dir: {}", e)))?;

        let path = self.path(fingerprint);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, response)
            .map_err(|e| AishError::CacheStorage(format!("Write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &path)
            .map_err(|e| AishError::CacheStorage(format!("Replace {}: {}", path.display(), e)))?;

        self.evict_oldest()?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), AishError> {
        if !self.dir.is_dir() {
            return Ok(());
        }
        for entry in fs::read_dir(&self.dir)
            .map_err(|e| AishError::CacheStorage(format!("List cache: {}", e)))?
        {
            let path = entry
                .map_err(|e| AishError::CacheStorage(format!("List cache: {}", e)))?
                .path();
            if path.is_file() {
                fs::remove_file(&path)
                    .map_err(|e| AishError::CacheStorage(format!("Delete cache entry: {}", e)))?;
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> Result<Vec<(PathBuf, SystemTime)>, AishError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .map_err(|e| AishError::CacheStorage(format!("List cache: {}", e)))?
        {
            let entry = entry.map_err(|e| AishError::CacheStorage(format!("List cache: {}", e)))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            entries.push((path, modified));
        }
        Ok(entries)
    }

    fn evict_oldest(&self) -> Result<(), AishError> {
        let mut entries = self.entries()?;
        if entries.len() <= self.capacity {
            return Ok(());
        }
        entries.sort_by_key(|(_, modified)| *modified);
        let excess = entries.len() - self.capacity;
        for (path, _) in entries.into_iter().take(excess) {
            debug!(path = %path.display(), "evicting cache entry");
            fs::remove_file(&path)
                .map_err(|e| AishError::CacheStorage(format!("Evict cache entry: {}", e)))?;
        }
        Ok(())
    }
}
