//! File-based cache implementation.
//!
//! [`FileCache`] stores cache entries as files on disk, organized into buckets
//! (subdirectories). Each entry is a single file with a binary header followed
//! by the data:
//!
//! ```text
//! [expires_at_ms: u64 LE][data bytes]
//! ```
//!
//! On read, only the header is read first to check expiry. The full data is
//! read only when the entry is still live, and expired files are removed.
//! Every write also sweeps expired entries from its bucket.
//!
//! Bucket names and keys are escaped into single path components: bytes
//! outside `[A-Za-z0-9_-]`, and a leading `.`, are written as `%XX`. A key
//! such as `../x` therefore stays inside its bucket directory.
//!
//! On construction, [`FileCache`] validates a `VERSION` file in the cache root.
//! If the version mismatches or is missing, the entire cache directory is wiped
//! and recreated. This ensures stale caches from previous builds are never used.

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock, expiry_millis, to_millis};
use crate::{Cache, CacheBucket, CacheError};

/// File-based [`Cache`] rooted at a directory on disk.
///
/// Directory layout:
/// ```text
/// {root}/
/// +-- VERSION            # contains the cache version string
/// +-- menu/              # bucket "menu"
/// |   +-- MENU_en        # cache entry
/// +-- errors/            # bucket "errors"
///     +-- ...
/// ```
pub struct FileCache {
    root: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileCache {
    /// Create a new file-based cache at `root`, validating the cache version.
    ///
    /// If the `VERSION` file inside `root` does not match `version`, the entire
    /// cache directory is removed and recreated with the new version. Errors
    /// during validation are logged but never fatal.
    #[must_use]
    pub fn new(root: PathBuf, version: &str) -> Self {
        validate_version(&root, version);
        Self {
            root,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used for expiry checks.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl Cache for FileCache {
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket> {
        Box::new(FileCacheBucket {
            dir: self.root.join(escape_component(name)),
            clock: Arc::clone(&self.clock),
        })
    }
}

/// A single bucket backed by a directory on disk.
struct FileCacheBucket {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileCacheBucket {
    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(escape_component(key))
    }

    /// Remove expired entry files other than `keep`.
    fn sweep_expired(&self, keep: &Path, now_ms: u64) {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path == keep {
                continue;
            }
            if read_expiry(&path).is_some_and(|expires_at_ms| now_ms >= expires_at_ms)
                && let Err(e) = fs::remove_file(&path)
                && e.kind() != ErrorKind::NotFound
            {
                tracing::debug!(
                    "failed to remove expired cache entry {}: {e}",
                    path.display()
                );
            }
        }
    }
}

impl CacheBucket for FileCacheBucket {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.entry_path(key);
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // Truncated header means a torn write; treat as a miss
        let mut header = [0u8; 8];
        if file.read_exact(&mut header).is_err() {
            return Ok(None);
        }
        let expires_at_ms = u64::from_le_bytes(header);

        if self.clock.now_millis() >= expires_at_ms {
            drop(file);
            let _ = fs::remove_file(&path);
            return Ok(None);
        }

        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(Some(data))
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let path = self.entry_path(key);
        fs::create_dir_all(&self.dir)?;

        let now = self.clock.now();
        self.sweep_expired(&path, to_millis(now));

        let expires_at_ms = expiry_millis(now, ttl);
        let mut buf = Vec::with_capacity(8 + value.len());
        buf.extend_from_slice(&expires_at_ms.to_le_bytes());
        buf.extend_from_slice(value);

        fs::write(&path, &buf)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Read the expiry header of an entry file. `None` for unreadable or torn files.
fn read_expiry(path: &Path) -> Option<u64> {
    let mut header = [0u8; 8];
    File::open(path).ok()?.read_exact(&mut header).ok()?;
    Some(u64::from_le_bytes(header))
}

/// Escape `name` into a single file name component.
fn escape_component(name: &str) -> String {
    if name.is_empty() {
        return "%".to_owned();
    }
    let mut out = String::with_capacity(name.len());
    for (i, byte) in name.bytes().enumerate() {
        let plain = byte.is_ascii_alphanumeric()
            || byte == b'_'
            || byte == b'-'
            || (byte == b'.' && i > 0);
        if plain {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

/// Validate the cache version, wiping the directory on mismatch.
fn validate_version(root: &Path, version: &str) {
    let version_file = root.join("VERSION");

    match fs::read_to_string(&version_file) {
        Ok(stored) if stored == version => {
            tracing::debug!("cache version matches: {version}");
            return;
        }
        Ok(stored) => {
            tracing::info!(
                "cache version mismatch (stored={stored}, current={version}), wiping cache"
            );
        }
        Err(_) => {
            tracing::info!("no cache VERSION file found, initializing cache");
        }
    }

    if root.exists()
        && let Err(e) = fs::remove_dir_all(root)
    {
        tracing::warn!("failed to remove cache directory: {e}");
    }
    if let Err(e) = fs::create_dir_all(root) {
        tracing::warn!("failed to create cache directory: {e}");
        return;
    }
    if let Err(e) = fs::write(&version_file, version) {
        tracing::warn!("failed to write cache VERSION file: {e}");
    }
}
