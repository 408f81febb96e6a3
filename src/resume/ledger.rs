//! Progress ledger persistence
//!
//! The ledger maps album id to the filenames already written for that album.
//! It is the only durable state of a download run: loaded fully at start,
//! mutated in memory and rewritten in full after every successful item.
//!
//! The on-disk format is a plain JSON object of string lists:
//!
//! ```json
//! { "ALBUM_ID": ["IMG_0001.jpg", "IMG_0002.jpg"] }
//! ```

use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default ledger file name, relative to the working directory
pub const LEDGER_FILENAME: &str = "downloaded_files.json";

/// Largest ledger file accepted on load (64 MiB)
pub const MAX_LEDGER_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// Serialized ledger contents
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct LedgerData {
    albums: BTreeMap<String, Vec<String>>,
}

impl LedgerData {
    /// Drop repeated filenames, keeping first-seen order
    fn dedup(&mut self) {
        for files in self.albums.values_mut() {
            let mut seen = HashSet::with_capacity(files.len());
            files.retain(|f| seen.insert(f.clone()));
        }
    }
}

/// Durable record of completed downloads per album
#[derive(Debug, Clone)]
pub struct ProgressLedger {
    path: PathBuf,
    data: LedgerData,
    saves: usize,
}

impl ProgressLedger {
    /// Load the ledger at `path`.
    ///
    /// A missing file yields an empty ledger. An unreadable or corrupt file is
    /// logged and also yields an empty ledger; a corrupt file is moved aside
    /// to `<name>.corrupt` so the next write does not destroy it.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match read_data(&path) {
            Ok(Some(data)) => {
                info!(
                    path = %path.display(),
                    albums = data.albums.len(),
                    "Loaded download ledger"
                );
                data
            }
            Ok(None) => {
                debug!(path = %path.display(), "No download ledger found, starting empty");
                LedgerData::default()
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to load download ledger, treating as empty"
                );
                if matches!(
                    e,
                    ResumeError::DeserializationError(_) | ResumeError::LedgerTooLarge { .. }
                ) {
                    quarantine(&path);
                }
                LedgerData::default()
            }
        };
        Self { path, data, saves: 0 }
    }

    /// Load the ledger at `path`, returning read and parse errors to the caller.
    ///
    /// A missing file is not an error.
    pub fn read_strict(path: impl Into<PathBuf>) -> Result<Self, ResumeError> {
        let path = path.into();
        let data = read_data(&path)?.unwrap_or_default();
        Ok(Self {
            path,
            data,
            saves: 0,
        })
    }

    /// Backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Filenames previously recorded for `album_id` (empty when none)
    pub fn loaded_set(&self, album_id: &str) -> HashSet<String> {
        self.data
            .albums
            .get(album_id)
            .map(|files| files.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether `filename` is recorded for `album_id`
    pub fn contains(&self, album_id: &str, filename: &str) -> bool {
        self.data
            .albums
            .get(album_id)
            .is_some_and(|files| files.iter().any(|f| f == filename))
    }

    /// Number of filenames recorded for `album_id`
    pub fn len(&self, album_id: &str) -> usize {
        self.data.albums.get(album_id).map_or(0, Vec::len)
    }

    /// Whether the ledger has no albums at all
    pub fn is_empty(&self) -> bool {
        self.data.albums.is_empty()
    }

    /// Successful rewrites of the backing file since this ledger was loaded
    pub fn saves(&self) -> usize {
        self.saves
    }

    /// Album ids present in the ledger
    pub fn albums(&self) -> impl Iterator<Item = &str> {
        self.data.albums.keys().map(String::as_str)
    }

    /// Add `filename` to `album_id` and persist the whole ledger.
    ///
    /// Adding an already recorded filename leaves the list unchanged. Returns
    /// whether the filename was new. The in-memory entry is kept even when
    /// persisting fails.
    pub fn record(&mut self, album_id: &str, filename: &str) -> Result<bool, ResumeError> {
        let files = self.data.albums.entry(album_id.to_string()).or_default();
        let added = if files.iter().any(|f| f == filename) {
            false
        } else {
            files.push(filename.to_string());
            true
        };

        debug!(album_id, filename, added, "Recording download in ledger");
        self.save()?;
        Ok(added)
    }

    /// Rewrite the full ledger to its backing file.
    ///
    /// Serializes to a temp file in the same directory, syncs it and renames
    /// it over the target so an interrupted write never truncates the ledger.
    pub fn save(&mut self) -> Result<(), ResumeError> {
        let parent_dir = parent_dir(&self.path);
        std::fs::create_dir_all(parent_dir).map_err(|e| ResumeError::IoError(e.to_string()))?;

        let json = serde_json::to_string_pretty(&self.data)
            .map_err(|e| ResumeError::SerializationError(e.to_string()))?;

        let lock_file = open_lock_file(&self.path)?;
        let mut lock = RwLock::new(lock_file);
        let _guard = lock
            .write()
            .map_err(|e| ResumeError::LockError(format!("Failed to acquire write lock: {e}")))?;

        let mut temp_file = tempfile::NamedTempFile::new_in(parent_dir)
            .map_err(|e| ResumeError::IoError(format!("Failed to create temp file: {e}")))?;
        temp_file
            .write_all(json.as_bytes())
            .map_err(|e| ResumeError::IoError(format!("Failed to write to temp file: {e}")))?;
        temp_file
            .flush()
            .map_err(|e| ResumeError::IoError(format!("Failed to flush temp file: {e}")))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| ResumeError::IoError(format!("Failed to sync temp file: {e}")))?;
        temp_file
            .persist(&self.path)
            .map_err(|e| ResumeError::IoError(format!("Failed to persist temp file: {e}")))?;

        if let Ok(dir) = std::fs::File::open(parent_dir) {
            let _ = dir.sync_all();
        }

        self.saves += 1;
        debug!(
            path = %self.path.display(),
            albums = self.data.albums.len(),
            saves = self.saves,
            "Download ledger saved"
        );
        Ok(())
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn open_lock_file(path: &Path) -> Result<std::fs::File, ResumeError> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path.with_extension("lock"))
        .map_err(|e| ResumeError::LockError(format!("Failed to create lock file: {e}")))
}

fn read_data(path: &Path) -> Result<Option<LedgerData>, ResumeError> {
    if !path.exists() {
        return Ok(None);
    }

    let lock_file = open_lock_file(path)?;
    let lock = RwLock::new(lock_file);
    let _guard = lock
        .read()
        .map_err(|e| ResumeError::LockError(format!("Failed to acquire read lock: {e}")))?;

    let metadata = std::fs::metadata(path).map_err(|e| ResumeError::IoError(e.to_string()))?;
    if metadata.len() > MAX_LEDGER_FILE_SIZE {
        return Err(ResumeError::LedgerTooLarge {
            size: metadata.len(),
            max: MAX_LEDGER_FILE_SIZE,
        });
    }

    let contents =
        std::fs::read_to_string(path).map_err(|e| ResumeError::IoError(e.to_string()))?;
    let mut data: LedgerData = serde_json::from_str(&contents)
        .map_err(|e| ResumeError::DeserializationError(e.to_string()))?;
    data.dedup();
    Ok(Some(data))
}

fn quarantine(path: &Path) {
    let mut target = path.as_os_str().to_owned();
    target.push(".corrupt");
    let target = PathBuf::from(target);
    match std::fs::rename(path, &target) {
        Ok(()) => warn!(
            from = %path.display(),
            to = %target.display(),
            "Moved unreadable ledger aside"
        ),
        Err(e) => warn!(error = %e, "Failed to move unreadable ledger aside"),
    }
}

/// Errors related to the progress ledger
#[derive(Debug, thiserror::Error)]
pub enum ResumeError {
    /// Ledger file larger than [`MAX_LEDGER_FILE_SIZE`]
    #[error("ledger file too large: {size} bytes (max: {max} bytes)")]
    LedgerTooLarge {
        /// Actual file size
        size: u64,
        /// Maximum allowed size
        max: u64,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error
    #[error("deserialization error: {0}")]
    DeserializationError(String),

    /// Lock error
    #[error("lock error: {0}")]
    LockError(String),
}
