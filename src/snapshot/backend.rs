//! Storage backends for snapshots
//!
//! Backends expose append and read only. There is no update or delete path.

use super::Snapshot;
use crate::{Error, Result, persistence_error};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::warn;

/// Append-only snapshot storage
pub trait SnapshotBackend: Send + Sync {
    /// Persist `snapshot` atomically: after an error nothing of it is visible
    fn append(&self, snapshot: &Snapshot) -> Result<()>;

    /// Every committed snapshot, in sequence order
    fn load_all(&self) -> Result<Vec<Snapshot>>;
}

/// Snapshots held in process memory
#[derive(Debug, Default)]
pub struct MemoryBackend {
    snapshots: RwLock<Vec<Snapshot>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotBackend for MemoryBackend {
    fn append(&self, snapshot: &Snapshot) -> Result<()> {
        self.snapshots
            .write()
            .map_err(|_| persistence_error!("Failed to lock snapshot memory"))?
            .push(snapshot.clone());
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<Snapshot>> {
        let mut snapshots = self
            .snapshots
            .read()
            .map_err(|_| persistence_error!("Failed to read snapshot memory"))?
            .clone();
        snapshots.sort_by_key(|s| s.sequence);
        Ok(snapshots)
    }
}

/// One JSON file per snapshot in a directory
///
/// Each file is written under a hidden temporary name, synced, then renamed
/// into place, so a reader sees either the whole snapshot or nothing.
/// Leftover temporary files from an interrupted write are ignored.
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Open (creating if needed) the snapshot directory
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            persistence_error!("Cannot create snapshot directory {}: {}", dir.display(), e)
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(snapshot: &Snapshot) -> String {
        format!("{:012}-{}.json", snapshot.sequence, snapshot.id)
    }

    fn write_new(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        file.write_all(bytes)?;
        file.sync_all()
    }

    fn sync_dir(&self) -> std::io::Result<()> {
        #[cfg(unix)]
        File::open(&self.dir)?.sync_all()?;
        Ok(())
    }

    /// Rename `temp_path` into place, then make the rename durable
    ///
    /// The rename is the commit point. Once it succeeds the snapshot is
    /// visible to readers, so a failed directory sync is logged rather than
    /// reported as a failed append.
    fn install(
        temp_path: &Path,
        final_path: &Path,
        sync_dir: impl FnOnce() -> std::io::Result<()>,
    ) -> std::io::Result<()> {
        fs::rename(temp_path, final_path)?;
        if let Err(err) = sync_dir() {
            warn!(
                "⚠️  Snapshot {} committed but directory sync failed: {}",
                final_path.display(),
                err
            );
        }
        Ok(())
    }
}

impl SnapshotBackend for FileBackend {
    fn append(&self, snapshot: &Snapshot) -> Result<()> {
        let name = Self::file_name(snapshot);
        let final_path = self.dir.join(&name);
        let temp_path = self.dir.join(format!(".{name}.tmp"));

        if final_path.exists() {
            return Err(persistence_error!("Snapshot file {} already exists", name));
        }

        let bytes = serde_json::to_vec_pretty(snapshot)?;

        let committed = Self::write_new(&temp_path, &bytes)
            .and_then(|_| Self::install(&temp_path, &final_path, || self.sync_dir()));

        if let Err(err) = committed {
            // nothing was renamed into place, so only the temp file can exist
            let _ = fs::remove_file(&temp_path);
            return Err(persistence_error!("Failed to write snapshot {}: {}", name, err));
        }

        Ok(())
    }

    fn load_all(&self) -> Result<Vec<Snapshot>> {
        let mut snapshots = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if name.starts_with('.') || !name.ends_with(".json") {
                continue;
            }

            let bytes = fs::read(entry.path())?;
            let snapshot: Snapshot = serde_json::from_slice(&bytes).map_err(|e| {
                Error::persistence(format!("Corrupt snapshot file {name}: {e}"))
            })?;
            snapshots.push(snapshot);
        }

        snapshots.sort_by_key(|s| s.sequence);
        Ok(snapshots)
    }
}
