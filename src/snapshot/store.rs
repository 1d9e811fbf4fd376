//! Append-only snapshot store with a hash-chained history

use super::backend::{FileBackend, MemoryBackend, SnapshotBackend};
use super::{Snapshot, SnapshotSections};
use crate::analytics::view::PublishedView;
use crate::config::StorageConfig;
use crate::types::SystemInfo;
use crate::{Error, Result, persistence_error};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// Tail of the history; the next save chains onto it
#[derive(Debug)]
struct ChainHead {
    next_sequence: u64,
    last_hash: Option<String>,
}

/// Snapshot store
///
/// Saves are serialized through the chain head so every snapshot links to
/// exactly one predecessor. Concurrent callers each get their own snapshot.
pub struct SnapshotStore {
    backend: Box<dyn SnapshotBackend>,
    head: Mutex<ChainHead>,
}

impl SnapshotStore {
    /// Open a store over `backend`, resuming after whatever it already holds
    pub fn open(backend: Box<dyn SnapshotBackend>) -> Result<Self> {
        let existing = backend.load_all()?;
        let head = match existing.last() {
            Some(last) => ChainHead {
                next_sequence: last.sequence + 1,
                last_hash: Some(last.content_hash.clone()),
            },
            None => ChainHead {
                next_sequence: 1,
                last_hash: None,
            },
        };

        info!(
            "🗄️ Snapshot store opened with {} existing snapshots",
            existing.len()
        );

        Ok(Self {
            backend,
            head: Mutex::new(head),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            backend: Box::new(MemoryBackend::new()),
            head: Mutex::new(ChainHead {
                next_sequence: 1,
                last_hash: None,
            }),
        }
    }

    /// File-backed when a snapshot directory is configured, in memory otherwise
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        match &config.snapshot_dir {
            Some(dir) => Self::open(Box::new(FileBackend::open(dir)?)),
            None => Ok(Self::in_memory()),
        }
    }

    /// Persist a new snapshot and return its id
    ///
    /// Either the whole snapshot is stored or nothing is; existing
    /// snapshots are never touched.
    pub fn save(&self, sections: SnapshotSections, created_by: &str) -> Result<Uuid> {
        let created_by = created_by.trim();
        if created_by.is_empty() {
            return Err(Error::validation("createdBy", "must not be empty"));
        }
        sections.validate()?;

        let mut head = self
            .head
            .lock()
            .map_err(|_| persistence_error!("Failed to lock snapshot chain"))?;

        let snapshot = Snapshot::new(
            head.next_sequence,
            created_by.to_string(),
            sections,
            head.last_hash.clone(),
        )?;

        if let Err(err) = self.backend.append(&snapshot) {
            warn!("⚠️ Snapshot {} was not saved: {}", snapshot.sequence, err);
            return Err(match err {
                Error::Persistence { .. } => err,
                other => Error::persistence(other.to_string()),
            });
        }

        head.next_sequence = snapshot.sequence + 1;
        head.last_hash = Some(snapshot.content_hash.clone());

        info!(
            "💾 Snapshot #{} saved by {} ({})",
            snapshot.sequence, snapshot.created_by, snapshot.id
        );
        Ok(snapshot.id)
    }

    /// Capture the published view and save it
    pub fn save_view(
        &self,
        view: &PublishedView,
        system: &SystemInfo,
        created_by: &str,
    ) -> Result<Uuid> {
        let sections =
            SnapshotSections::capture(&view.tally, &view.analytics, system, Utc::now())?;
        self.save(sections, created_by)
    }

    pub fn get(&self, id: Uuid) -> Result<Option<Snapshot>> {
        Ok(self.backend.load_all()?.into_iter().find(|s| s.id == id))
    }

    /// Every snapshot, oldest first
    pub fn list(&self) -> Result<Vec<Snapshot>> {
        self.backend.load_all()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.backend.load_all()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Walk the history checking hashes, links and sequence numbers
    pub fn verify_history(&self) -> Result<HistoryIntegrityReport> {
        let snapshots = self.backend.load_all()?;
        let mut report = HistoryIntegrityReport {
            total_checked: 0,
            violations: Vec::new(),
            chain_valid: true,
        };

        let mut previous_hash: Option<String> = None;
        let mut expected_sequence = 1;

        for snapshot in &snapshots {
            report.total_checked += 1;

            if !snapshot.verify_integrity()? {
                report.flag(snapshot, HistoryViolationKind::ContentHashMismatch);
            }
            if snapshot.previous_hash != previous_hash {
                report.flag(snapshot, HistoryViolationKind::ChainBroken);
            }
            if snapshot.sequence != expected_sequence {
                report.flag(snapshot, HistoryViolationKind::SequenceGap);
            }

            previous_hash = Some(snapshot.content_hash.clone());
            expected_sequence = snapshot.sequence + 1;
        }

        if !report.chain_valid {
            warn!(
                "🚨 Snapshot history has {} integrity violations",
                report.violations.len()
            );
        }

        Ok(report)
    }
}

/// Result of [`SnapshotStore::verify_history`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryIntegrityReport {
    pub total_checked: usize,
    pub violations: Vec<HistoryViolation>,
    pub chain_valid: bool,
}

impl HistoryIntegrityReport {
    fn flag(&mut self, snapshot: &Snapshot, kind: HistoryViolationKind) {
        self.violations.push(HistoryViolation {
            id: snapshot.id,
            sequence: snapshot.sequence,
            kind,
        });
        self.chain_valid = false;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryViolation {
    pub id: Uuid,
    pub sequence: u64,
    pub kind: HistoryViolationKind,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HistoryViolationKind {
    ContentHashMismatch,
    ChainBroken,
    SequenceGap,
}
