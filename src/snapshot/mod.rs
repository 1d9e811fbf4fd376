//! Immutable, append-only election state snapshots
//!
//! A snapshot captures the full computed state at one instant in six opaque
//! sections. Snapshots are written only on explicit request, never updated
//! and never deleted. Each one records the hash of its predecessor, so the
//! stored history is tamper-evident.

pub mod backend;
pub mod store;

pub use backend::{FileBackend, MemoryBackend, SnapshotBackend};
pub use store::{HistoryIntegrityReport, HistoryViolation, HistoryViolationKind, SnapshotStore};

use crate::analytics::AnalyticsResult;
use crate::ledger::TallySnapshot;
use crate::types::{SystemInfo, turnout_percent};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use uuid::Uuid;

/// The six payload sections of a snapshot
///
/// The store checks only that each section is a JSON object or array; the
/// content itself is opaque.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSections {
    pub election_status: Value,
    pub voter_data: Value,
    pub candidate_data: Value,
    pub geographical_data: Value,
    pub audit_data: Value,
    pub system_data: Value,
}

impl SnapshotSections {
    fn named(&self) -> [(&'static str, &Value); 6] {
        [
            ("electionStatus", &self.election_status),
            ("voterData", &self.voter_data),
            ("candidateData", &self.candidate_data),
            ("geographicalData", &self.geographical_data),
            ("auditData", &self.audit_data),
            ("systemData", &self.system_data),
        ]
    }

    /// Structural check: every section must be an object or an array
    pub fn validate(&self) -> Result<()> {
        for (name, section) in self.named() {
            if !(section.is_object() || section.is_array()) {
                return Err(Error::validation(
                    name,
                    "section must be a JSON object or array",
                ));
            }
        }
        Ok(())
    }

    /// Build all six sections from the current tally and analytics
    pub fn capture(
        tally: &TallySnapshot,
        analytics: &AnalyticsResult,
        system: &SystemInfo,
        captured_at: DateTime<Utc>,
    ) -> Result<Self> {
        let status = &tally.status;
        let votes_cast = tally.votes_cast();
        let turnout = format!("{:.2}", turnout_percent(votes_cast, tally.total_voters));

        let election_status = json!({
            "registrationActive": status.registration_active,
            "votingActive": status.voting_active,
            "registrationStart": status.registration_start,
            "registrationEnd": status.registration_end,
            "votingStart": status.voting_start,
            "votingEnd": status.voting_end,
        });

        let voter_data = json!({
            "totalVoters": tally.total_voters,
            "totalVotesCast": votes_cast,
            "voterTurnoutPercentage": turnout,
            "remainingVoters": tally.total_voters.saturating_sub(votes_cast),
        });

        let candidate_data = serde_json::to_value(&tally.candidates)?;

        let mut regions = Map::new();
        for (region, totals) in tally.region_totals() {
            regions.insert(
                region,
                json!({
                    "totalCandidates": totals.total_candidates(),
                    "totalVotes": totals.total_votes(),
                    "presidentCandidates": totals.candidates[0],
                    "senatorCandidates": totals.candidates[1],
                    "governorCandidates": totals.candidates[2],
                    "presidentVotes": totals.votes[0],
                    "senatorVotes": totals.votes[1],
                    "governorVotes": totals.votes[2],
                }),
            );
        }
        let geographical_data = json!({
            "regions": regions,
            "regionalAnalytics": serde_json::to_value(analytics)?,
        });

        let audit_data = json!({
            "electionStatus": election_status.clone(),
            "totalRegisteredVoters": tally.total_voters,
            "totalCandidates": tally.candidate_count,
            "totalVotesCast": votes_cast,
            "voterTurnoutPercentage": turnout,
            "numberOfRegions": tally.regions.len(),
            "unavailable": tally.unavailable,
            "capturedAt": tally.captured_at.to_rfc3339(),
            "auditedAt": captured_at.to_rfc3339(),
        });

        let system_data = json!({
            "adminAddress": system.admin_address,
            "currentUser": system.current_user,
            "isAdmin": system.is_admin(),
            "contractStatus": system.contract_status,
            "systemVersion": system.system_version,
            "blockchainNetwork": system.network,
            "totalTransactions": system.total_transactions,
            "systemHealth": system.system_health,
            "lastUpdated": captured_at.to_rfc3339(),
        });

        Ok(Self {
            election_status,
            voter_data,
            candidate_data,
            geographical_data,
            audit_data,
            system_data,
        })
    }
}

/// A committed snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub id: Uuid,
    /// Position in the store's history, starting at 1
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub sections: SnapshotSections,
    /// Content hash of the preceding snapshot
    pub previous_hash: Option<String>,
    /// Hex blake3 hash over every other field
    pub content_hash: String,
}

impl Snapshot {
    pub(crate) fn new(
        sequence: u64,
        created_by: String,
        sections: SnapshotSections,
        previous_hash: Option<String>,
    ) -> Result<Self> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let content_hash = Self::hash_content(
            &id,
            sequence,
            &created_at,
            &created_by,
            &sections,
            previous_hash.as_deref(),
        )?;

        Ok(Self {
            id,
            sequence,
            created_at,
            created_by,
            sections,
            previous_hash,
            content_hash,
        })
    }

    fn hash_content(
        id: &Uuid,
        sequence: u64,
        created_at: &DateTime<Utc>,
        created_by: &str,
        sections: &SnapshotSections,
        previous_hash: Option<&str>,
    ) -> Result<String> {
        let content = serde_json::to_vec(&(
            id,
            sequence,
            created_at,
            created_by,
            sections,
            previous_hash,
        ))?;
        Ok(hex::encode(blake3::hash(&content).as_bytes()))
    }

    /// Recompute the content hash and compare
    pub fn verify_integrity(&self) -> Result<bool> {
        let expected = Self::hash_content(
            &self.id,
            self.sequence,
            &self.created_at,
            &self.created_by,
            &self.sections,
            self.previous_hash.as_deref(),
        )?;
        Ok(expected == self.content_hash)
    }
}
