//! Read-only access to the external election ledger
//!
//! The ledger owns registration, voting and candidate management. This module
//! only models its read surface ([`TallySource`]), one consistent read of that
//! surface ([`TallySnapshot`]), and an in-memory source backed by a JSON
//! fixture for tests, demos and benchmarks.

use crate::types::{Candidate, ElectionStatus, Position, RegionTotals, TURNOUT_REFERENCE_POSITION};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::RwLock;

/// Column-oriented result listing for one position, as returned by the ledger
///
/// The ledger returns parallel arrays; `ids` defines the number of entries and
/// the other arrays are padded with defaults when shorter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PositionResults {
    pub ids: Vec<u64>,
    pub names: Vec<String>,
    pub parties: Vec<String>,
    pub image_urls: Vec<String>,
    pub vote_counts: Vec<u64>,
    pub total_votes: u64,
}

impl PositionResults {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Convert the parallel arrays into candidates for `position`
    pub fn into_candidates(self, position: Position) -> Vec<Candidate> {
        let text = |column: &[String], idx: usize| column.get(idx).cloned().unwrap_or_default();

        self.ids
            .iter()
            .enumerate()
            .map(|(idx, &id)| Candidate {
                id,
                name: text(&self.names, idx),
                party: text(&self.parties, idx),
                position,
                region: String::new(),
                image_url: text(&self.image_urls, idx),
                vote_count: self.vote_counts.get(idx).copied().unwrap_or(0),
            })
            .collect()
    }
}

/// Read-only view of the ledger
///
/// Implementations return [`Error::DataUnavailable`] when the ledger has no
/// data to report; any other error aborts the read.
pub trait TallySource: Send + Sync {
    /// Name used in logs and errors
    fn source_name(&self) -> &str {
        "ledger"
    }

    fn get_election_status(&self) -> Result<ElectionStatus>;

    /// Region names in ledger order
    fn get_all_regions(&self) -> Result<Vec<String>>;

    fn get_total_voters(&self) -> Result<u64>;

    fn candidate_count(&self) -> Result<u64>;

    fn get_results(&self, position: Position) -> Result<PositionResults>;

    /// Live results; sources without a separate live feed serve final results
    fn get_live_results(&self, position: Position) -> Result<PositionResults> {
        self.get_results(position)
    }

    /// Region of a regional candidate, when the source can tell
    fn candidate_region(&self, _candidate_id: u64) -> Result<Option<String>> {
        Ok(None)
    }
}

/// One consistent read of every ledger value the engine consumes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TallySnapshot {
    pub status: ElectionStatus,
    pub regions: Vec<String>,
    pub total_voters: u64,
    pub candidate_count: u64,
    /// President, senator and governor candidates, in that order
    pub candidates: Vec<Candidate>,
    /// Position totals as reported by the ledger
    pub reported_totals: BTreeMap<Position, u64>,
    /// Values the source could not provide; they read as empty/zero
    pub unavailable: Vec<String>,
    pub captured_at: DateTime<Utc>,
}

impl TallySnapshot {
    /// A snapshot with no regions, voters or candidates
    pub fn empty() -> Self {
        Self {
            status: ElectionStatus::default(),
            regions: Vec::new(),
            total_voters: 0,
            candidate_count: 0,
            candidates: Vec::new(),
            reported_totals: BTreeMap::new(),
            unavailable: Vec::new(),
            captured_at: Utc::now(),
        }
    }

    /// Read every value from `source`
    ///
    /// `DataUnavailable` answers degrade to empty values and are listed in
    /// `unavailable`; any other error is returned.
    pub fn capture(source: &dyn TallySource) -> Result<Self> {
        let mut unavailable = Vec::new();

        let status = tolerate(source.get_election_status(), "electionStatus", &mut unavailable)?;
        let regions = tolerate(source.get_all_regions(), "regions", &mut unavailable)?;
        let total_voters = tolerate(source.get_total_voters(), "totalVoters", &mut unavailable)?;
        let candidate_count =
            tolerate(source.candidate_count(), "candidateCount", &mut unavailable)?;

        let mut candidates = Vec::new();
        let mut reported_totals = BTreeMap::new();

        for position in Position::ALL {
            let results = tolerate(
                source.get_live_results(position),
                position.as_str(),
                &mut unavailable,
            )?;
            reported_totals.insert(position, results.total_votes);

            for mut candidate in results.into_candidates(position) {
                if position.is_regional() {
                    let region = tolerate(
                        source.candidate_region(candidate.id),
                        "candidateRegion",
                        &mut unavailable,
                    )?;
                    if let Some(region) = region {
                        candidate.region = region;
                    }
                }
                candidates.push(candidate);
            }
        }

        if !unavailable.is_empty() {
            tracing::warn!(
                "⚠️  {} returned no data for: {}",
                source.source_name(),
                unavailable.join(", ")
            );
        }

        Ok(Self {
            status,
            regions,
            total_voters,
            candidate_count,
            candidates,
            reported_totals,
            unavailable,
            captured_at: Utc::now(),
        })
    }

    /// Candidates running for `position`, in ledger order
    pub fn candidates_for(&self, position: Position) -> Vec<Candidate> {
        self.candidates
            .iter()
            .filter(|c| c.position == position)
            .cloned()
            .collect()
    }

    /// Sum of candidate vote counts for `position`
    pub fn position_votes(&self, position: Position) -> u64 {
        self.candidates
            .iter()
            .filter(|c| c.position == position)
            .map(|c| c.vote_count)
            .sum()
    }

    /// Ballots cast, counted once per voter through [`TURNOUT_REFERENCE_POSITION`]
    pub fn votes_cast(&self) -> u64 {
        self.position_votes(TURNOUT_REFERENCE_POSITION)
    }

    /// Candidate and vote counts per display region
    pub fn region_totals(&self) -> Vec<(String, RegionTotals)> {
        RegionTotals::by_region(&self.candidates)
    }

    /// Sum of vote counts across every candidate of every position
    pub fn total_votes_cast(&self) -> u64 {
        self.candidates.iter().map(|c| c.vote_count).sum()
    }

    /// Whether any value was missing from the source
    pub fn is_degraded(&self) -> bool {
        !self.unavailable.is_empty()
    }
}

fn tolerate<T: Default>(result: Result<T>, what: &str, unavailable: &mut Vec<String>) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(Error::DataUnavailable { .. }) => {
            if !unavailable.iter().any(|seen| seen == what) {
                unavailable.push(what.to_string());
            }
            Ok(T::default())
        }
        Err(err) => Err(err),
    }
}

/// Seed data for an [`InMemoryLedger`]
///
/// The one place candidate and region bootstrap data is defined for tests,
/// demos and benchmarks.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerFixture {
    #[serde(default)]
    pub status: ElectionStatus,
    pub regions: Vec<String>,
    pub total_voters: u64,
    pub candidates: Vec<Candidate>,
}

impl LedgerFixture {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let fixture: Self = serde_json::from_str(json)?;
        fixture.validate()?;
        Ok(fixture)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::validation(
                "fixture",
                format!("cannot read {}: {e}", path.display()),
            )
        })?;
        Self::from_json_str(&json)
    }

    /// Reject fixtures the real ledger could never produce
    pub fn validate(&self) -> Result<()> {
        self.status.validate()?;

        let mut seen_regions = std::collections::HashSet::new();
        for region in &self.regions {
            if !seen_regions.insert(region.as_str()) {
                return Err(Error::validation(
                    "regions",
                    format!("duplicate region '{region}'"),
                ));
            }
        }

        let mut seen_ids = std::collections::HashSet::new();
        for candidate in &self.candidates {
            candidate.validate()?;
            if !seen_ids.insert(candidate.id) {
                return Err(Error::validation(
                    "candidates",
                    format!("duplicate candidate id {}", candidate.id),
                ));
            }
        }
        Ok(())
    }
}

/// Fault injected into an [`InMemoryLedger`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerFault {
    /// Every read answers `DataUnavailable`
    Unavailable,
    /// Every read fails with an internal error
    Broken,
}

#[derive(Debug)]
struct LedgerState {
    fixture: LedgerFixture,
    fault: Option<LedgerFault>,
}

/// Tally source held in memory
///
/// Stands in for the ledger in tests. Mutators mimic the state changes that
/// external voter and admin collaborators cause on the real ledger.
#[derive(Debug)]
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryLedger {
    pub fn new(fixture: LedgerFixture) -> Self {
        Self {
            state: RwLock::new(LedgerState {
                fixture,
                fault: None,
            }),
        }
    }

    /// Record one vote for `candidate_id`
    pub fn cast_vote(&self, candidate_id: u64) -> Result<()> {
        let mut state = self.write()?;
        let candidate = state
            .fixture
            .candidates
            .iter_mut()
            .find(|c| c.id == candidate_id)
            .ok_or_else(|| {
                Error::validation("candidateId", format!("unknown candidate {candidate_id}"))
            })?;
        candidate.vote_count += 1;
        Ok(())
    }

    pub fn register_voters(&self, count: u64) -> Result<()> {
        self.write()?.fixture.total_voters += count;
        Ok(())
    }

    pub fn set_fault(&self, fault: Option<LedgerFault>) -> Result<()> {
        self.write()?.fault = fault;
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&LedgerFixture) -> T) -> Result<T> {
        let state = self
            .state
            .read()
            .map_err(|_| Error::internal("Failed to read ledger state"))?;
        match state.fault {
            Some(LedgerFault::Unavailable) => Err(Error::data_unavailable("in-memory ledger")),
            Some(LedgerFault::Broken) => Err(Error::internal("in-memory ledger is broken")),
            None => Ok(f(&state.fixture)),
        }
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, LedgerState>> {
        self.state
            .write()
            .map_err(|_| Error::internal("Failed to lock ledger state"))
    }
}

impl TallySource for InMemoryLedger {
    fn source_name(&self) -> &str {
        "in-memory ledger"
    }

    fn get_election_status(&self) -> Result<ElectionStatus> {
        self.read(|f| f.status)
    }

    fn get_all_regions(&self) -> Result<Vec<String>> {
        self.read(|f| f.regions.clone())
    }

    fn get_total_voters(&self) -> Result<u64> {
        self.read(|f| f.total_voters)
    }

    fn candidate_count(&self) -> Result<u64> {
        self.read(|f| f.candidates.len() as u64)
    }

    fn get_results(&self, position: Position) -> Result<PositionResults> {
        self.read(|f| {
            let mut results = PositionResults::default();
            for c in f.candidates.iter().filter(|c| c.position == position) {
                results.ids.push(c.id);
                results.names.push(c.name.clone());
                results.parties.push(c.party.clone());
                results.image_urls.push(c.image_url.clone());
                results.vote_counts.push(c.vote_count);
                results.total_votes += c.vote_count;
            }
            results
        })
    }

    fn candidate_region(&self, candidate_id: u64) -> Result<Option<String>> {
        self.read(|f| {
            f.candidates
                .iter()
                .find(|c| c.id == candidate_id)
                .map(|c| c.region.clone())
                .filter(|region| !region.is_empty())
        })
    }
}
