//! # Core Types for the Election Analytics Engine
//!
//! This module defines the data model shared by every stage of the pipeline:
//! the read-only ledger view (candidates, regions, election status) and the
//! derived regional statistics produced on every refresh.
//!
//! ## Ownership
//!
//! - [`Candidate`] and [`ElectionStatus`] are owned and mutated by the external
//!   ledger. This crate only reads them.
//! - [`RegionalStat`] is derived. It is recomputed from scratch on every refresh
//!   and is never persisted as a source of truth.
//!
//! ## Usage Examples
//!
//! ```rust
//! use election_analytics::types::{Candidate, Position};
//!
//! let candidate = Candidate {
//!     id: 1,
//!     name: "Ada Obi".to_string(),
//!     party: "Unity".to_string(),
//!     position: Position::President,
//!     region: String::new(),
//!     image_url: String::new(),
//!     vote_count: 120,
//! };
//!
//! assert!(candidate.validate().is_ok());
//! assert_eq!(candidate.display_region(), "National");
//! ```

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unix timestamp in seconds, as exposed by the ledger
///
/// A value of `0` means the period has not been configured yet.
pub type Timestamp = i64;

/// Office a candidate runs for
///
/// The president race is national; senator and governor races are scoped to
/// a single region.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    President,
    Senator,
    Governor,
}

impl Position {
    /// Every position, in ledger order
    pub const ALL: [Position; 3] = [Position::President, Position::Senator, Position::Governor];

    /// The identifier the ledger uses for this position
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::President => "president",
            Position::Senator => "senator",
            Position::Governor => "governor",
        }
    }

    /// Whether candidates for this position belong to a region
    pub fn is_regional(&self) -> bool {
        !matches!(self, Position::President)
    }

    /// Offset of this position in [`Position::ALL`]
    pub fn index(&self) -> usize {
        match self {
            Position::President => 0,
            Position::Senator => 1,
            Position::Governor => 2,
        }
    }
}

/// Position whose ballots count as "votes cast" for turnout
///
/// Every voter casts exactly one presidential ballot, so summing that race
/// counts participants once instead of once per office.
pub const TURNOUT_REFERENCE_POSITION: Position = Position::President;

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "president" => Ok(Position::President),
            "senator" => Ok(Position::Senator),
            "governor" => Ok(Position::Governor),
            other => Err(Error::validation(
                "position",
                format!("unknown position '{other}'"),
            )),
        }
    }
}

/// A candidate as read from the ledger
///
/// # Invariants
///
/// - `id` is unique across all positions
/// - `region` is empty if and only if `position` is [`Position::President`]
/// - `vote_count` never decreases during normal operation
///
/// The ledger's result listing does not always expose the region of a
/// regional candidate; in that case `region` is left empty and
/// [`Candidate::display_region`] falls back to `"Regional"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Candidate {
    /// Unique candidate identifier assigned by the ledger
    pub id: u64,

    /// Display name as it appears on the ballot
    pub name: String,

    /// Party affiliation
    pub party: String,

    /// Office the candidate runs for
    pub position: Position,

    /// Region for senator and governor candidates; empty for president
    #[serde(default)]
    pub region: String,

    /// Portrait URL, passed through to reports untouched
    #[serde(default)]
    pub image_url: String,

    /// Authoritative national vote count from the ledger
    pub vote_count: u64,
}

impl Candidate {
    /// Check the position/region pairing
    ///
    /// A president candidate must not carry a region. A regional candidate
    /// with an empty region is accepted because the ledger does not always
    /// report it.
    pub fn validate(&self) -> Result<()> {
        if !self.position.is_regional() && !self.region.is_empty() {
            return Err(Error::validation(
                "region",
                format!(
                    "president candidate {} must not be bound to region '{}'",
                    self.id, self.region
                ),
            ));
        }
        Ok(())
    }

    /// Region label used by reports
    pub fn display_region(&self) -> &str {
        match self.position {
            Position::President => "National",
            _ if self.region.is_empty() => "Regional",
            _ => &self.region,
        }
    }
}

/// Registration and voting windows as exposed by the ledger
///
/// Each period satisfies `end >= start` once configured. Unconfigured
/// periods are reported by the ledger as zero timestamps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ElectionStatus {
    pub registration_active: bool,
    pub voting_active: bool,
    pub registration_start: Timestamp,
    pub registration_end: Timestamp,
    pub voting_start: Timestamp,
    pub voting_end: Timestamp,
}

/// Coarse lifecycle phase derived from [`ElectionStatus`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ElectionPhase {
    NotStarted,
    Registration,
    Voting,
    Closed,
}

impl ElectionStatus {
    /// Ensure every configured period ends no earlier than it starts
    pub fn validate(&self) -> Result<()> {
        if self.registration_end < self.registration_start {
            return Err(Error::validation(
                "registrationEnd",
                "registration period ends before it starts",
            ));
        }
        if self.voting_end < self.voting_start {
            return Err(Error::validation(
                "votingEnd",
                "voting period ends before it starts",
            ));
        }
        Ok(())
    }

    pub fn registration_label(&self) -> &'static str {
        active_label(self.registration_active)
    }

    pub fn voting_label(&self) -> &'static str {
        active_label(self.voting_active)
    }

    /// Phase of the election at `now`
    ///
    /// The ledger's administrative toggles take precedence over the
    /// configured windows, so an emergency stop reads as `Closed` once the
    /// voting window has opened.
    pub fn phase(&self, now: DateTime<Utc>) -> ElectionPhase {
        let now = now.timestamp();

        if self.voting_active {
            return ElectionPhase::Voting;
        }
        if self.registration_active {
            return ElectionPhase::Registration;
        }
        if self.voting_start > 0 && now >= self.voting_start {
            return ElectionPhase::Closed;
        }
        if self.registration_end > 0 && now > self.registration_end {
            return ElectionPhase::Closed;
        }
        ElectionPhase::NotStarted
    }
}

fn active_label(active: bool) -> &'static str {
    if active { "Active" } else { "Inactive" }
}

/// Where regional figures come from
///
/// Consumers must surface [`Provenance::Estimated`] figures as estimates,
/// never as ground truth.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Provenance {
    /// Apportioned from national totals by a deterministic model
    Estimated,
    /// Reported per region by an authoritative source
    Observed,
}

/// Votes attributed to one candidate within one region
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateVotes {
    pub candidate_id: u64,
    pub votes: u64,
}

/// Per-region turnout and vote figures for one position
///
/// Derived on every refresh; see [`crate::analytics::distributor`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegionalStat {
    /// Region name
    pub region: String,

    /// Registered voters attributed to the region
    pub total_voters: u64,

    /// Votes attributed to the region
    pub total_votes: u64,

    /// `total_votes / total_voters * 100`, clamped to `[0, 100]`
    pub turnout: f64,

    /// Per-candidate votes in candidate-list order
    pub candidate_votes: Vec<CandidateVotes>,
}

impl RegionalStat {
    /// A region with no attributed votes
    pub fn empty<'a>(
        region: impl Into<String>,
        candidates: impl IntoIterator<Item = &'a Candidate>,
    ) -> Self {
        Self {
            region: region.into(),
            total_voters: 0,
            total_votes: 0,
            turnout: 0.0,
            candidate_votes: candidates
                .into_iter()
                .map(|c| CandidateVotes {
                    candidate_id: c.id,
                    votes: 0,
                })
                .collect(),
        }
    }

    /// Sum of per-candidate votes in this region
    pub fn candidate_vote_total(&self) -> u64 {
        self.candidate_votes.iter().map(|cv| cv.votes).sum()
    }

    /// Votes attributed to `candidate_id`, zero when absent
    pub fn votes_for(&self, candidate_id: u64) -> u64 {
        self.candidate_votes
            .iter()
            .find(|cv| cv.candidate_id == candidate_id)
            .map_or(0, |cv| cv.votes)
    }
}

/// Deployment facts stamped into system reports and snapshots
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemInfo {
    /// Ledger administrator address, when known
    pub admin_address: Option<String>,
    /// Address of the operator requesting the report
    pub current_user: Option<String>,
    pub contract_status: String,
    pub system_version: String,
    pub network: String,
    pub total_transactions: Option<u64>,
    pub system_health: String,
}

impl SystemInfo {
    pub fn from_config(config: &crate::config::AnalyticsConfig) -> Self {
        Self {
            system_version: config.system_version.clone(),
            network: config.network.clone(),
            ..Self::default()
        }
    }

    pub fn with_operator(mut self, admin: Option<String>, current_user: Option<String>) -> Self {
        self.admin_address = admin;
        self.current_user = current_user;
        self
    }

    /// Whether the current user is the ledger administrator
    ///
    /// Addresses compare case-insensitively.
    pub fn is_admin(&self) -> bool {
        match (&self.admin_address, &self.current_user) {
            (Some(admin), Some(user)) => admin.eq_ignore_ascii_case(user),
            _ => false,
        }
    }
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            admin_address: None,
            current_user: None,
            contract_status: "Active".to_string(),
            system_version: crate::VERSION.to_string(),
            network: "Local/Testnet".to_string(),
            total_transactions: None,
            system_health: "Good".to_string(),
        }
    }
}

/// Candidate and vote counts for one display region, indexed by [`Position::index`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegionTotals {
    pub candidates: [u64; 3],
    pub votes: [u64; 3],
}

impl RegionTotals {
    /// Totals per display region, in order of first appearance
    pub fn by_region(candidates: &[Candidate]) -> Vec<(String, RegionTotals)> {
        let mut regions: Vec<(String, RegionTotals)> = Vec::new();

        for candidate in candidates {
            let region = candidate.display_region();
            let idx = match regions.iter().position(|(name, _)| name == region) {
                Some(idx) => idx,
                None => {
                    regions.push((region.to_string(), RegionTotals::default()));
                    regions.len() - 1
                }
            };
            let totals = &mut regions[idx].1;
            let pos = candidate.position.index();
            totals.candidates[pos] += 1;
            totals.votes[pos] += candidate.vote_count;
        }

        regions
    }

    pub fn total_candidates(&self) -> u64 {
        self.candidates.iter().sum()
    }

    pub fn total_votes(&self) -> u64 {
        self.votes.iter().sum()
    }
}

/// Turnout percentage in `[0, 100]`; zero when there are no voters
pub fn turnout_percent(votes: u64, voters: u64) -> f64 {
    if voters == 0 {
        return 0.0;
    }
    (votes as f64 / voters as f64 * 100.0).clamp(0.0, 100.0)
}
