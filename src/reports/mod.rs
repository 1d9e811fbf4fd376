//! Schema-stable tabular reports
//!
//! Every [`ReportKind`] has a fixed, ordered column list. Records always carry
//! exactly those columns in that order, so exports stay machine-parseable
//! across releases.

pub mod generator;

pub use generator::{ReportContext, ReportGenerator};

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ReportKind {
    VoterTurnout,
    RegisteredVotersSummary,
    CandidatesReport,
    GeographicalDistribution,
    DetailedResults,
    ElectionAudit,
    SystemLog,
}

const VOTER_TURNOUT_COLUMNS: &[&str] = &[
    "TotalRegisteredVoters",
    "TotalVotesCast",
    "VoterTurnoutPercent",
    "RemainingVoters",
    "ReportDate",
    "ReportTime",
];

const REGISTERED_VOTERS_COLUMNS: &[&str] = &[
    "TotalRegisteredVoters",
    "RegistrationStatus",
    "RegistrationStart",
    "RegistrationEnd",
    "ReportDate",
];

const CANDIDATES_COLUMNS: &[&str] = &[
    "CandidateId",
    "Name",
    "Party",
    "Position",
    "Region",
    "VotesReceived",
    "ImageUrl",
];

const GEOGRAPHICAL_COLUMNS: &[&str] = &[
    "Region",
    "TotalCandidates",
    "TotalVotes",
    "PresidentCandidates",
    "SenatorCandidates",
    "GovernorCandidates",
    "PresidentVotes",
    "SenatorVotes",
    "GovernorVotes",
];

const DETAILED_RESULTS_COLUMNS: &[&str] = &[
    "CandidateId",
    "Name",
    "Party",
    "Position",
    "Region",
    "VotesReceived",
    "PercentageOfTotalVotes",
    "ImageUrl",
    "ReportDate",
];

const ELECTION_AUDIT_COLUMNS: &[&str] = &[
    "ElectionStatus",
    "RegistrationStatus",
    "TotalRegisteredVoters",
    "TotalCandidates",
    "TotalVotesCast",
    "VoterTurnoutPercent",
    "NumberOfRegions",
    "RegistrationStart",
    "RegistrationEnd",
    "VotingStart",
    "VotingEnd",
    "AuditDate",
    "AuditTime",
];

const SYSTEM_LOG_COLUMNS: &[&str] = &[
    "AdminAddress",
    "CurrentUser",
    "IsAdmin",
    "ContractStatus",
    "LastUpdated",
    "SystemVersion",
    "BlockchainNetwork",
    "TotalTransactions",
    "SystemHealth",
];

impl ReportKind {
    pub const ALL: [ReportKind; 7] = [
        ReportKind::VoterTurnout,
        ReportKind::RegisteredVotersSummary,
        ReportKind::CandidatesReport,
        ReportKind::GeographicalDistribution,
        ReportKind::DetailedResults,
        ReportKind::ElectionAudit,
        ReportKind::SystemLog,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ReportKind::VoterTurnout => "VoterTurnout",
            ReportKind::RegisteredVotersSummary => "RegisteredVotersSummary",
            ReportKind::CandidatesReport => "CandidatesReport",
            ReportKind::GeographicalDistribution => "GeographicalDistribution",
            ReportKind::DetailedResults => "DetailedResults",
            ReportKind::ElectionAudit => "ElectionAudit",
            ReportKind::SystemLog => "SystemLog",
        }
    }

    /// Ordered column names; part of the export contract
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            ReportKind::VoterTurnout => VOTER_TURNOUT_COLUMNS,
            ReportKind::RegisteredVotersSummary => REGISTERED_VOTERS_COLUMNS,
            ReportKind::CandidatesReport => CANDIDATES_COLUMNS,
            ReportKind::GeographicalDistribution => GEOGRAPHICAL_COLUMNS,
            ReportKind::DetailedResults => DETAILED_RESULTS_COLUMNS,
            ReportKind::ElectionAudit => ELECTION_AUDIT_COLUMNS,
            ReportKind::SystemLog => SYSTEM_LOG_COLUMNS,
        }
    }

    /// File name prefix used for exports
    pub fn file_stem(&self) -> &'static str {
        match self {
            ReportKind::VoterTurnout => "voter_turnout_report",
            ReportKind::RegisteredVotersSummary => "registered_voters_summary",
            ReportKind::CandidatesReport => "candidates_report",
            ReportKind::GeographicalDistribution => "geographical_distribution",
            ReportKind::DetailedResults => "detailed_results",
            ReportKind::ElectionAudit => "election_audit_report",
            ReportKind::SystemLog => "system_logs",
        }
    }

    /// Whether rows come one-per-candidate (or per candidate region)
    ///
    /// Only these kinds can be empty; summary kinds always yield one row.
    pub fn is_candidate_backed(&self) -> bool {
        matches!(
            self,
            ReportKind::CandidatesReport
                | ReportKind::GeographicalDistribution
                | ReportKind::DetailedResults
        )
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ReportKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| Error::validation("kind", format!("unsupported report kind '{s}'")))
    }
}

/// One report row: column name to rendered value, in schema order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(&'static str, String)>,
}

impl Record {
    /// Pair `values` with `columns` positionally
    ///
    /// Callers build values in schema order; a length mismatch is a bug in
    /// the generator, caught by the tests below.
    pub(crate) fn from_values(columns: &'static [&'static str], values: Vec<String>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self {
            fields: columns.iter().copied().zip(values).collect(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(name, _)| *name)
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, value)| value.as_str())
    }
}

/// A populated report
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub kind: ReportKind,
    pub generated_at: DateTime<Utc>,
    pub records: Vec<Record>,
}

impl Report {
    pub fn columns(&self) -> &'static [&'static str] {
        self.kind.columns()
    }

    /// `<stem>_<YYYY-MM-DD>.csv`
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}.csv",
            self.kind.file_stem(),
            self.generated_at.format("%Y-%m-%d")
        )
    }

    /// Header row followed by one line per record, every value quoted
    pub fn to_csv(&self) -> String {
        let mut lines = Vec::with_capacity(self.records.len() + 1);
        lines.push(self.columns().join(","));

        for record in &self.records {
            let row: Vec<String> = record.values().map(quote).collect();
            lines.push(row.join(","));
        }

        lines.join("\n")
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Signal that a report had nothing to list
///
/// Distinct from a zero-row success so callers can warn instead of exporting
/// a headers-only file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyReport {
    pub kind: ReportKind,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    Generated(Report),
    Empty(EmptyReport),
}

impl ReportOutcome {
    pub fn is_empty(&self) -> bool {
        matches!(self, ReportOutcome::Empty(_))
    }

    pub fn report(&self) -> Option<&Report> {
        match self {
            ReportOutcome::Generated(report) => Some(report),
            ReportOutcome::Empty(_) => None,
        }
    }

    pub fn into_report(self) -> Option<Report> {
        match self {
            ReportOutcome::Generated(report) => Some(report),
            ReportOutcome::Empty(_) => None,
        }
    }
}
