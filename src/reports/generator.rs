//! Rendering of each report kind from a [`ReportContext`]

use super::{EmptyReport, Record, Report, ReportKind, ReportOutcome};
use crate::ledger::TallySnapshot;
use crate::types::{
    Candidate, ElectionStatus, RegionTotals, SystemInfo, Timestamp, turnout_percent,
};
use crate::{Error, Result};
use chrono::{DateTime, Utc};

/// Everything a report can draw on, read once per export
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub status: ElectionStatus,
    pub total_voters: u64,
    pub total_votes_cast: u64,
    pub candidate_count: u64,
    pub region_count: usize,
    pub candidates: Vec<Candidate>,
    pub system: SystemInfo,
    pub generated_at: DateTime<Utc>,
}

impl ReportContext {
    /// A context holding only voter totals
    pub fn new(total_voters: u64, total_votes_cast: u64) -> Self {
        Self {
            status: ElectionStatus::default(),
            total_voters,
            total_votes_cast,
            candidate_count: 0,
            region_count: 0,
            candidates: Vec::new(),
            system: SystemInfo::default(),
            generated_at: Utc::now(),
        }
    }

    /// Context for the state captured in `tally`
    pub fn from_tally(tally: &TallySnapshot, system: SystemInfo) -> Self {
        Self {
            status: tally.status,
            total_voters: tally.total_voters,
            total_votes_cast: tally.votes_cast(),
            candidate_count: tally.candidate_count,
            region_count: tally.regions.len(),
            candidates: tally.candidates.clone(),
            system,
            generated_at: Utc::now(),
        }
    }

    pub fn with_candidates(mut self, candidates: Vec<Candidate>) -> Self {
        self.candidate_count = candidates.len() as u64;
        self.candidates = candidates;
        self
    }

    pub fn at(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = generated_at;
        self
    }

    fn turnout(&self) -> f64 {
        turnout_percent(self.total_votes_cast, self.total_voters)
    }
}

/// Renders reports; holds no state between calls
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportGenerator;

impl ReportGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate the report named `kind`
    ///
    /// Unknown names fail with [`Error::Validation`].
    pub fn generate_named(&self, kind: &str, ctx: &ReportContext) -> Result<ReportOutcome> {
        let kind: ReportKind = kind.parse()?;
        self.generate(kind, ctx)
    }

    /// Generate `kind` from `ctx`
    ///
    /// Candidate-backed kinds return [`ReportOutcome::Empty`] when the
    /// context lists no candidates.
    pub fn generate(&self, kind: ReportKind, ctx: &ReportContext) -> Result<ReportOutcome> {
        ctx.status.validate()?;

        if kind.is_candidate_backed() && ctx.candidates.is_empty() {
            tracing::debug!("📭 {} has no candidates to report", kind);
            return Ok(ReportOutcome::Empty(EmptyReport {
                kind,
                reason: "No data available for download".to_string(),
            }));
        }

        let rows = match kind {
            ReportKind::VoterTurnout => vec![voter_turnout(ctx)],
            ReportKind::RegisteredVotersSummary => vec![registered_voters(ctx)],
            ReportKind::CandidatesReport => ctx.candidates.iter().map(candidate_row).collect(),
            ReportKind::GeographicalDistribution => geographical_distribution(&ctx.candidates),
            ReportKind::DetailedResults => ctx
                .candidates
                .iter()
                .map(|c| detailed_result(c, ctx))
                .collect(),
            ReportKind::ElectionAudit => vec![election_audit(ctx)],
            ReportKind::SystemLog => vec![system_log(ctx)],
        };

        let columns = kind.columns();
        let records = rows
            .into_iter()
            .map(|values| {
                if values.len() != columns.len() {
                    return Err(Error::internal(format!(
                        "{kind} row has {} values for {} columns",
                        values.len(),
                        columns.len()
                    )));
                }
                Ok(Record::from_values(columns, values))
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!("📄 Generated {} with {} rows", kind, records.len());

        Ok(ReportOutcome::Generated(Report {
            kind,
            generated_at: ctx.generated_at,
            records,
        }))
    }
}

/// Two decimals, no sign
fn percent(value: f64) -> String {
    format!("{value:.2}")
}

/// Two decimals followed by `%`
fn percent_with_sign(value: f64) -> String {
    format!("{value:.2}%")
}

fn format_timestamp(timestamp: Timestamp) -> String {
    if timestamp == 0 {
        return "Not set".to_string();
    }
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "Invalid".to_string())
}

fn report_date(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

fn report_time(at: &DateTime<Utc>) -> String {
    at.format("%H:%M:%S").to_string()
}

fn voter_turnout(ctx: &ReportContext) -> Vec<String> {
    vec![
        ctx.total_voters.to_string(),
        ctx.total_votes_cast.to_string(),
        percent(ctx.turnout()),
        ctx.total_voters.saturating_sub(ctx.total_votes_cast).to_string(),
        report_date(&ctx.generated_at),
        report_time(&ctx.generated_at),
    ]
}

fn registered_voters(ctx: &ReportContext) -> Vec<String> {
    vec![
        ctx.total_voters.to_string(),
        ctx.status.registration_label().to_string(),
        format_timestamp(ctx.status.registration_start),
        format_timestamp(ctx.status.registration_end),
        report_date(&ctx.generated_at),
    ]
}

fn candidate_row(candidate: &Candidate) -> Vec<String> {
    vec![
        candidate.id.to_string(),
        candidate.name.clone(),
        candidate.party.clone(),
        candidate.position.to_string(),
        candidate.display_region().to_string(),
        candidate.vote_count.to_string(),
        candidate.image_url.clone(),
    ]
}

fn geographical_distribution(candidates: &[Candidate]) -> Vec<Vec<String>> {
    RegionTotals::by_region(candidates)
        .into_iter()
        .map(|(region, totals)| {
            vec![
                region,
                totals.total_candidates().to_string(),
                totals.total_votes().to_string(),
                totals.candidates[0].to_string(),
                totals.candidates[1].to_string(),
                totals.candidates[2].to_string(),
                totals.votes[0].to_string(),
                totals.votes[1].to_string(),
                totals.votes[2].to_string(),
            ]
        })
        .collect()
}

/// Share is taken against registered voters, not against ballots cast
fn detailed_result(candidate: &Candidate, ctx: &ReportContext) -> Vec<String> {
    vec![
        candidate.id.to_string(),
        candidate.name.clone(),
        candidate.party.clone(),
        candidate.position.to_string(),
        candidate.display_region().to_string(),
        candidate.vote_count.to_string(),
        percent_with_sign(turnout_percent(candidate.vote_count, ctx.total_voters)),
        candidate.image_url.clone(),
        report_date(&ctx.generated_at),
    ]
}

fn election_audit(ctx: &ReportContext) -> Vec<String> {
    vec![
        ctx.status.voting_label().to_string(),
        ctx.status.registration_label().to_string(),
        ctx.total_voters.to_string(),
        ctx.candidate_count.to_string(),
        ctx.total_votes_cast.to_string(),
        percent(ctx.turnout()),
        ctx.region_count.to_string(),
        format_timestamp(ctx.status.registration_start),
        format_timestamp(ctx.status.registration_end),
        format_timestamp(ctx.status.voting_start),
        format_timestamp(ctx.status.voting_end),
        report_date(&ctx.generated_at),
        report_time(&ctx.generated_at),
    ]
}

fn system_log(ctx: &ReportContext) -> Vec<String> {
    let system = &ctx.system;
    vec![
        system
            .admin_address
            .clone()
            .unwrap_or_else(|| "Not set".to_string()),
        system
            .current_user
            .clone()
            .unwrap_or_else(|| "Not connected".to_string()),
        (if system.is_admin() { "Yes" } else { "No" }).to_string(),
        system.contract_status.clone(),
        ctx.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        system.system_version.clone(),
        system.network.clone(),
        system
            .total_transactions
            .map_or_else(|| "N/A".to_string(), |n| n.to_string()),
        system.system_health.clone(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;
    use chrono::TimeZone;

    fn candidate(id: u64, position: Position, region: &str, votes: u64) -> Candidate {
        Candidate {
            id,
            name: format!("Candidate {id}"),
            party: "Unity".to_string(),
            position,
            region: region.to_string(),
            image_url: format!("https://img.example/{id}.png"),
            vote_count: votes,
        }
    }

    fn ctx() -> ReportContext {
        ReportContext::new(1000, 650)
            .with_candidates(vec![
                candidate(1, Position::President, "", 400),
                candidate(2, Position::President, "", 250),
                candidate(3, Position::Senator, "North", 120),
                candidate(4, Position::Governor, "North", 80),
                candidate(5, Position::Senator, "", 7),
            ])
            .at(Utc.with_ymd_and_hms(2026, 5, 1, 8, 30, 5).unwrap())
    }

    fn generate(kind: ReportKind, ctx: &ReportContext) -> Report {
        ReportGenerator
            .generate(kind, ctx)
            .unwrap()
            .into_report()
            .expect("report should be populated")
    }

    #[test]
    fn test_voter_turnout_percent() {
        let report = generate(ReportKind::VoterTurnout, &ReportContext::new(1000, 650));
        let row = &report.records[0];
        assert_eq!(row.get("VoterTurnoutPercent"), Some("65.00"));
        assert_eq!(row.get("RemainingVoters"), Some("350"));
    }

    #[test]
    fn test_full_turnout_is_exactly_one_hundred() {
        let report = generate(ReportKind::VoterTurnout, &ReportContext::new(40, 40));
        assert_eq!(report.records[0].get("VoterTurnoutPercent"), Some("100.00"));
    }

    #[test]
    fn test_every_kind_matches_its_schema() {
        let ctx = ctx();
        for kind in ReportKind::ALL {
            let report = generate(kind, &ctx);
            assert!(!report.records.is_empty());
            for record in &report.records {
                assert_eq!(record.columns().collect::<Vec<_>>(), kind.columns());
            }
        }
    }

    #[test]
    fn test_geographical_groups_by_display_region() {
        let report = generate(ReportKind::GeographicalDistribution, &ctx());
        let regions: Vec<&str> = report
            .records
            .iter()
            .filter_map(|r| r.get("Region"))
            .collect();
        assert_eq!(regions, vec!["National", "North", "Regional"]);

        let north = &report.records[1];
        assert_eq!(north.get("TotalCandidates"), Some("2"));
        assert_eq!(north.get("TotalVotes"), Some("200"));
        assert_eq!(north.get("SenatorVotes"), Some("120"));
        assert_eq!(north.get("GovernorCandidates"), Some("1"));
        assert_eq!(north.get("PresidentVotes"), Some("0"));
    }

    #[test]
    fn test_detailed_results_percentages() {
        let report = generate(ReportKind::DetailedResults, &ctx());
        assert_eq!(report.records[0].get("PercentageOfTotalVotes"), Some("40.00%"));
        assert_eq!(report.records[4].get("PercentageOfTotalVotes"), Some("0.70%"));
        assert_eq!(report.records[0].get("ReportDate"), Some("2026-05-01"));

        let no_voters = ctx().with_candidates(vec![candidate(1, Position::President, "", 3)]);
        let no_voters = ReportContext {
            total_voters: 0,
            ..no_voters
        };
        let report = generate(ReportKind::DetailedResults, &no_voters);
        assert_eq!(report.records[0].get("PercentageOfTotalVotes"), Some("0.00%"));
    }

    #[test]
    fn test_empty_candidate_list_signals_empty() {
        let empty = ReportContext::new(10, 0);
        for kind in ReportKind::ALL.into_iter().filter(|k| k.is_candidate_backed()) {
            let outcome = ReportGenerator.generate(kind, &empty).unwrap();
            assert!(outcome.is_empty(), "{kind} should signal empty");
        }
        assert!(!ReportGenerator
            .generate(ReportKind::ElectionAudit, &empty)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let err = ReportGenerator
            .generate_named("VoterTurnoutReport", &ctx())
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_invalid_status_is_rejected() {
        let mut bad = ctx();
        bad.status.voting_start = 10;
        bad.status.voting_end = 5;
        assert!(ReportGenerator.generate(ReportKind::ElectionAudit, &bad).is_err());
    }

    #[test]
    fn test_audit_and_system_rows() {
        let mut ctx = ctx();
        ctx.status.registration_start = 1_767_225_600; // 2026-01-01 00:00:00
        ctx.region_count = 4;
        ctx.system = SystemInfo::default().with_operator(Some("0xAA".into()), None);

        let audit = generate(ReportKind::ElectionAudit, &ctx);
        let row = &audit.records[0];
        assert_eq!(row.get("RegistrationStart"), Some("2026-01-01 00:00:00 UTC"));
        assert_eq!(row.get("VotingEnd"), Some("Not set"));
        assert_eq!(row.get("NumberOfRegions"), Some("4"));
        assert_eq!(row.get("TotalCandidates"), Some("5"));
        assert_eq!(row.get("AuditTime"), Some("08:30:05"));

        let system = generate(ReportKind::SystemLog, &ctx);
        let row = &system.records[0];
        assert_eq!(row.get("AdminAddress"), Some("0xAA"));
        assert_eq!(row.get("CurrentUser"), Some("Not connected"));
        assert_eq!(row.get("IsAdmin"), Some("No"));
        assert_eq!(row.get("TotalTransactions"), Some("N/A"));
    }

    #[test]
    fn test_schema_is_stable_between_calls() {
        let ctx = ctx();
        let first = generate(ReportKind::DetailedResults, &ctx);
        let second = generate(ReportKind::DetailedResults, &ctx);
        assert_eq!(first.to_csv(), second.to_csv());
    }
}
