//! Comparative statistics over regional figures
//!
//! Every function here is pure: same inputs, same outputs, no side effects.
//! Empty region or candidate lists produce well-formed zero/empty summaries.

use super::distributor::{EstimationStrategy, RegionalDistributor, RegionalEstimate};
use crate::ledger::TallySnapshot;
use crate::types::{Candidate, Position, Provenance, RegionalStat, turnout_percent};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Number of regions kept in the engagement and competitive rankings
pub const TOP_REGIONS: usize = 3;

/// Margin, as a fraction of the leader's votes, within which a region swings
pub const SWING_MARGIN_RATIO: f64 = 0.10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegionTurnout {
    pub region: String,
    pub turnout: f64,
    pub total_voters: u64,
    pub total_votes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwingRegion {
    pub region: String,
    pub max_votes: u64,
    pub min_votes: u64,
    pub margin: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompetitiveRegion {
    pub region: String,
    /// `None` when the region has no candidates for the position
    pub winning_candidate: Option<u64>,
    pub winning_votes: u64,
    pub total_region_votes: u64,
    pub winning_percentage: f64,
    pub turnout: f64,
}

/// Region where a candidate collected the most votes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateStronghold {
    pub candidate_id: u64,
    pub region: String,
    pub votes: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NationalTrend {
    pub total_voters: u64,
    pub total_votes: u64,
    pub overall_turnout: f64,
    pub region_count: usize,
    pub active_regions: usize,
}

/// Analytics for one position
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionAnalytics {
    pub position: Position,
    /// Regional figures are modeled unless this is `Observed`
    pub provenance: Provenance,
    pub regional: Vec<RegionalStat>,
    /// All regions, highest turnout first
    pub turnout_ranking: Vec<RegionTurnout>,
    pub highest_turnout: Option<RegionTurnout>,
    pub lowest_turnout: Option<RegionTurnout>,
    pub turnout_range: f64,
    pub average_turnout: f64,
    pub top_engagement: Vec<RegionTurnout>,
    pub swing_regions: Vec<SwingRegion>,
    pub competitive_regions: Vec<CompetitiveRegion>,
    pub strongholds: Vec<CandidateStronghold>,
    pub national_trend: NationalTrend,
}

impl PositionAnalytics {
    pub fn is_estimate(&self) -> bool {
        self.provenance == Provenance::Estimated
    }
}

/// Analytics for every position
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsResult {
    pub positions: Vec<PositionAnalytics>,
}

impl AnalyticsResult {
    pub fn position(&self, position: Position) -> Option<&PositionAnalytics> {
        self.positions.iter().find(|p| p.position == position)
    }

    pub fn swing_region_count(&self) -> usize {
        self.positions.iter().map(|p| p.swing_regions.len()).sum()
    }
}

/// Stateless analytics over a [`TallySnapshot`]
pub struct AnalyticsEngine {
    strategy: Box<dyn EstimationStrategy>,
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        Self::new(Box::new(RegionalDistributor::new()))
    }
}

impl AnalyticsEngine {
    pub fn new(strategy: Box<dyn EstimationStrategy>) -> Self {
        Self { strategy }
    }

    /// Compute analytics for every position in `tally`
    pub fn compute(&self, tally: &TallySnapshot) -> AnalyticsResult {
        let positions = Position::ALL
            .iter()
            .map(|&position| {
                let candidates = tally.candidates_for(position);
                let estimate = RegionalEstimate::run(
                    self.strategy.as_ref(),
                    &tally.regions,
                    &candidates,
                    tally.position_votes(position),
                );
                analyze_position(position, estimate, &candidates)
            })
            .collect();

        AnalyticsResult { positions }
    }
}

/// Derive every statistic for one position from its regional figures
pub fn analyze_position(
    position: Position,
    estimate: RegionalEstimate,
    candidates: &[Candidate],
) -> PositionAnalytics {
    let regional = estimate.stats;

    let turnout_ranking = rank_by_turnout(&regional);
    let highest_turnout = turnout_ranking.first().cloned();
    let lowest_turnout = turnout_ranking.last().cloned();
    let turnout_range = match (&highest_turnout, &lowest_turnout) {
        (Some(high), Some(low)) => high.turnout - low.turnout,
        _ => 0.0,
    };

    PositionAnalytics {
        position,
        provenance: estimate.provenance,
        average_turnout: average_turnout(&regional),
        top_engagement: top_engagement(&regional),
        swing_regions: regional.iter().filter_map(detect_swing).collect(),
        competitive_regions: rank_competitive(&regional),
        strongholds: strongholds(&regional, candidates),
        national_trend: national_trend(&regional),
        turnout_ranking,
        highest_turnout,
        lowest_turnout,
        turnout_range,
        regional,
    }
}

fn region_turnout(stat: &RegionalStat) -> RegionTurnout {
    RegionTurnout {
        region: stat.region.clone(),
        turnout: stat.turnout,
        total_voters: stat.total_voters,
        total_votes: stat.total_votes,
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Regions sorted by turnout, highest first; ties keep region order
pub fn rank_by_turnout(regional: &[RegionalStat]) -> Vec<RegionTurnout> {
    let mut ranking: Vec<RegionTurnout> = regional.iter().map(region_turnout).collect();
    ranking.sort_by(|a, b| descending(a.turnout, b.turnout));
    ranking
}

pub fn average_turnout(regional: &[RegionalStat]) -> f64 {
    if regional.is_empty() {
        return 0.0;
    }
    regional.iter().map(|s| s.turnout).sum::<f64>() / regional.len() as f64
}

/// The [`TOP_REGIONS`] regions with the most votes
pub fn top_engagement(regional: &[RegionalStat]) -> Vec<RegionTurnout> {
    let mut ranking: Vec<RegionTurnout> = regional.iter().map(region_turnout).collect();
    ranking.sort_by(|a, b| b.total_votes.cmp(&a.total_votes));
    ranking.truncate(TOP_REGIONS);
    ranking
}

/// Flag `stat` as a swing region when the race is within the margin
///
/// A region whose leader has no votes is never a swing region.
pub fn detect_swing(stat: &RegionalStat) -> Option<SwingRegion> {
    let max_votes = stat.candidate_votes.iter().map(|cv| cv.votes).max()?;
    let min_votes = stat.candidate_votes.iter().map(|cv| cv.votes).min()?;
    if max_votes == 0 {
        return None;
    }

    let margin = max_votes - min_votes;
    (margin as f64 <= SWING_MARGIN_RATIO * max_votes as f64).then(|| SwingRegion {
        region: stat.region.clone(),
        max_votes,
        min_votes,
        margin,
    })
}

/// Leading candidate of a region; on a tie the later-listed candidate leads
fn leader(stat: &RegionalStat) -> Option<(u64, u64)> {
    stat.candidate_votes
        .iter()
        .max_by_key(|cv| cv.votes)
        .map(|cv| (cv.candidate_id, cv.votes))
}

/// The [`TOP_REGIONS`] closest races, lowest winning percentage first
pub fn rank_competitive(regional: &[RegionalStat]) -> Vec<CompetitiveRegion> {
    let mut ranking: Vec<CompetitiveRegion> = regional
        .iter()
        .map(|stat| {
            let total_region_votes = stat.candidate_vote_total();
            let (winning_candidate, winning_votes) = match leader(stat) {
                Some((id, votes)) => (Some(id), votes),
                None => (None, 0),
            };

            CompetitiveRegion {
                region: stat.region.clone(),
                winning_candidate,
                winning_votes,
                total_region_votes,
                winning_percentage: turnout_percent(winning_votes, total_region_votes),
                turnout: stat.turnout,
            }
        })
        .collect();

    ranking.sort_by(|a, b| {
        a.winning_percentage
            .partial_cmp(&b.winning_percentage)
            .unwrap_or(Ordering::Equal)
    });
    ranking.truncate(TOP_REGIONS);
    ranking
}

/// Region with the most votes for each candidate; ties keep the first region
///
/// Only regions the candidate contests are considered.
pub fn strongholds(regional: &[RegionalStat], candidates: &[Candidate]) -> Vec<CandidateStronghold> {
    candidates
        .iter()
        .filter_map(|candidate| {
            let mut best: Option<(&RegionalStat, u64)> = None;
            for stat in regional {
                let Some(entry) = stat
                    .candidate_votes
                    .iter()
                    .find(|cv| cv.candidate_id == candidate.id)
                else {
                    continue;
                };
                let votes = entry.votes;
                if best.is_none_or(|(_, top)| votes > top) {
                    best = Some((stat, votes));
                }
            }
            best.map(|(stat, votes)| CandidateStronghold {
                candidate_id: candidate.id,
                region: stat.region.clone(),
                votes,
            })
        })
        .collect()
}

pub fn national_trend(regional: &[RegionalStat]) -> NationalTrend {
    let total_voters = regional.iter().map(|s| s.total_voters).sum();
    let total_votes = regional.iter().map(|s| s.total_votes).sum();

    NationalTrend {
        total_voters,
        total_votes,
        overall_turnout: turnout_percent(total_votes, total_voters),
        region_count: regional.len(),
        active_regions: regional.iter().filter(|s| s.total_votes > 0).count(),
    }
}
