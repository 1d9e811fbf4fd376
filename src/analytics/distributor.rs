//! Regional apportionment of national vote totals
//!
//! The ledger only exposes position-level aggregates, so per-region figures
//! come from an [`EstimationStrategy`]. [`RegionalDistributor`] is the
//! deterministic model used today; [`ObservedRegionalTallies`] lets a real
//! per-region feed replace it without touching the analytics contract.

use crate::types::{Candidate, CandidateVotes, Provenance, RegionalStat, turnout_percent};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Base turnout weight of the first region in each cycle, in percent
const BASE_WEIGHT_PCT: u128 = 70;

/// Weight added per position within the cycle, in percent
const WEIGHT_STEP_PCT: u128 = 15;

/// Number of regions before the weight pattern repeats
const WEIGHT_CYCLE: usize = 3;

/// Registered voters per modeled vote, in tenths (1.3)
const VOTER_FACTOR_TENTHS: u128 = 13;

/// Produces per-region statistics for one position
pub trait EstimationStrategy: Send + Sync {
    /// Whether the output is modeled or observed
    fn provenance(&self) -> Provenance;

    /// Per-region statistics for `candidates`, one entry per region in order
    ///
    /// Must not fail; missing data degrades to zero-valued regions.
    fn distribute(
        &self,
        regions: &[String],
        candidates: &[Candidate],
        total_position_votes: u64,
    ) -> Vec<RegionalStat>;
}

/// Output of a strategy run, tagged with its provenance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegionalEstimate {
    pub provenance: Provenance,
    pub stats: Vec<RegionalStat>,
}

impl RegionalEstimate {
    pub fn run(
        strategy: &dyn EstimationStrategy,
        regions: &[String],
        candidates: &[Candidate],
        total_position_votes: u64,
    ) -> Self {
        Self {
            provenance: strategy.provenance(),
            stats: strategy.distribute(regions, candidates, total_position_votes),
        }
    }

    pub fn is_estimate(&self) -> bool {
        self.provenance == Provenance::Estimated
    }
}

/// Whether `candidate` is bound to one of `regions`
///
/// President candidates, and regional candidates whose region the ledger did
/// not report, are not bound and contest every region.
fn is_bound(candidate: &Candidate, regions: &[String]) -> bool {
    !candidate.region.is_empty() && regions.iter().any(|r| *r == candidate.region)
}

/// Candidates on the ballot in `region`, in candidate-list order
pub fn contested_in<'a>(
    region: &str,
    regions: &[String],
    candidates: &'a [Candidate],
) -> Vec<&'a Candidate> {
    candidates
        .iter()
        .filter(|c| c.region == region || !is_bound(c, regions))
        .collect()
}

/// Deterministic turnout-weighted apportionment
///
/// Votes of candidates bound to a region stay entirely in that region. The
/// remaining (unbound) votes are spread; for the region at index `r` of `R`
/// regions:
///
/// - `weight = 0.70 + (r mod 3) * 0.15`
/// - `region_votes = floor(unbound_total * weight / R)`
/// - `candidate_votes = floor(region_votes * candidate_total / unbound_total)`
///
/// and `region_voters = floor(all_region_votes * 1.3)`. A region lists only
/// the candidates contesting it.
///
/// Arithmetic is done on integers so every floor is exact and the sum of a
/// candidate's regional allocations never exceeds its national total.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionalDistributor;

impl RegionalDistributor {
    pub fn new() -> Self {
        Self
    }

    /// Turnout weight of the region at `index`, in percent
    pub fn weight_pct(index: usize) -> u64 {
        (BASE_WEIGHT_PCT + (index % WEIGHT_CYCLE) as u128 * WEIGHT_STEP_PCT) as u64
    }

    fn region_votes(index: usize, region_count: usize, total: u64) -> u64 {
        let weight = Self::weight_pct(index) as u128;
        (total as u128 * weight / (100 * region_count as u128)) as u64
    }
}

impl EstimationStrategy for RegionalDistributor {
    fn provenance(&self) -> Provenance {
        Provenance::Estimated
    }

    fn distribute(
        &self,
        regions: &[String],
        candidates: &[Candidate],
        total_position_votes: u64,
    ) -> Vec<RegionalStat> {
        if regions.is_empty() {
            if total_position_votes > 0 {
                tracing::warn!(
                    "⚠️  {} votes cannot be apportioned: no regions configured",
                    total_position_votes
                );
            }
            return Vec::new();
        }

        if total_position_votes == 0 {
            return regions
                .iter()
                .map(|region| {
                    RegionalStat::empty(region.clone(), contested_in(region, regions, candidates))
                })
                .collect();
        }

        let bound_total: u64 = candidates
            .iter()
            .filter(|c| is_bound(c, regions))
            .map(|c| c.vote_count)
            .sum();
        let unbound_total = total_position_votes.saturating_sub(bound_total);

        regions
            .iter()
            .enumerate()
            .map(|(index, region)| {
                let spread = if unbound_total == 0 {
                    0
                } else {
                    Self::region_votes(index, regions.len(), unbound_total)
                };

                let candidate_votes: Vec<CandidateVotes> = contested_in(region, regions, candidates)
                    .into_iter()
                    .map(|c| {
                        let votes = if is_bound(c, regions) {
                            c.vote_count
                        } else if unbound_total == 0 {
                            0
                        } else {
                            (spread as u128 * c.vote_count as u128 / unbound_total as u128) as u64
                        };
                        CandidateVotes {
                            candidate_id: c.id,
                            votes,
                        }
                    })
                    .collect();

                let bound_votes: u64 = candidates
                    .iter()
                    .filter(|c| c.region == *region && is_bound(c, regions))
                    .map(|c| c.vote_count)
                    .sum();
                let total_votes = spread + bound_votes;
                let total_voters = (total_votes as u128 * VOTER_FACTOR_TENTHS / 10) as u64;

                RegionalStat {
                    region: region.clone(),
                    total_voters,
                    total_votes,
                    turnout: turnout_percent(total_votes, total_voters),
                    candidate_votes,
                }
            })
            .collect()
    }
}

/// Per-region figures reported by an authoritative feed
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObservedRegion {
    pub total_voters: u64,
    pub candidate_votes: HashMap<u64, u64>,
}

/// Strategy that serves real per-region tallies
///
/// Regions absent from the feed read as zero.
#[derive(Debug, Clone, Default)]
pub struct ObservedRegionalTallies {
    regions: HashMap<String, ObservedRegion>,
}

impl ObservedRegionalTallies {
    pub fn new(regions: HashMap<String, ObservedRegion>) -> Self {
        Self { regions }
    }
}

impl EstimationStrategy for ObservedRegionalTallies {
    fn provenance(&self) -> Provenance {
        Provenance::Observed
    }

    fn distribute(
        &self,
        regions: &[String],
        candidates: &[Candidate],
        _total_position_votes: u64,
    ) -> Vec<RegionalStat> {
        regions
            .iter()
            .map(|region| {
                let contested = contested_in(region, regions, candidates);
                let Some(observed) = self.regions.get(region) else {
                    return RegionalStat::empty(region.clone(), contested);
                };

                let candidate_votes: Vec<CandidateVotes> = contested
                    .into_iter()
                    .map(|c| CandidateVotes {
                        candidate_id: c.id,
                        votes: observed.candidate_votes.get(&c.id).copied().unwrap_or(0),
                    })
                    .collect();
                let total_votes = candidate_votes.iter().map(|cv| cv.votes).sum();

                RegionalStat {
                    region: region.clone(),
                    total_voters: observed.total_voters,
                    total_votes,
                    turnout: turnout_percent(total_votes, observed.total_voters),
                    candidate_votes,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;

    fn regions(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Region {i}")).collect()
    }

    fn candidates(votes: &[u64]) -> Vec<Candidate> {
        votes
            .iter()
            .enumerate()
            .map(|(i, &vote_count)| Candidate {
                id: i as u64 + 1,
                name: format!("Candidate {}", i + 1),
                party: "Party".to_string(),
                position: Position::Senator,
                region: String::new(),
                image_url: String::new(),
                vote_count,
            })
            .collect()
    }

    #[test]
    fn test_weights_cycle() {
        assert_eq!(RegionalDistributor::weight_pct(0), 70);
        assert_eq!(RegionalDistributor::weight_pct(1), 85);
        assert_eq!(RegionalDistributor::weight_pct(2), 100);
        assert_eq!(RegionalDistributor::weight_pct(3), 70);
    }

    #[test]
    fn test_known_apportionment() {
        let cands = candidates(&[600, 400]);
        let stats = RegionalDistributor.distribute(&regions(3), &cands, 1000);

        assert_eq!(stats.len(), 3);
        // floor(1000 * 0.70 / 3) = 233
        assert_eq!(stats[0].total_votes, 233);
        assert_eq!(stats[0].total_voters, 302);
        assert_eq!(stats[0].votes_for(1), 139);
        assert_eq!(stats[0].votes_for(2), 93);
        // floor(1000 * 0.85 / 3) = 283
        assert_eq!(stats[1].total_votes, 283);
        // floor(1000 * 1.00 / 3) = 333
        assert_eq!(stats[2].total_votes, 333);
        assert_eq!(stats[2].total_voters, 432);
    }

    #[test]
    fn test_zero_votes_yield_zero_regions() {
        for n in 0..5 {
            let stats = RegionalDistributor.distribute(&regions(n), &candidates(&[0, 0]), 0);
            assert_eq!(stats.len(), n);
            for stat in stats {
                assert_eq!(stat.total_votes, 0);
                assert_eq!(stat.total_voters, 0);
                assert_eq!(stat.turnout, 0.0);
                assert!(stat.candidate_votes.iter().all(|cv| cv.votes == 0));
            }
        }
    }

    #[test]
    fn test_no_regions_is_empty_not_error() {
        let stats = RegionalDistributor.distribute(&[], &candidates(&[10]), 10);
        assert!(stats.is_empty());
    }

    #[test]
    fn test_allocations_never_exceed_national_totals() {
        let votes = [1, 7, 999, 12_345, 0, 3];
        let total: u64 = votes.iter().sum();
        let cands = candidates(&votes);

        for n in 1..12 {
            let stats = RegionalDistributor.distribute(&regions(n), &cands, total);
            for c in &cands {
                let allocated: u64 = stats.iter().map(|s| s.votes_for(c.id)).sum();
                assert!(allocated <= c.vote_count, "overshoot for {} with {n} regions", c.id);
            }
            for stat in &stats {
                assert!(stat.candidate_vote_total() <= stat.total_votes);
                assert!((0.0..=100.0).contains(&stat.turnout));
            }
        }
    }

    #[test]
    fn test_deterministic_output() {
        let cands = candidates(&[55, 45, 10]);
        let first = RegionalDistributor.distribute(&regions(7), &cands, 110);
        let second = RegionalDistributor.distribute(&regions(7), &cands, 110);
        assert_eq!(first, second);
    }

    #[test]
    fn test_estimate_is_tagged() {
        let estimate = RegionalEstimate::run(&RegionalDistributor, &regions(2), &candidates(&[5]), 5);
        assert!(estimate.is_estimate());
    }

    #[test]
    fn test_observed_strategy_reads_feed() {
        let mut feed = HashMap::new();
        feed.insert(
            "Region 0".to_string(),
            ObservedRegion {
                total_voters: 20,
                candidate_votes: HashMap::from([(1, 8), (2, 2)]),
            },
        );
        let strategy = ObservedRegionalTallies::new(feed);
        let estimate = RegionalEstimate::run(&strategy, &regions(2), &candidates(&[8, 2]), 10);

        assert!(!estimate.is_estimate());
        assert_eq!(estimate.stats[0].total_votes, 10);
        assert_eq!(estimate.stats[0].turnout, 50.0);
        assert_eq!(estimate.stats[1].total_votes, 0);
    }

    fn bound(id: u64, region: &str, vote_count: u64) -> Candidate {
        Candidate {
            id,
            name: format!("Candidate {id}"),
            party: "Party".to_string(),
            position: Position::Governor,
            region: region.to_string(),
            image_url: String::new(),
            vote_count,
        }
    }

    #[test]
    fn test_bound_candidates_stay_in_their_region() {
        let cands = vec![bound(1, "Region 0", 210), bound(2, "Region 1", 200), bound(3, "Region 0", 90)];
        let stats = RegionalDistributor.distribute(&regions(3), &cands, 500);

        assert_eq!(stats[0].votes_for(1), 210);
        assert_eq!(stats[0].votes_for(3), 90);
        assert_eq!(stats[0].total_votes, 300);
        assert_eq!(stats[0].total_voters, 390);
        assert_eq!(stats[1].votes_for(2), 200);
        for (i, stat) in stats.iter().enumerate() {
            let listed: Vec<u64> = stat.candidate_votes.iter().map(|cv| cv.candidate_id).collect();
            match i {
                0 => assert_eq!(listed, vec![1, 3]),
                1 => assert_eq!(listed, vec![2]),
                _ => assert!(listed.is_empty()),
            }
        }
        assert_eq!(stats[2].total_votes, 0);
    }

    #[test]
    fn test_unknown_region_is_spread_alongside_bound_votes() {
        // candidate 2's region is not reported by the ledger
        let cands = vec![bound(1, "Region 0", 100), bound(2, "", 300)];
        let stats = RegionalDistributor.distribute(&regions(3), &cands, 400);

        // floor(300 * 0.70 / 3) = 70 spread into Region 0
        assert_eq!(stats[0].votes_for(1), 100);
        assert_eq!(stats[0].votes_for(2), 70);
        assert_eq!(stats[0].total_votes, 170);
        assert_eq!(stats[1].votes_for(1), 0);
        assert_eq!(stats[1].votes_for(2), 85);
        let spread: u64 = stats.iter().map(|s| s.votes_for(2)).sum();
        assert!(spread <= 300);
    }

    #[test]
    fn test_observed_strategy_lists_only_contesting_candidates() {
        let feed = HashMap::from([(
            "Region 1".to_string(),
            ObservedRegion {
                total_voters: 50,
                candidate_votes: HashMap::from([(2, 30)]),
            },
        )]);
        let cands = vec![bound(1, "Region 0", 10), bound(2, "Region 1", 30)];
        let stats = ObservedRegionalTallies::new(feed).distribute(&regions(2), &cands, 40);

        assert_eq!(stats[0].candidate_votes.len(), 1);
        assert_eq!(stats[1].candidate_votes.len(), 1);
        assert_eq!(stats[1].votes_for(2), 30);
    }
}
