//! Regional estimation and comparative analytics

pub mod distributor;
pub mod engine;
pub mod view;

pub use distributor::{
    EstimationStrategy, ObservedRegion, ObservedRegionalTallies, RegionalDistributor,
    RegionalEstimate,
};
pub use engine::{
    AnalyticsEngine, AnalyticsResult, CandidateStronghold, CompetitiveRegion, NationalTrend,
    PositionAnalytics, RegionTurnout, SwingRegion,
};
pub use view::{AnalyticsView, PublishedView, RefreshLoopStats, RefreshTrigger, run_refresh_loop};

use crate::ledger::TallySnapshot;

/// Compute analytics for `tally` with the default regional model
pub fn compute_analytics(tally: &TallySnapshot) -> AnalyticsResult {
    AnalyticsEngine::default().compute(tally)
}
