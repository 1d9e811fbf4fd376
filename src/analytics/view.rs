//! Published analytics view and its refresh contract
//!
//! Each refresh recomputes everything from a fresh [`TallySnapshot`] into a
//! new [`PublishedView`], then swaps the shared `Arc` in one step. Readers
//! hold whichever `Arc` they fetched and never see a half-built view. A failed
//! or timed-out refresh leaves the previous view in place.

use super::engine::{AnalyticsEngine, AnalyticsResult};
use crate::ledger::{TallySnapshot, TallySource};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;

/// Why a refresh ran
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RefreshTrigger {
    Poll,
    VoteCast,
    VoterRegistered,
    ResultsUpdated,
    Manual,
}

/// A fully computed view, immutable once published
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedView {
    pub generation: u64,
    pub trigger: RefreshTrigger,
    pub refreshed_at: DateTime<Utc>,
    pub tally: TallySnapshot,
    pub analytics: AnalyticsResult,
}

/// A computed view that has not been published yet
#[derive(Debug, Clone)]
pub struct ViewUpdate {
    trigger: RefreshTrigger,
    tally: TallySnapshot,
    analytics: AnalyticsResult,
}

/// Holder of the currently published analytics view
pub struct AnalyticsView {
    engine: AnalyticsEngine,
    current: RwLock<Arc<PublishedView>>,
    generation: AtomicU64,
}

impl AnalyticsView {
    /// Build the first view from `source`
    ///
    /// Fails only when the source fails with something other than
    /// `DataUnavailable`, in which case there is no valid view to publish.
    pub fn new(engine: AnalyticsEngine, source: &dyn TallySource) -> Result<Self> {
        let tally = TallySnapshot::capture(source)?;
        let analytics = engine.compute(&tally);

        let initial = PublishedView {
            generation: 1,
            trigger: RefreshTrigger::Manual,
            refreshed_at: Utc::now(),
            tally,
            analytics,
        };

        Ok(Self {
            engine,
            current: RwLock::new(Arc::new(initial)),
            generation: AtomicU64::new(1),
        })
    }

    /// The currently published view
    pub fn current(&self) -> Result<Arc<PublishedView>> {
        self.current
            .read()
            .map(|view| Arc::clone(&view))
            .map_err(|_| Error::internal("Failed to read published view"))
    }

    /// Compute a new view without publishing it
    pub fn prepare(&self, source: &dyn TallySource, trigger: RefreshTrigger) -> Result<ViewUpdate> {
        let tally = TallySnapshot::capture(source)?;
        let analytics = self.engine.compute(&tally);
        Ok(ViewUpdate {
            trigger,
            tally,
            analytics,
        })
    }

    /// Swap `update` in as the published view
    pub fn publish(&self, update: ViewUpdate) -> Result<Arc<PublishedView>> {
        let mut current = self
            .current
            .write()
            .map_err(|_| Error::internal("Failed to lock published view"))?;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let view = Arc::new(PublishedView {
            generation,
            trigger: update.trigger,
            refreshed_at: Utc::now(),
            tally: update.tally,
            analytics: update.analytics,
        });
        *current = Arc::clone(&view);

        tracing::debug!(
            "🔄 Published analytics view #{} ({:?})",
            generation,
            view.trigger
        );
        Ok(view)
    }

    /// Recompute from `source` and publish; the old view stays on failure
    pub fn refresh(
        &self,
        source: &dyn TallySource,
        trigger: RefreshTrigger,
    ) -> Result<Arc<PublishedView>> {
        match self.prepare(source, trigger) {
            Ok(update) => self.publish(update),
            Err(err) => {
                tracing::warn!("⚠️  Refresh ({:?}) failed, keeping last view: {}", trigger, err);
                Err(err)
            }
        }
    }
}

/// Counters returned when a refresh loop stops
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshLoopStats {
    pub refreshes: u64,
    pub failures: u64,
    pub timeouts: u64,
}

/// Shortest poll interval the refresh loop accepts
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(100);

/// Refresh on every trigger and every `interval` tick until `triggers` closes
///
/// The caller spawns this on its own runtime. Each refresh runs on the
/// blocking pool and is abandoned after `timeout`, leaving the last good view
/// published. Intervals below [`MIN_REFRESH_INTERVAL`] are raised to it.
pub async fn run_refresh_loop(
    view: Arc<AnalyticsView>,
    source: Arc<dyn TallySource>,
    mut triggers: mpsc::Receiver<RefreshTrigger>,
    interval: Duration,
    timeout: Duration,
) -> RefreshLoopStats {
    let mut stats = RefreshLoopStats::default();
    if interval < MIN_REFRESH_INTERVAL {
        tracing::warn!(
            "⚠️  Refresh interval {:?} is below {:?}; using the minimum",
            interval,
            MIN_REFRESH_INTERVAL
        );
    }
    let mut ticker = tokio::time::interval(interval.max(MIN_REFRESH_INTERVAL));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // the first tick completes immediately
    ticker.tick().await;

    loop {
        let trigger = tokio::select! {
            received = triggers.recv() => match received {
                Some(trigger) => trigger,
                None => break,
            },
            _ = ticker.tick() => RefreshTrigger::Poll,
        };

        let task_view = Arc::clone(&view);
        let task_source = Arc::clone(&source);
        let prepared = tokio::time::timeout(
            timeout,
            tokio::task::spawn_blocking(move || task_view.prepare(task_source.as_ref(), trigger)),
        )
        .await;

        match prepared {
            Ok(Ok(Ok(update))) => match view.publish(update) {
                Ok(_) => stats.refreshes += 1,
                Err(err) => {
                    stats.failures += 1;
                    tracing::warn!("⚠️  Failed to publish view: {}", err);
                }
            },
            Ok(Ok(Err(err))) => {
                stats.failures += 1;
                tracing::warn!("⚠️  Refresh ({:?}) failed, keeping last view: {}", trigger, err);
            }
            Ok(Err(join_err)) => {
                stats.failures += 1;
                tracing::warn!("⚠️  Refresh task aborted: {}", join_err);
            }
            Err(_) => {
                stats.timeouts += 1;
                tracing::warn!("⏱️  Refresh ({:?}) timed out, keeping last view", trigger);
            }
        }
    }

    tracing::info!(
        "🛑 Refresh loop stopped: {} refreshes, {} failures, {} timeouts",
        stats.refreshes,
        stats.failures,
        stats.timeouts
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{InMemoryLedger, LedgerFault, LedgerFixture};
    use crate::types::{Candidate, Position};

    fn ledger() -> InMemoryLedger {
        InMemoryLedger::new(LedgerFixture {
            regions: vec!["North".to_string(), "South".to_string()],
            total_voters: 50,
            candidates: vec![Candidate {
                id: 1,
                name: "Ada".to_string(),
                party: "Unity".to_string(),
                position: Position::President,
                region: String::new(),
                image_url: String::new(),
                vote_count: 10,
            }],
            ..LedgerFixture::default()
        })
    }

    #[test]
    fn test_refresh_publishes_new_generation() {
        let ledger = ledger();
        let view = AnalyticsView::new(AnalyticsEngine::default(), &ledger).unwrap();
        let before = view.current().unwrap();
        assert_eq!(before.generation, 1);

        ledger.cast_vote(1).unwrap();
        let after = view.refresh(&ledger, RefreshTrigger::VoteCast).unwrap();

        assert_eq!(after.generation, 2);
        assert_eq!(after.tally.total_votes_cast(), 11);
        // readers holding the old Arc keep a consistent view
        assert_eq!(before.tally.total_votes_cast(), 10);
    }

    #[test]
    fn test_failed_refresh_keeps_last_view() {
        let ledger = ledger();
        let view = AnalyticsView::new(AnalyticsEngine::default(), &ledger).unwrap();

        ledger.set_fault(Some(LedgerFault::Broken)).unwrap();
        assert!(view.refresh(&ledger, RefreshTrigger::Poll).is_err());

        let current = view.current().unwrap();
        assert_eq!(current.generation, 1);
        assert_eq!(current.tally.total_votes_cast(), 10);
    }

    #[tokio::test]
    async fn test_refresh_loop_runs_until_channel_closes() {
        let ledger = Arc::new(ledger());
        let view = Arc::new(AnalyticsView::new(AnalyticsEngine::default(), ledger.as_ref()).unwrap());
        let (tx, rx) = mpsc::channel(8);

        let handle = tokio::spawn(run_refresh_loop(
            Arc::clone(&view),
            ledger.clone() as Arc<dyn TallySource>,
            rx,
            Duration::from_secs(3600),
            Duration::from_secs(5),
        ));

        tx.send(RefreshTrigger::VoteCast).await.unwrap();
        tx.send(RefreshTrigger::ResultsUpdated).await.unwrap();
        drop(tx);

        let stats = handle.await.unwrap();
        assert_eq!(stats.refreshes, 2);
        assert_eq!(view.current().unwrap().generation, 3);
    }

    #[test]
    fn test_refresh_loop_exits_on_closed_channel() {
        let ledger = Arc::new(ledger());
        let view = Arc::new(AnalyticsView::new(AnalyticsEngine::default(), ledger.as_ref()).unwrap());
        let (tx, rx) = mpsc::channel::<RefreshTrigger>(1);
        drop(tx);

        let stats = tokio_test::block_on(run_refresh_loop(
            Arc::clone(&view),
            ledger as Arc<dyn TallySource>,
            rx,
            Duration::from_secs(3600),
            Duration::from_secs(5),
        ));

        assert_eq!(stats, RefreshLoopStats::default());
        assert_eq!(view.current().unwrap().generation, 1);
    }

    #[tokio::test]
    async fn test_zero_interval_is_raised_to_minimum() {
        let ledger = Arc::new(ledger());
        let view = Arc::new(AnalyticsView::new(AnalyticsEngine::default(), ledger.as_ref()).unwrap());
        let (tx, rx) = mpsc::channel(1);
        tx.send(RefreshTrigger::Manual).await.unwrap();
        drop(tx);

        let stats = run_refresh_loop(
            Arc::clone(&view),
            ledger as Arc<dyn TallySource>,
            rx,
            Duration::ZERO,
            Duration::from_secs(5),
        )
        .await;

        assert_eq!(stats.failures, 0);
        assert!(stats.refreshes >= 1);
        assert!(view.current().unwrap().generation >= 2);
    }
}
