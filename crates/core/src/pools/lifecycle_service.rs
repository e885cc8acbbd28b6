//! Scheduler-driven pool lifecycle sweep.
//!
//! Each tick scans for pools whose wall-clock guard has come due and applies
//! the transition through the store's conditional write. A pool that already
//! moved (another tick, an emergency stop) makes the write fail with a
//! conflict, which the sweep discards; events are only emitted for writes
//! that actually landed, so re-running a tick never duplicates them.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use super::pools_model::{Pool, PoolStatus};
use super::pools_traits::{LifecycleServiceTrait, PoolRepositoryTrait, TradingAdapterTrait};
use crate::errors::{Error, Result};
use crate::events::{EngineEvent, NotificationSink};
use crate::investments::investments_traits::InvestmentRepositoryTrait;
use crate::utils::Clock;

/// Upper bound on a single settlement-adapter call so one slow pool cannot
/// starve the rest of the sweep.
const SETTLE_CALL_TIMEOUT_SECS: u64 = 10;

/// Counters for one lifecycle sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleTickSummary {
    pub activated: usize,
    pub closed: usize,
    pub settling: usize,
    /// Pools whose transition failed and will be retried next tick.
    pub failed: usize,
}

/// Applies time-based pool transitions on a fixed cadence.
pub struct LifecycleService {
    pools: Arc<dyn PoolRepositoryTrait>,
    investments: Arc<dyn InvestmentRepositoryTrait>,
    trading: Arc<dyn TradingAdapterTrait>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
}

impl LifecycleService {
    pub fn new(
        pools: Arc<dyn PoolRepositoryTrait>,
        investments: Arc<dyn InvestmentRepositoryTrait>,
        trading: Arc<dyn TradingAdapterTrait>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pools,
            investments,
            trading,
            sink,
            clock,
        }
    }

    /// Applies one guarded transition to every matching pool, isolating
    /// per-pool failures. Returns (transitioned pools, failure count).
    async fn sweep(
        &self,
        from: PoolStatus,
        to: PoolStatus,
        due: impl Fn(&Pool) -> Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(Vec<Pool>, usize)> {
        let candidates = self.pools.list_by_status(&[from])?;
        let mut transitioned = Vec::new();
        let mut failed = 0;

        for pool in candidates {
            if !due(&pool).is_some_and(|at| at <= now) {
                continue;
            }
            match self.pools.transition_status(&pool.id, &[from], to).await {
                Ok(updated) => {
                    info!("pool {} moved {} -> {}", pool.id, from, to);
                    transitioned.push(updated);
                }
                Err(Error::StateConflict(_)) => {
                    // Another writer got there first; nothing to redo.
                    debug!("pool {} already left {}, skipping", pool.id, from);
                }
                Err(e) => {
                    error!("failed to move pool {} from {} to {}: {}", pool.id, from, to, e);
                    failed += 1;
                }
            }
        }
        Ok((transitioned, failed))
    }

    async fn enter_settlement(&self, pool: &Pool) {
        let completed_investments = match self.investments.complete_open_investments(&pool.id).await
        {
            Ok(count) => count,
            Err(e) => {
                error!("failed to complete positions of pool {}: {}", pool.id, e);
                0
            }
        };

        self.sink.broadcast(EngineEvent::PoolSettling {
            pool_id: pool.id.clone(),
            completed_investments,
        });

        // Settlement itself belongs to the trading side; a slow or failing
        // adapter is logged and retried out of band, never holding up the
        // rest of the batch.
        let settle_timeout = std::time::Duration::from_secs(SETTLE_CALL_TIMEOUT_SECS);
        match tokio::time::timeout(settle_timeout, self.trading.settle_positions(pool)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("settlement adapter failed for pool {}: {}", pool.id, e);
            }
            Err(_) => {
                warn!(
                    "settlement adapter timed out for pool {} after {:?}",
                    pool.id, settle_timeout
                );
            }
        }
    }
}

#[async_trait]
impl LifecycleServiceTrait for LifecycleService {
    async fn tick(&self) -> Result<LifecycleTickSummary> {
        let now = self.clock.now();
        let mut summary = LifecycleTickSummary::default();

        let (activated, failed) = self
            .sweep(PoolStatus::Pending, PoolStatus::Active, |p| p.start_date, now)
            .await?;
        summary.failed += failed;
        for pool in &activated {
            self.sink.broadcast(EngineEvent::PoolActivated {
                pool_id: pool.id.clone(),
            });
        }
        summary.activated = activated.len();

        let (closed, failed) = self
            .sweep(PoolStatus::Active, PoolStatus::Closed, |p| p.end_date, now)
            .await?;
        summary.failed += failed;
        for pool in &closed {
            self.sink.broadcast(EngineEvent::PoolClosed {
                pool_id: pool.id.clone(),
            });
        }
        summary.closed = closed.len();

        let (settling, failed) = self
            .sweep(
                PoolStatus::Closed,
                PoolStatus::Settlement,
                |p| p.settle_date,
                now,
            )
            .await?;
        summary.failed += failed;
        for pool in &settling {
            self.enter_settlement(pool).await;
        }
        summary.settling = settling.len();

        Ok(summary)
    }
}
