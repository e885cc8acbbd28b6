//! Pool repository, service, and adapter traits.
//!
//! The repository trait is ledger-agnostic: concrete stores implement the
//! conditional writes the engine's concurrency model depends on.

use async_trait::async_trait;

use super::pools_model::{NewPool, Pool, PoolStatus, PoolUpdate};
use crate::errors::Result;
use crate::investments::eligibility::GateContext;

/// Contract for pool persistence.
///
/// `transition_status` is the single conditional-write primitive every
/// status mutation goes through. Two concurrent writers racing on the same
/// pool therefore serialize on the store: the loser observes a
/// `StateConflict` instead of silently overwriting.
#[async_trait]
pub trait PoolRepositoryTrait: Send + Sync {
    /// Retrieves a pool by id.
    fn get_by_id(&self, pool_id: &str) -> Result<Pool>;

    /// Lists pools whose status is in `statuses`.
    fn list_by_status(&self, statuses: &[PoolStatus]) -> Result<Vec<Pool>>;

    /// Creates a new pool in DRAFT.
    async fn create(&self, new_pool: NewPool) -> Result<Pool>;

    /// Updates a pool's editable fields.
    async fn update(&self, update: PoolUpdate) -> Result<Pool>;

    /// Conditionally moves a pool from one of `from` to `to` in a single
    /// atomic write.
    ///
    /// Fails with `StateConflict` when the pool's current status is not in
    /// `from` or the transition is not legal, leaving the record untouched.
    async fn transition_status(
        &self,
        pool_id: &str,
        from: &[PoolStatus],
        to: PoolStatus,
    ) -> Result<Pool>;

    /// Removes a DRAFT pool. A pool that has ever received capital is never
    /// hard-deleted; any other status fails with `StateConflict`.
    async fn delete_draft(&self, pool_id: &str) -> Result<()>;
}

/// Contract for manager/admin pool operations.
#[async_trait]
pub trait PoolServiceTrait: Send + Sync {
    /// Creates a pool in DRAFT, owned by its manager.
    async fn create_pool(&self, new_pool: NewPool) -> Result<Pool>;

    /// Edits a pool that has not started trading yet (DRAFT or PENDING);
    /// caller must be the pool's manager or an admin.
    async fn update_pool(&self, update: PoolUpdate, actor: &GateContext) -> Result<Pool>;

    /// Publishes a DRAFT pool, opening it for deposits. Requires the
    /// lifecycle dates to be set and ordered.
    async fn publish(&self, pool_id: &str, actor: &GateContext) -> Result<Pool>;

    /// Deletes a pool that is still in DRAFT; caller must be the pool's
    /// manager or an admin.
    async fn delete_pool(&self, pool_id: &str, actor: &GateContext) -> Result<()>;

    /// Unconditionally stops a pool from any non-terminal state.
    ///
    /// `target` must be CANCELLED or CLOSED. Restricted to super admins via
    /// the sensitive-action gate.
    async fn emergency_stop(
        &self,
        pool_id: &str,
        actor: &GateContext,
        target: PoolStatus,
    ) -> Result<Pool>;

    /// Moves a CLOSED pool into SETTLEMENT ahead of its settle date.
    /// Restricted to super admins via the sensitive-action gate.
    async fn force_settlement(&self, pool_id: &str, actor: &GateContext) -> Result<Pool>;

    /// Archives a CLOSED pool. Admin-only housekeeping.
    async fn archive(&self, pool_id: &str, actor: &GateContext) -> Result<Pool>;

    /// Retrieves a pool by id.
    fn get_pool(&self, pool_id: &str) -> Result<Pool>;
}

/// Contract for the scheduler-driven lifecycle sweep.
#[async_trait]
pub trait LifecycleServiceTrait: Send + Sync {
    /// Applies every due time-based transition once.
    ///
    /// Idempotent: a second pass over the same wall-clock instant finds no
    /// matching pools and changes nothing.
    async fn tick(&self) -> Result<super::lifecycle_service::LifecycleTickSummary>;
}

/// External trading system the engine delegates position settlement to.
///
/// Calls are made after the settlement transition is already persisted;
/// failures are logged and never block the lifecycle batch.
#[async_trait]
pub trait TradingAdapterTrait: Send + Sync {
    /// Requests settlement of a pool's open positions.
    async fn settle_positions(&self, pool: &Pool) -> Result<()>;
}

/// Default adapter for deployments where settlement is handled out of band.
#[derive(Clone, Default)]
pub struct NoOpTradingAdapter;

#[async_trait]
impl TradingAdapterTrait for NoOpTradingAdapter {
    async fn settle_positions(&self, _pool: &Pool) -> Result<()> {
        Ok(())
    }
}
