//! Manager and admin pool operations.

use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};

use super::pools_model::{NewPool, Pool, PoolStatus, PoolUpdate};
use super::pools_traits::{PoolRepositoryTrait, PoolServiceTrait};
use crate::errors::{Error, Result, ValidationError};
use crate::events::{EngineEvent, NotificationSink};
use crate::investments::eligibility::{
    validate_sensitive_action, GateContext, RejectionReason, SensitiveAction,
};
use crate::investments::investments_traits::InvestmentRepositoryTrait;

/// Service for pool administration: creation, publishing, emergency
/// controls, housekeeping.
pub struct PoolService {
    pools: Arc<dyn PoolRepositoryTrait>,
    investments: Arc<dyn InvestmentRepositoryTrait>,
    sink: Arc<dyn NotificationSink>,
}

impl PoolService {
    pub fn new(
        pools: Arc<dyn PoolRepositoryTrait>,
        investments: Arc<dyn InvestmentRepositoryTrait>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            pools,
            investments,
            sink,
        }
    }

    /// The pool's manager and admins may manage it; everyone else is
    /// rejected.
    fn authorize_manager(pool: &Pool, actor: &GateContext) -> Result<()> {
        if actor.user_id == pool.manager_id || actor.role.is_admin() {
            return Ok(());
        }
        Err(Error::Rejected(RejectionReason::NotAuthorized))
    }

    fn authorize_sensitive(actor: &GateContext, action: SensitiveAction) -> Result<()> {
        validate_sensitive_action(actor, action)
            .into_result()
            .map_err(Error::Rejected)
    }

    /// Publishing requires the full, ordered lifecycle schedule so every
    /// scheduler guard is well-defined from PENDING onward.
    fn validate_schedule(pool: &Pool) -> Result<()> {
        let (Some(start), Some(end), Some(settle)) =
            (pool.start_date, pool.end_date, pool.settle_date)
        else {
            return Err(Error::Validation(ValidationError::MissingField(
                "startDate/endDate/settleDate".to_string(),
            )));
        };
        if start >= end || end > settle {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Pool dates must satisfy startDate < endDate <= settleDate".to_string(),
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PoolServiceTrait for PoolService {
    async fn create_pool(&self, new_pool: NewPool) -> Result<Pool> {
        let pool = self.pools.create(new_pool).await?;
        info!("pool {} created in draft by manager {}", pool.id, pool.manager_id);
        Ok(pool)
    }

    async fn update_pool(&self, update: PoolUpdate, actor: &GateContext) -> Result<Pool> {
        let pool = self.pools.get_by_id(&update.id)?;
        Self::authorize_manager(&pool, actor)?;

        if !matches!(pool.status, PoolStatus::Draft | PoolStatus::Pending) {
            return Err(Error::state_conflict(format!(
                "pool {} is {}, only draft or pending pools can be edited",
                pool.id, pool.status
            )));
        }
        self.pools.update(update).await
    }

    async fn publish(&self, pool_id: &str, actor: &GateContext) -> Result<Pool> {
        let pool = self.pools.get_by_id(pool_id)?;
        Self::authorize_manager(&pool, actor)?;
        Self::validate_schedule(&pool)?;

        let pool = self
            .pools
            .transition_status(pool_id, &[PoolStatus::Draft], PoolStatus::Pending)
            .await?;
        info!("pool {} published by {}", pool_id, actor.user_id);
        Ok(pool)
    }

    async fn delete_pool(&self, pool_id: &str, actor: &GateContext) -> Result<()> {
        let pool = self.pools.get_by_id(pool_id)?;
        Self::authorize_manager(&pool, actor)?;
        self.pools.delete_draft(pool_id).await?;
        info!("draft pool {} deleted by {}", pool_id, actor.user_id);
        Ok(())
    }

    async fn emergency_stop(
        &self,
        pool_id: &str,
        actor: &GateContext,
        target: PoolStatus,
    ) -> Result<Pool> {
        if !matches!(target, PoolStatus::Cancelled | PoolStatus::Closed) {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "emergency stop target must be cancelled or closed, got {target}"
            ))));
        }
        Self::authorize_sensitive(actor, SensitiveAction::EmergencyStop)?;

        let pool = self
            .pools
            .transition_status(pool_id, PoolStatus::non_terminal(), target)
            .await?;

        warn!(
            "pool {} emergency-stopped to {} by {}",
            pool_id, target, actor.user_id
        );
        self.sink.broadcast(EngineEvent::PoolStopped {
            pool_id: pool_id.to_string(),
            stopped_by: actor.user_id.clone(),
        });
        Ok(pool)
    }

    async fn force_settlement(&self, pool_id: &str, actor: &GateContext) -> Result<Pool> {
        Self::authorize_sensitive(actor, SensitiveAction::ForceSettlement)?;

        let pool = self
            .pools
            .transition_status(pool_id, &[PoolStatus::Closed], PoolStatus::Settlement)
            .await?;
        let completed_investments = self.investments.complete_open_investments(pool_id).await?;

        info!(
            "pool {} forced into settlement by {} ({} positions completed)",
            pool_id, actor.user_id, completed_investments
        );
        self.sink.broadcast(EngineEvent::PoolSettling {
            pool_id: pool_id.to_string(),
            completed_investments,
        });
        Ok(pool)
    }

    async fn archive(&self, pool_id: &str, actor: &GateContext) -> Result<Pool> {
        if !actor.role.is_admin() {
            return Err(Error::Rejected(RejectionReason::NotAuthorized));
        }
        self.pools
            .transition_status(pool_id, &[PoolStatus::Closed], PoolStatus::Archived)
            .await
    }

    fn get_pool(&self, pool_id: &str) -> Result<Pool> {
        self.pools.get_by_id(pool_id)
    }
}
