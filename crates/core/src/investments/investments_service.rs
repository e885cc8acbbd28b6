//! Deposit-side service.
//!
//! Fetches the caller and pool once, runs the eligibility gate, and on
//! approval persists the CONFIRMED investment atomically with the pool
//! increment. Rejections surface as [`Error::Rejected`] with the gate's
//! reason and persist nothing.

use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use rust_decimal::Decimal;

use super::eligibility::{
    validate_deposit, validate_sensitive_action, GateContext, GateDecision, RejectionReason,
    SensitiveAction,
};
use super::investments_model::{Investment, NewInvestment};
use super::investments_traits::{InvestmentRepositoryTrait, InvestmentServiceTrait};
use crate::errors::{Error, Result};
use crate::events::{EngineEvent, NotificationSink};
use crate::pools::pools_model::Pool;
use crate::pools::pools_traits::PoolRepositoryTrait;
use crate::users::UserRepositoryTrait;
use crate::utils::Clock;

/// Service for gated capital movements into pools.
pub struct InvestmentService {
    users: Arc<dyn UserRepositoryTrait>,
    pools: Arc<dyn PoolRepositoryTrait>,
    investments: Arc<dyn InvestmentRepositoryTrait>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
}

impl InvestmentService {
    pub fn new(
        users: Arc<dyn UserRepositoryTrait>,
        pools: Arc<dyn PoolRepositoryTrait>,
        investments: Arc<dyn InvestmentRepositoryTrait>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            pools,
            investments,
            sink,
            clock,
        }
    }

    /// Gathers the gate inputs for one operation. A missing user or pool
    /// maps to the `UnknownUserOrPool` rejection rather than a NotFound.
    fn gate_inputs(
        &self,
        user_id: &str,
        pool_id: &str,
    ) -> Result<Option<(GateContext, Pool, Decimal)>> {
        let now = self.clock.now();
        let user = match self.users.get_by_id(user_id) {
            Ok(user) => user,
            Err(Error::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let pool = match self.pools.get_by_id(pool_id) {
            Ok(pool) => pool,
            Err(Error::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let open_exposure = self.investments.open_exposure(user_id, pool_id)?;
        Ok(Some((GateContext::for_user(&user, now), pool, open_exposure)))
    }
}

#[async_trait]
impl InvestmentServiceTrait for InvestmentService {
    fn validate(&self, user_id: &str, pool_id: &str, amount: Decimal) -> Result<GateDecision> {
        let Some((ctx, pool, open_exposure)) = self.gate_inputs(user_id, pool_id)? else {
            return Ok(GateDecision::Rejected(RejectionReason::UnknownUserOrPool));
        };
        Ok(validate_deposit(
            &ctx,
            &pool,
            open_exposure,
            amount,
            self.clock.now(),
        ))
    }

    async fn deposit(&self, user_id: &str, pool_id: &str, amount: Decimal) -> Result<Investment> {
        let decision = self.validate(user_id, pool_id, amount)?;
        if let GateDecision::Rejected(reason) = decision {
            return Err(Error::Rejected(reason));
        }

        // The repository re-checks pool status and hard cap at the write
        // point, closing the gate-to-write race.
        let (investment, pool) = self
            .investments
            .create_confirmed(NewInvestment {
                pool_id: pool_id.to_string(),
                user_id: user_id.to_string(),
                amount,
            })
            .await?;

        info!(
            "deposit accepted: {} into pool {} by user {} (investment {})",
            amount, pool.id, user_id, investment.id
        );
        self.sink.notify_user(
            user_id,
            EngineEvent::InvestmentConfirmed {
                investment_id: investment.id.clone(),
                pool_id: pool.id,
                amount,
            },
        );
        Ok(investment)
    }

    fn authorize_sensitive_action(&self, user_id: &str, action: SensitiveAction) -> Result<()> {
        let user = match self.users.get_by_id(user_id) {
            Ok(user) => user,
            Err(Error::NotFound { .. }) => {
                return Err(Error::Rejected(RejectionReason::UnknownUserOrPool))
            }
            Err(e) => return Err(e),
        };
        let ctx = GateContext::for_user(&user, self.clock.now());
        validate_sensitive_action(&ctx, action)
            .into_result()
            .map_err(Error::Rejected)
    }

    fn get_investment(&self, investment_id: &str) -> Result<Investment> {
        self.investments.get_by_id(investment_id)
    }

    fn list_user_investments(&self, user_id: &str) -> Result<Vec<Investment>> {
        self.investments.list_by_user(user_id)
    }
}
