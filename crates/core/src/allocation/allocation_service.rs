//! Auto-reinvestment engine.
//!
//! Sweeps COMPLETED investments on a daily cadence and re-allocates matured
//! capital into open pools, or parks it for withdrawal when the investor
//! opted out or nothing can absorb it. Each investment is processed in
//! isolation: one failure is logged and counted, never aborting siblings.

use std::sync::Arc;

use async_trait::async_trait;
use log::{error, info};
use rust_decimal::Decimal;

use super::allocation_model::{AllocationRunSummary, AllocationTables, ReinvestmentOption};
use crate::errors::Result;
use crate::events::{EngineEvent, NotificationSink};
use crate::investments::investments_model::{Investment, InvestmentStatus};
use crate::investments::investments_traits::InvestmentRepositoryTrait;
use crate::pools::pools_model::{ModelType, PoolStatus};
use crate::pools::pools_traits::PoolRepositoryTrait;
use crate::users::UserRepositoryTrait;

/// Contract for the allocation engine.
#[async_trait]
pub trait AllocationServiceTrait: Send + Sync {
    /// Processes every COMPLETED investment once and returns the sweep
    /// counters.
    async fn run_cycle(&self) -> Result<AllocationRunSummary>;
}

/// Picks the destination for matured capital.
///
/// Evaluated in order: a candidate matching the origin pool's model, then
/// the designated fallback model, then the highest
/// `expected_return * risk_multiplier` score. `options` must already be
/// sorted by pool id; ties keep the first candidate, so the whole procedure
/// is deterministic.
pub fn select_destination<'a>(
    options: &'a [ReinvestmentOption],
    original_model: ModelType,
    tables: &AllocationTables,
) -> Option<&'a ReinvestmentOption> {
    if let Some(same_model) = options.iter().find(|o| o.model_type == original_model) {
        return Some(same_model);
    }

    if let Some(fallback) = options
        .iter()
        .find(|o| o.model_type == tables.preferred_fallback_model)
    {
        return Some(fallback);
    }

    options.iter().fold(None, |best, candidate| match best {
        None => Some(candidate),
        Some(current) if tables.score(candidate) > tables.score(current) => Some(candidate),
        Some(current) => Some(current),
    })
}

enum ProcessOutcome {
    Reinvested,
    Parked,
}

/// Daily re-allocation engine over matured investments.
pub struct AllocationEngine {
    users: Arc<dyn UserRepositoryTrait>,
    pools: Arc<dyn PoolRepositoryTrait>,
    investments: Arc<dyn InvestmentRepositoryTrait>,
    sink: Arc<dyn NotificationSink>,
    tables: AllocationTables,
}

impl AllocationEngine {
    pub fn new(
        users: Arc<dyn UserRepositoryTrait>,
        pools: Arc<dyn PoolRepositoryTrait>,
        investments: Arc<dyn InvestmentRepositoryTrait>,
        sink: Arc<dyn NotificationSink>,
        tables: AllocationTables,
    ) -> Self {
        Self {
            users,
            pools,
            investments,
            sink,
            tables,
        }
    }

    async fn park_for_withdrawal(
        &self,
        investment: &Investment,
        amount: Decimal,
        no_options: bool,
    ) -> Result<ProcessOutcome> {
        self.investments
            .transition_status(
                &investment.id,
                &[InvestmentStatus::Completed],
                InvestmentStatus::Withdrawable,
            )
            .await?;

        let event = if no_options {
            EngineEvent::NoReinvestmentOptions {
                investment_id: investment.id.clone(),
                amount,
            }
        } else {
            EngineEvent::FundsWithdrawable {
                investment_id: investment.id.clone(),
                amount,
            }
        };
        self.sink.notify_user(&investment.user_id, event);
        Ok(ProcessOutcome::Parked)
    }

    async fn process_one(&self, investment: &Investment) -> Result<ProcessOutcome> {
        let user = self.users.get_by_id(&investment.user_id)?;
        let available_amount = investment.current_value;

        if !user.auto_reinvest {
            return self.park_for_withdrawal(investment, available_amount, false).await;
        }

        let original_pool = self.pools.get_by_id(&investment.pool_id)?;

        let mut candidates = self.pools.list_by_status(&[PoolStatus::Pending])?;
        candidates.sort_by(|a, b| a.id.cmp(&b.id));
        let options: Vec<ReinvestmentOption> = candidates
            .iter()
            .filter_map(|pool| {
                ReinvestmentOption::evaluate(pool, &user, available_amount, &self.tables)
            })
            .collect();

        let Some(selected) =
            select_destination(&options, original_pool.model_type, &self.tables)
        else {
            return self.park_for_withdrawal(investment, available_amount, true).await;
        };

        let outcome = self
            .investments
            .execute_reinvestment(&investment.id, &selected.pool_id, available_amount)
            .await?;

        info!(
            "reinvested {} from pool {} into pool {} (investment {} -> {})",
            available_amount,
            investment.pool_id,
            selected.pool_id,
            investment.id,
            outcome.new_investment.id
        );
        self.sink.notify_user(
            &investment.user_id,
            EngineEvent::ReinvestmentCompleted {
                source_investment_id: investment.id.clone(),
                new_investment_id: outcome.new_investment.id.clone(),
                from_pool_id: investment.pool_id.clone(),
                to_pool_id: selected.pool_id.clone(),
                amount: available_amount,
            },
        );
        Ok(ProcessOutcome::Reinvested)
    }
}

#[async_trait]
impl AllocationServiceTrait for AllocationEngine {
    async fn run_cycle(&self) -> Result<AllocationRunSummary> {
        let completed = self
            .investments
            .list_by_status(InvestmentStatus::Completed)?;
        let mut summary = AllocationRunSummary {
            processed: completed.len(),
            ..Default::default()
        };

        for investment in &completed {
            match self.process_one(investment).await {
                Ok(ProcessOutcome::Reinvested) => summary.reinvested += 1,
                Ok(ProcessOutcome::Parked) => summary.parked += 1,
                Err(e) => {
                    error!("reinvestment failed for investment {}: {}", investment.id, e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "allocation sweep: {} processed, {} reinvested, {} parked, {} failed",
            summary.processed, summary.reinvested, summary.parked, summary.failed
        );
        Ok(summary)
    }
}
