//! In-memory reference ledger.
//!
//! Implements every repository trait over a single lock-guarded interior,
//! which makes each operation - including the combined deposit and
//! reinvestment writes - one linearization point. This is the contract a
//! durable store must reproduce with conditional updates or transactions;
//! it also backs the engine's tests.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockWriteGuard};

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::errors::{Error, LedgerError, Result};
use crate::investments::eligibility::RejectionReason;
use crate::investments::investments_model::{Investment, InvestmentStatus, NewInvestment};
use crate::investments::investments_traits::{InvestmentRepositoryTrait, ReinvestmentOutcome};
use crate::pools::pools_model::{NewPool, Pool, PoolStatus, PoolUpdate};
use crate::pools::pools_traits::PoolRepositoryTrait;
use crate::users::{User, UserRepositoryTrait};
use crate::utils::Clock;

#[derive(Default)]
struct LedgerInner {
    users: HashMap<String, User>,
    pools: HashMap<String, Pool>,
    investments: HashMap<String, Investment>,
}

/// Lock-guarded in-memory store backing all repository traits.
pub struct MemoryLedger {
    inner: RwLock<LedgerInner>,
    clock: Arc<dyn Clock>,
}

impl MemoryLedger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(LedgerInner::default()),
            clock,
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, LedgerInner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Inserts or replaces a user record.
    pub fn insert_user(&self, user: User) {
        self.write().users.insert(user.id.clone(), user);
    }

    /// Inserts or replaces a pool record.
    pub fn insert_pool(&self, pool: Pool) {
        self.write().pools.insert(pool.id.clone(), pool);
    }

    /// Inserts or replaces an investment record.
    pub fn insert_investment(&self, investment: Investment) {
        self.write()
            .investments
            .insert(investment.id.clone(), investment);
    }

    /// Retrieves a user by id.
    pub fn get_user(&self, user_id: &str) -> Result<User> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| Error::not_found("user", user_id))
    }

    /// Retrieves a pool by id.
    pub fn get_pool(&self, pool_id: &str) -> Result<Pool> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pools
            .get(pool_id)
            .cloned()
            .ok_or_else(|| Error::not_found("pool", pool_id))
    }

    /// Retrieves an investment by id.
    pub fn get_investment(&self, investment_id: &str) -> Result<Investment> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .investments
            .get(investment_id)
            .cloned()
            .ok_or_else(|| Error::not_found("investment", investment_id))
    }

    /// Applies a trading result to a pool, adjusting `current_amount` and
    /// `total_pnl` together. Stands in for the out-of-scope trading side in
    /// tests and demos.
    pub fn apply_trading_result(&self, pool_id: &str, pnl_delta: Decimal) -> Result<Pool> {
        let now = self.clock.now();
        let mut inner = self.write();
        let pool = inner
            .pools
            .get_mut(pool_id)
            .ok_or_else(|| Error::not_found("pool", pool_id))?;
        pool.current_amount += pnl_delta;
        pool.total_pnl += pnl_delta;
        pool.updated_at = now;
        Ok(pool.clone())
    }

    fn new_id() -> String {
        Uuid::new_v4().to_string()
    }
}

impl UserRepositoryTrait for MemoryLedger {
    fn get_by_id(&self, user_id: &str) -> Result<User> {
        self.get_user(user_id)
    }
}

#[async_trait]
impl PoolRepositoryTrait for MemoryLedger {
    fn get_by_id(&self, pool_id: &str) -> Result<Pool> {
        self.get_pool(pool_id)
    }

    fn list_by_status(&self, statuses: &[PoolStatus]) -> Result<Vec<Pool>> {
        let inner = self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut pools: Vec<Pool> = inner
            .pools
            .values()
            .filter(|p| statuses.contains(&p.status))
            .cloned()
            .collect();
        pools.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(pools)
    }

    async fn create(&self, new_pool: NewPool) -> Result<Pool> {
        new_pool.validate()?;
        let now = self.clock.now();
        let pool = Pool {
            id: new_pool.id.unwrap_or_else(Self::new_id),
            name: new_pool.name,
            description: new_pool.description,
            status: PoolStatus::Draft,
            manager_id: new_pool.manager_id,
            model_type: new_pool.model_type,
            risk_level: new_pool.risk_level,
            current_amount: Decimal::ZERO,
            total_invested: Decimal::ZERO,
            total_pnl: Decimal::ZERO,
            pool_hard_cap: new_pool.pool_hard_cap,
            min_investment: new_pool.min_investment,
            max_investment_per_user: new_pool.max_investment_per_user,
            max_investment_per_admin: new_pool.max_investment_per_admin,
            max_daily_drawdown: new_pool.max_daily_drawdown,
            start_date: new_pool.start_date,
            end_date: new_pool.end_date,
            settle_date: new_pool.settle_date,
            created_at: now,
            updated_at: now,
        };

        let mut inner = self.write();
        if inner.pools.contains_key(&pool.id) {
            return Err(Error::Ledger(LedgerError::WriteConflict(format!(
                "pool {} already exists",
                pool.id
            ))));
        }
        inner.pools.insert(pool.id.clone(), pool.clone());
        Ok(pool)
    }

    async fn update(&self, update: PoolUpdate) -> Result<Pool> {
        update.validate()?;
        let now = self.clock.now();
        let mut inner = self.write();
        let pool = inner
            .pools
            .get_mut(&update.id)
            .ok_or_else(|| Error::not_found("pool", update.id.clone()))?;

        pool.name = update.name;
        pool.description = update.description;
        pool.model_type = update.model_type;
        pool.risk_level = update.risk_level;
        pool.pool_hard_cap = update.pool_hard_cap;
        pool.min_investment = update.min_investment;
        pool.max_investment_per_user = update.max_investment_per_user;
        pool.max_investment_per_admin = update.max_investment_per_admin;
        pool.max_daily_drawdown = update.max_daily_drawdown;
        pool.start_date = update.start_date;
        pool.end_date = update.end_date;
        pool.settle_date = update.settle_date;
        pool.updated_at = now;
        Ok(pool.clone())
    }

    async fn transition_status(
        &self,
        pool_id: &str,
        from: &[PoolStatus],
        to: PoolStatus,
    ) -> Result<Pool> {
        let now = self.clock.now();
        let mut inner = self.write();
        let pool = inner
            .pools
            .get_mut(pool_id)
            .ok_or_else(|| Error::not_found("pool", pool_id))?;

        if !from.contains(&pool.status) {
            return Err(Error::state_conflict(format!(
                "pool {} is {}, expected one of [{}]",
                pool_id,
                pool.status,
                from.iter()
                    .map(PoolStatus::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
        if !pool.status.can_transition_to(to) {
            return Err(Error::state_conflict(format!(
                "pool {} cannot move from {} to {}",
                pool_id, pool.status, to
            )));
        }

        pool.status = to;
        pool.updated_at = now;
        Ok(pool.clone())
    }

    async fn delete_draft(&self, pool_id: &str) -> Result<()> {
        let mut inner = self.write();
        let pool = inner
            .pools
            .get(pool_id)
            .ok_or_else(|| Error::not_found("pool", pool_id))?;
        if pool.status != PoolStatus::Draft {
            return Err(Error::state_conflict(format!(
                "pool {} is {}, only draft pools can be deleted",
                pool_id, pool.status
            )));
        }
        inner.pools.remove(pool_id);
        Ok(())
    }
}

#[async_trait]
impl InvestmentRepositoryTrait for MemoryLedger {
    fn get_by_id(&self, investment_id: &str) -> Result<Investment> {
        self.get_investment(investment_id)
    }

    fn list_by_status(&self, status: InvestmentStatus) -> Result<Vec<Investment>> {
        let inner = self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut investments: Vec<Investment> = inner
            .investments
            .values()
            .filter(|i| i.status == status)
            .cloned()
            .collect();
        investments.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(investments)
    }

    fn list_by_user(&self, user_id: &str) -> Result<Vec<Investment>> {
        let inner = self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut investments: Vec<Investment> = inner
            .investments
            .values()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        investments.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(investments)
    }

    fn open_exposure(&self, user_id: &str, pool_id: &str) -> Result<Decimal> {
        let inner = self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(inner
            .investments
            .values()
            .filter(|i| i.user_id == user_id && i.pool_id == pool_id && i.status.is_open())
            .map(|i| i.initial_amount)
            .sum())
    }

    async fn create_confirmed(&self, new_investment: NewInvestment) -> Result<(Investment, Pool)> {
        new_investment.validate()?;
        let now = self.clock.now();
        let mut inner = self.write();

        let pool = inner
            .pools
            .get_mut(&new_investment.pool_id)
            .ok_or_else(|| Error::not_found("pool", new_investment.pool_id.clone()))?;

        // Re-checked at the write point: a concurrent movement that landed
        // since the gate ran must not breach the cap or a closed pool.
        if !pool.status.accepts_deposits() {
            return Err(Error::Rejected(RejectionReason::PoolNotOpen));
        }
        if pool.current_amount + new_investment.amount > pool.pool_hard_cap {
            return Err(Error::Rejected(RejectionReason::HardCapExceeded {
                hard_cap: pool.pool_hard_cap,
            }));
        }

        pool.current_amount += new_investment.amount;
        pool.total_invested += new_investment.amount;
        pool.updated_at = now;
        let pool_snapshot = pool.clone();

        let investment = Investment {
            id: Self::new_id(),
            pool_id: new_investment.pool_id,
            user_id: new_investment.user_id,
            initial_amount: new_investment.amount,
            current_value: new_investment.amount,
            pnl: Decimal::ZERO,
            pnl_percentage: Decimal::ZERO,
            status: InvestmentStatus::Confirmed,
            invested_at: now,
            confirmed_at: Some(now),
            rejected_at: None,
            locked_until: None,
            withdrawn_at: None,
            rejection_reason: None,
            reinvested_into: None,
            created_at: now,
            updated_at: now,
        };
        inner
            .investments
            .insert(investment.id.clone(), investment.clone());

        Ok((investment, pool_snapshot))
    }

    async fn transition_status(
        &self,
        investment_id: &str,
        from: &[InvestmentStatus],
        to: InvestmentStatus,
    ) -> Result<Investment> {
        let now = self.clock.now();
        let mut inner = self.write();
        let investment = inner
            .investments
            .get_mut(investment_id)
            .ok_or_else(|| Error::not_found("investment", investment_id))?;

        if !from.contains(&investment.status) {
            return Err(Error::state_conflict(format!(
                "investment {} is {}, expected one of [{}]",
                investment_id,
                investment.status,
                from.iter()
                    .map(InvestmentStatus::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        investment.status = to;
        if to == InvestmentStatus::Withdrawn {
            investment.withdrawn_at = Some(now);
        }
        investment.updated_at = now;
        Ok(investment.clone())
    }

    async fn execute_reinvestment(
        &self,
        source_investment_id: &str,
        destination_pool_id: &str,
        amount: Decimal,
    ) -> Result<ReinvestmentOutcome> {
        let now = self.clock.now();
        let mut inner = self.write();

        let source = inner
            .investments
            .get(source_investment_id)
            .cloned()
            .ok_or_else(|| Error::not_found("investment", source_investment_id))?;
        if source.status != InvestmentStatus::Completed {
            return Err(Error::state_conflict(format!(
                "investment {} is {}, not completed",
                source_investment_id, source.status
            )));
        }

        {
            let destination = inner
                .pools
                .get(destination_pool_id)
                .ok_or_else(|| Error::not_found("pool", destination_pool_id))?;
            if destination.status != PoolStatus::Pending {
                return Err(Error::state_conflict(format!(
                    "destination pool {} is {}, no longer open",
                    destination_pool_id, destination.status
                )));
            }
            if destination.current_amount + amount > destination.pool_hard_cap {
                return Err(Error::state_conflict(format!(
                    "destination pool {} cannot absorb {}",
                    destination_pool_id, amount
                )));
            }
        }

        let new_investment = Investment {
            id: Self::new_id(),
            pool_id: destination_pool_id.to_string(),
            user_id: source.user_id.clone(),
            initial_amount: amount,
            current_value: amount,
            pnl: Decimal::ZERO,
            pnl_percentage: Decimal::ZERO,
            status: InvestmentStatus::Confirmed,
            invested_at: now,
            confirmed_at: Some(now),
            rejected_at: None,
            locked_until: None,
            withdrawn_at: None,
            rejection_reason: None,
            reinvested_into: None,
            created_at: now,
            updated_at: now,
        };

        let destination = inner
            .pools
            .get_mut(destination_pool_id)
            .expect("destination pool checked above");
        destination.current_amount += amount;
        destination.total_invested += amount;
        destination.updated_at = now;
        let destination_snapshot = destination.clone();

        // Reconciliation: the matured value leaves the source pool.
        if let Some(source_pool) = inner.pools.get_mut(&source.pool_id) {
            source_pool.current_amount -= amount;
            source_pool.updated_at = now;
        }

        let source_record = inner
            .investments
            .get_mut(source_investment_id)
            .expect("source investment checked above");
        source_record.status = InvestmentStatus::Reinvested;
        source_record.reinvested_into = Some(new_investment.id.clone());
        source_record.updated_at = now;
        let source_snapshot = source_record.clone();

        inner
            .investments
            .insert(new_investment.id.clone(), new_investment.clone());

        Ok(ReinvestmentOutcome {
            new_investment,
            source_investment: source_snapshot,
            destination_pool: destination_snapshot,
        })
    }

    async fn complete_open_investments(&self, pool_id: &str) -> Result<usize> {
        let now = self.clock.now();
        let mut inner = self.write();
        let mut completed = 0;
        for investment in inner.investments.values_mut() {
            if investment.pool_id == pool_id && investment.status.is_open() {
                investment.status = InvestmentStatus::Completed;
                investment.updated_at = now;
                completed += 1;
            }
        }
        Ok(completed)
    }
}
