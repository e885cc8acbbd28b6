//! Investment repository and service traits.
//!
//! The repository contract includes the combined atomic operations the
//! engine's invariants depend on: a deposit insert is never visible without
//! its pool increment, and a reinvestment moves capital between pools in a
//! single linearization point.

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::eligibility::{GateDecision, SensitiveAction};
use super::investments_model::{Investment, InvestmentStatus, NewInvestment};
use crate::errors::Result;
use crate::pools::pools_model::Pool;

/// Result of an atomic reinvestment execution.
#[derive(Debug, Clone)]
pub struct ReinvestmentOutcome {
    /// The successor position created in the destination pool.
    pub new_investment: Investment,
    /// The source position, now REINVESTED with its forward reference set.
    pub source_investment: Investment,
    /// The destination pool after the capital credit.
    pub destination_pool: Pool,
}

/// Contract for investment persistence.
#[async_trait]
pub trait InvestmentRepositoryTrait: Send + Sync {
    /// Retrieves an investment by id.
    fn get_by_id(&self, investment_id: &str) -> Result<Investment>;

    /// Lists investments in a given status.
    fn list_by_status(&self, status: InvestmentStatus) -> Result<Vec<Investment>>;

    /// Lists a user's investments.
    fn list_by_user(&self, user_id: &str) -> Result<Vec<Investment>>;

    /// Sum of `initial_amount` over the user's open (CONFIRMED/ACTIVE/
    /// LOCKED) positions in a pool.
    fn open_exposure(&self, user_id: &str, pool_id: &str) -> Result<Decimal>;

    /// Creates a CONFIRMED investment and credits the pool's
    /// `current_amount`/`total_invested` in one atomic unit of work.
    ///
    /// Re-checks the pool's open status and hard cap at the write point, so
    /// a concurrent movement that would breach the cap loses here even after
    /// passing the gate. On any failure nothing is persisted.
    async fn create_confirmed(&self, new_investment: NewInvestment) -> Result<(Investment, Pool)>;

    /// Conditionally moves an investment from one of `from` to `to`.
    ///
    /// Fails with `StateConflict` when the current status is not in `from`.
    async fn transition_status(
        &self,
        investment_id: &str,
        from: &[InvestmentStatus],
        to: InvestmentStatus,
    ) -> Result<Investment>;

    /// Atomically executes a reinvestment: creates the successor CONFIRMED
    /// position (`initial_amount = current_value = amount`), marks the
    /// COMPLETED source REINVESTED with the successor id, credits the
    /// destination pool and debits the source pool's `current_amount`.
    ///
    /// Guards at the write point: the source must still be COMPLETED, the
    /// destination must still be PENDING with capacity for `amount`.
    async fn execute_reinvestment(
        &self,
        source_investment_id: &str,
        destination_pool_id: &str,
        amount: Decimal,
    ) -> Result<ReinvestmentOutcome>;

    /// Marks every open position in a pool COMPLETED. Invoked when the pool
    /// enters settlement. Returns the number of completed positions.
    async fn complete_open_investments(&self, pool_id: &str) -> Result<usize>;
}

/// Contract for deposit-side operations.
#[async_trait]
pub trait InvestmentServiceTrait: Send + Sync {
    /// Runs the eligibility gate without persisting anything.
    fn validate(&self, user_id: &str, pool_id: &str, amount: Decimal) -> Result<GateDecision>;

    /// Validates and executes a deposit. On approval the CONFIRMED
    /// investment and the pool increment land atomically and the investor is
    /// notified; on rejection nothing is persisted and the error carries the
    /// reason.
    async fn deposit(&self, user_id: &str, pool_id: &str, amount: Decimal) -> Result<Investment>;

    /// Checks whether a caller may perform a sensitive administrative
    /// action.
    fn authorize_sensitive_action(&self, user_id: &str, action: SensitiveAction) -> Result<()>;

    /// Retrieves an investment by id.
    fn get_investment(&self, investment_id: &str) -> Result<Investment>;

    /// Lists a user's investments.
    fn list_user_investments(&self, user_id: &str) -> Result<Vec<Investment>>;
}
