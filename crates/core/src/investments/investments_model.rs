//! Investment domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result, ValidationError};

/// Lifecycle state of a single capital position.
///
/// The string values are persisted and must round-trip exactly.
/// Investments are never deleted, only status-transitioned, so the full
/// history of a position stays queryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentStatus {
    #[default]
    PendingVerification,
    Confirmed,
    Rejected,
    Active,
    Locked,
    Completed,
    Withdrawable,
    WithdrawalPending,
    Withdrawn,
    /// Terminal; the record carries a forward reference to its successor.
    Reinvested,
}

impl InvestmentStatus {
    /// Returns the persisted string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            InvestmentStatus::PendingVerification => "pending_verification",
            InvestmentStatus::Confirmed => "confirmed",
            InvestmentStatus::Rejected => "rejected",
            InvestmentStatus::Active => "active",
            InvestmentStatus::Locked => "locked",
            InvestmentStatus::Completed => "completed",
            InvestmentStatus::Withdrawable => "withdrawable",
            InvestmentStatus::WithdrawalPending => "withdrawal_pending",
            InvestmentStatus::Withdrawn => "withdrawn",
            InvestmentStatus::Reinvested => "reinvested",
        }
    }

    /// Open positions count toward a user's exposure in a pool.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            InvestmentStatus::Confirmed | InvestmentStatus::Active | InvestmentStatus::Locked
        )
    }

    /// Terminal states admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InvestmentStatus::Rejected | InvestmentStatus::Withdrawn | InvestmentStatus::Reinvested
        )
    }
}

impl std::fmt::Display for InvestmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Domain model for one investor's position inside a pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Investment {
    pub id: String,
    pub pool_id: String,
    pub user_id: String,
    pub initial_amount: Decimal,
    /// Mark-to-market value; maintained by the trading side.
    pub current_value: Decimal,
    pub pnl: Decimal,
    pub pnl_percentage: Decimal,
    pub status: InvestmentStatus,
    pub invested_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub locked_until: Option<DateTime<Utc>>,
    pub withdrawn_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    /// Successor investment id, set when this position is REINVESTED.
    pub reinvested_into: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input model for a proposed deposit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInvestment {
    pub pool_id: String,
    pub user_id: String,
    pub amount: Decimal,
}

impl NewInvestment {
    /// Validates the proposed deposit's shape. Business eligibility is the
    /// gate's job.
    pub fn validate(&self) -> Result<()> {
        if self.pool_id.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "poolId".to_string(),
            )));
        }
        if self.user_id.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "userId".to_string(),
            )));
        }
        if self.amount <= Decimal::ZERO {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Deposit amount must be positive".to_string(),
            )));
        }
        Ok(())
    }
}
