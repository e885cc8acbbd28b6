//! Pool domain models.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::DEPOSIT_WINDOW_HOURS;
use crate::errors::{Error, Result, ValidationError};
use crate::users::UserRole;

/// Lifecycle state of a pool.
///
/// The string values are persisted and must round-trip exactly; `settling`
/// is accepted as a legacy spelling of `settlement`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PoolStatus {
    #[default]
    Draft,
    Pending,
    Active,
    Paused,
    #[serde(alias = "settling")]
    Settlement,
    Closed,
    Cancelled,
    Archived,
}

impl PoolStatus {
    /// Returns the persisted string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolStatus::Draft => "draft",
            PoolStatus::Pending => "pending",
            PoolStatus::Active => "active",
            PoolStatus::Paused => "paused",
            PoolStatus::Settlement => "settlement",
            PoolStatus::Closed => "closed",
            PoolStatus::Cancelled => "cancelled",
            PoolStatus::Archived => "archived",
        }
    }

    /// Terminal states admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PoolStatus::Cancelled | PoolStatus::Archived)
    }

    /// Every state an emergency stop may be issued from.
    pub fn non_terminal() -> &'static [PoolStatus] {
        &[
            PoolStatus::Draft,
            PoolStatus::Pending,
            PoolStatus::Active,
            PoolStatus::Paused,
            PoolStatus::Settlement,
            PoolStatus::Closed,
        ]
    }

    /// True while the pool accepts new deposits.
    pub fn accepts_deposits(&self) -> bool {
        matches!(self, PoolStatus::Pending | PoolStatus::Active)
    }

    /// Whether `self -> to` is a legal lifecycle transition.
    pub fn can_transition_to(&self, to: PoolStatus) -> bool {
        use PoolStatus::*;
        match self {
            Draft => matches!(to, Pending | Cancelled | Closed),
            Pending => matches!(to, Active | Cancelled | Closed),
            Active => matches!(to, Closed | Paused | Cancelled),
            Paused => matches!(to, Active | Closed | Cancelled),
            Closed => matches!(to, Settlement | Archived | Cancelled),
            Settlement => matches!(to, Closed | Cancelled),
            Cancelled | Archived => false,
        }
    }
}

impl std::fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trading model a pool's capital is managed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    Alpha,
    Beta,
    Gamma,
    Delta,
    /// The blended model; designated fallback for re-allocation.
    #[default]
    Fusion,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Alpha => "alpha",
            ModelType::Beta => "beta",
            ModelType::Gamma => "gamma",
            ModelType::Delta => "delta",
            ModelType::Fusion => "fusion",
        }
    }
}

/// Advertised risk band of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
    VeryHigh,
}

/// Domain model for a time-boxed collective investment pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: PoolStatus,
    pub manager_id: String,
    pub model_type: ModelType,
    pub risk_level: RiskLevel,
    /// Capital currently held by the pool.
    pub current_amount: Decimal,
    /// Cumulative deposits accepted by the pool.
    pub total_invested: Decimal,
    /// Cumulative profit and loss; maintained by the trading side.
    pub total_pnl: Decimal,
    /// Maximum aggregate capital the pool may hold.
    pub pool_hard_cap: Decimal,
    pub min_investment: Decimal,
    pub max_investment_per_user: Decimal,
    pub max_investment_per_admin: Decimal,
    /// Circuit-breaker drawdown ceiling, in percent.
    pub max_daily_drawdown: Decimal,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub settle_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pool {
    /// Capital the pool can still accept before hitting the hard cap.
    pub fn available_capacity(&self) -> Decimal {
        (self.pool_hard_cap - self.current_amount).max(Decimal::ZERO)
    }

    /// Per-pool exposure ceiling for a role.
    ///
    /// Super admins are bounded only by the pool itself.
    pub fn role_limit(&self, role: UserRole) -> Decimal {
        match role {
            UserRole::Investor => self.max_investment_per_user,
            UserRole::Admin | UserRole::Manager => self.max_investment_per_admin,
            UserRole::SuperAdmin => self.pool_hard_cap,
        }
    }

    /// Instant after which deposits are no longer accepted (the 48h rule).
    pub fn deposit_window_closes_at(&self) -> Option<DateTime<Utc>> {
        self.start_date
            .map(|start| start + Duration::hours(DEPOSIT_WINDOW_HOURS))
    }
}

/// Input model for creating a new pool. Pools are always created in DRAFT.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPool {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub manager_id: String,
    pub model_type: ModelType,
    pub risk_level: RiskLevel,
    pub pool_hard_cap: Decimal,
    pub min_investment: Decimal,
    pub max_investment_per_user: Decimal,
    pub max_investment_per_admin: Decimal,
    pub max_daily_drawdown: Decimal,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub settle_date: Option<DateTime<Utc>>,
}

impl NewPool {
    /// Validates the new pool data.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Pool name cannot be empty".to_string(),
            )));
        }
        if self.pool_hard_cap <= Decimal::ZERO {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Pool hard cap must be positive".to_string(),
            )));
        }
        if self.min_investment <= Decimal::ZERO || self.min_investment > self.pool_hard_cap {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Minimum investment must be positive and within the hard cap".to_string(),
            )));
        }
        if self.max_investment_per_user <= Decimal::ZERO
            || self.max_investment_per_admin <= Decimal::ZERO
        {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Per-role investment ceilings must be positive".to_string(),
            )));
        }
        if self.max_daily_drawdown <= Decimal::ZERO {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Maximum daily drawdown must be positive".to_string(),
            )));
        }
        Ok(())
    }
}

/// Input model for editing a pool that has not started trading yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolUpdate {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub model_type: ModelType,
    pub risk_level: RiskLevel,
    pub pool_hard_cap: Decimal,
    pub min_investment: Decimal,
    pub max_investment_per_user: Decimal,
    pub max_investment_per_admin: Decimal,
    pub max_daily_drawdown: Decimal,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub settle_date: Option<DateTime<Utc>>,
}

impl PoolUpdate {
    /// Validates the pool update data.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "id".to_string(),
            )));
        }
        if self.name.trim().is_empty() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Pool name cannot be empty".to_string(),
            )));
        }
        if self.pool_hard_cap <= Decimal::ZERO {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Pool hard cap must be positive".to_string(),
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_round_trip() {
        for (status, expected) in [
            (PoolStatus::Draft, "\"draft\""),
            (PoolStatus::Pending, "\"pending\""),
            (PoolStatus::Active, "\"active\""),
            (PoolStatus::Paused, "\"paused\""),
            (PoolStatus::Settlement, "\"settlement\""),
            (PoolStatus::Closed, "\"closed\""),
            (PoolStatus::Cancelled, "\"cancelled\""),
            (PoolStatus::Archived, "\"archived\""),
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, expected);
            assert_eq!(serde_json::from_str::<PoolStatus>(&json).unwrap(), status);
        }
    }

    #[test]
    fn test_settling_alias_accepted() {
        assert_eq!(
            serde_json::from_str::<PoolStatus>("\"settling\"").unwrap(),
            PoolStatus::Settlement
        );
    }

    #[test]
    fn test_transition_legality() {
        assert!(PoolStatus::Draft.can_transition_to(PoolStatus::Pending));
        assert!(PoolStatus::Pending.can_transition_to(PoolStatus::Active));
        assert!(PoolStatus::Active.can_transition_to(PoolStatus::Closed));
        assert!(PoolStatus::Active.can_transition_to(PoolStatus::Paused));
        assert!(PoolStatus::Paused.can_transition_to(PoolStatus::Active));
        assert!(PoolStatus::Closed.can_transition_to(PoolStatus::Settlement));
        assert!(PoolStatus::Closed.can_transition_to(PoolStatus::Archived));

        assert!(!PoolStatus::Draft.can_transition_to(PoolStatus::Active));
        assert!(!PoolStatus::Pending.can_transition_to(PoolStatus::Paused));
        assert!(!PoolStatus::Cancelled.can_transition_to(PoolStatus::Active));
        assert!(!PoolStatus::Archived.can_transition_to(PoolStatus::Closed));
    }

    #[test]
    fn test_terminal_states() {
        assert!(PoolStatus::Cancelled.is_terminal());
        assert!(PoolStatus::Archived.is_terminal());
        assert!(!PoolStatus::Closed.is_terminal());
        assert!(!PoolStatus::Paused.is_terminal());
    }

    #[test]
    fn test_role_limits() {
        let pool = Pool {
            id: "p1".to_string(),
            name: "Pool".to_string(),
            description: None,
            status: PoolStatus::Pending,
            manager_id: "m1".to_string(),
            model_type: ModelType::Alpha,
            risk_level: RiskLevel::Medium,
            current_amount: dec!(0),
            total_invested: dec!(0),
            total_pnl: dec!(0),
            pool_hard_cap: dec!(500000),
            min_investment: dec!(100),
            max_investment_per_user: dec!(15000),
            max_investment_per_admin: dec!(20000),
            max_daily_drawdown: dec!(10),
            start_date: None,
            end_date: None,
            settle_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(pool.role_limit(UserRole::Investor), dec!(15000));
        assert_eq!(pool.role_limit(UserRole::Manager), dec!(20000));
        assert_eq!(pool.role_limit(UserRole::Admin), dec!(20000));
        assert_eq!(pool.role_limit(UserRole::SuperAdmin), dec!(500000));
    }

    #[test]
    fn test_new_pool_validation() {
        let mut new_pool = NewPool {
            id: None,
            name: "Momentum".to_string(),
            description: None,
            manager_id: "m1".to_string(),
            model_type: ModelType::Beta,
            risk_level: RiskLevel::High,
            pool_hard_cap: dec!(10000),
            min_investment: dec!(100),
            max_investment_per_user: dec!(1000),
            max_investment_per_admin: dec!(2000),
            max_daily_drawdown: dec!(10),
            start_date: None,
            end_date: None,
            settle_date: None,
        };
        assert!(new_pool.validate().is_ok());

        new_pool.name = " ".to_string();
        assert!(new_pool.validate().is_err());

        new_pool.name = "Momentum".to_string();
        new_pool.min_investment = dec!(20000);
        assert!(new_pool.validate().is_err());
    }
}
