//! Allocation engine domain models.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::pools::pools_model::{ModelType, Pool, RiskLevel};
use crate::users::User;

/// A destination pool candidate for matured capital.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReinvestmentOption {
    pub pool_id: String,
    pub model_type: ModelType,
    pub risk_level: RiskLevel,
    pub expected_return: Decimal,
    /// The amount this candidate can actually absorb for this investor:
    /// min(remaining hard-cap capacity, role ceiling, available amount).
    pub available_capacity: Decimal,
    pub min_investment: Decimal,
}

impl ReinvestmentOption {
    /// Builds a candidate for `user` moving `available_amount` into `pool`,
    /// or `None` when the pool cannot absorb at least its own minimum.
    pub fn evaluate(
        pool: &Pool,
        user: &User,
        available_amount: Decimal,
        tables: &AllocationTables,
    ) -> Option<Self> {
        let available_capacity = pool
            .available_capacity()
            .min(pool.role_limit(user.role))
            .min(available_amount);

        if available_capacity < pool.min_investment {
            return None;
        }

        Some(Self {
            pool_id: pool.id.clone(),
            model_type: pool.model_type,
            risk_level: pool.risk_level,
            expected_return: tables.expected_return(pool.model_type),
            available_capacity,
            min_investment: pool.min_investment,
        })
    }
}

/// Business-tunable scoring tables for destination selection.
///
/// Represented as configuration data (serde, versioned) rather than code
/// constants: both tables are adjusted as models are retired or re-rated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationTables {
    pub version: u32,
    pub expected_returns: HashMap<ModelType, Decimal>,
    pub risk_multipliers: HashMap<RiskLevel, Decimal>,
    /// Used when a model type is missing from the table.
    pub fallback_expected_return: Decimal,
    /// Used when a risk level is missing from the table.
    pub fallback_risk_multiplier: Decimal,
    /// Second preference after a same-model match.
    pub preferred_fallback_model: ModelType,
}

impl AllocationTables {
    pub fn expected_return(&self, model_type: ModelType) -> Decimal {
        self.expected_returns
            .get(&model_type)
            .copied()
            .unwrap_or(self.fallback_expected_return)
    }

    pub fn risk_multiplier(&self, risk_level: RiskLevel) -> Decimal {
        self.risk_multipliers
            .get(&risk_level)
            .copied()
            .unwrap_or(self.fallback_risk_multiplier)
    }

    /// Scoring function for the last-resort tie-break:
    /// `expected_return * risk_multiplier`.
    pub fn score(&self, option: &ReinvestmentOption) -> Decimal {
        option.expected_return * self.risk_multiplier(option.risk_level)
    }
}

impl Default for AllocationTables {
    fn default() -> Self {
        Self {
            version: 1,
            expected_returns: HashMap::from([
                (ModelType::Alpha, dec!(0.15)),
                (ModelType::Beta, dec!(0.12)),
                (ModelType::Gamma, dec!(0.10)),
                (ModelType::Delta, dec!(0.08)),
                (ModelType::Fusion, dec!(0.11)),
            ]),
            risk_multipliers: HashMap::from([
                (RiskLevel::Low, dec!(1.0)),
                (RiskLevel::Medium, dec!(0.8)),
                (RiskLevel::High, dec!(0.6)),
                (RiskLevel::VeryHigh, dec!(0.4)),
            ]),
            fallback_expected_return: dec!(0.10),
            fallback_risk_multiplier: dec!(0.5),
            preferred_fallback_model: ModelType::Fusion,
        }
    }
}

/// Outcome counters for one allocation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationRunSummary {
    /// COMPLETED investments examined.
    pub processed: usize,
    /// Rolled into a destination pool.
    pub reinvested: usize,
    /// Parked as WITHDRAWABLE (opted out or no candidates).
    pub parked: usize,
    /// Failed and left for the next sweep.
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pools::pools_model::PoolStatus;
    use crate::users::{KycStatus, UserRole};
    use chrono::Utc;

    fn pool(id: &str, hard_cap: Decimal, current: Decimal) -> Pool {
        let now = Utc::now();
        Pool {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            status: PoolStatus::Pending,
            manager_id: "m1".to_string(),
            model_type: ModelType::Beta,
            risk_level: RiskLevel::Medium,
            current_amount: current,
            total_invested: current,
            total_pnl: Decimal::ZERO,
            pool_hard_cap: hard_cap,
            min_investment: dec!(100),
            max_investment_per_user: dec!(5000),
            max_investment_per_admin: dec!(8000),
            max_daily_drawdown: dec!(10),
            start_date: Some(now),
            end_date: None,
            settle_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn investor() -> User {
        let now = Utc::now();
        User {
            id: "u1".to_string(),
            email: "u1@example.com".to_string(),
            role: UserRole::Investor,
            kyc_status: KycStatus::Approved,
            mfa_enabled: false,
            mfa_required: false,
            is_blocked: false,
            has_active_subscription: true,
            subscription_expires_at: None,
            auto_reinvest: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_tables_defaults() {
        let tables = AllocationTables::default();
        assert_eq!(tables.expected_return(ModelType::Alpha), dec!(0.15));
        assert_eq!(tables.expected_return(ModelType::Fusion), dec!(0.11));
        assert_eq!(tables.risk_multiplier(RiskLevel::Low), dec!(1.0));
        assert_eq!(tables.risk_multiplier(RiskLevel::VeryHigh), dec!(0.4));
    }

    #[test]
    fn test_tables_round_trip() {
        let tables = AllocationTables::default();
        let json = serde_json::to_string(&tables).unwrap();
        let parsed: AllocationTables = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, tables);
    }

    #[test]
    fn test_capacity_is_min_of_constraints() {
        let tables = AllocationTables::default();

        // Hard-cap headroom (1000) binds before the role ceiling and the
        // available amount.
        let option =
            ReinvestmentOption::evaluate(&pool("p1", dec!(10000), dec!(9000)), &investor(), dec!(2000), &tables)
                .unwrap();
        assert_eq!(option.available_capacity, dec!(1000));

        // The available amount binds when it is smallest.
        let option =
            ReinvestmentOption::evaluate(&pool("p1", dec!(10000), dec!(0)), &investor(), dec!(800), &tables)
                .unwrap();
        assert_eq!(option.available_capacity, dec!(800));
    }

    #[test]
    fn test_candidate_discarded_below_minimum() {
        let tables = AllocationTables::default();
        let option =
            ReinvestmentOption::evaluate(&pool("p1", dec!(10000), dec!(9950)), &investor(), dec!(2000), &tables);
        assert!(option.is_none());
    }

    #[test]
    fn test_score_uses_risk_multiplier() {
        let tables = AllocationTables::default();
        let option = ReinvestmentOption {
            pool_id: "p1".to_string(),
            model_type: ModelType::Alpha,
            risk_level: RiskLevel::High,
            expected_return: dec!(0.15),
            available_capacity: dec!(1000),
            min_investment: dec!(100),
        };
        assert_eq!(tables.score(&option), dec!(0.15) * dec!(0.6));
    }
}
