//! Deposit eligibility gate.
//!
//! Pure decision functions evaluated synchronously before any capital
//! movement is persisted. The caller fetches the user and pool once, builds
//! an immutable [`GateContext`], and passes everything in; the gate itself
//! touches no storage, which keeps every rule unit-testable in isolation.
//!
//! Checks run in a fixed order and short-circuit on the first failure, so a
//! rejection always names the earliest violated rule.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::KYC_REVIEW_THRESHOLD;
use crate::pools::pools_model::Pool;
use crate::users::{KycStatus, User, UserRole};

/// Immutable caller context for a single gated operation.
///
/// Built once per operation from a fresh user read; never captured from any
/// ambient request state.
#[derive(Debug, Clone)]
pub struct GateContext {
    pub user_id: String,
    pub role: UserRole,
    pub kyc_status: KycStatus,
    pub mfa_enabled: bool,
    pub mfa_required: bool,
    pub subscription_active: bool,
    pub blocked: bool,
}

impl GateContext {
    /// Builds a context from a user record at a given instant.
    pub fn for_user(user: &User, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user.id.clone(),
            role: user.role,
            kyc_status: user.kyc_status,
            mfa_enabled: user.mfa_enabled,
            mfa_required: user.mfa_required,
            subscription_active: user.subscription_active(now),
            blocked: user.is_blocked,
        }
    }
}

/// Reason a capital movement or sensitive action was refused.
///
/// Every variant renders as the specific, user-consumable reason string the
/// caller surfaces; rejections are never retried automatically.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RejectionReason {
    #[error("user or pool not found")]
    UnknownUserOrPool,

    #[error("KYC approval required for deposits above {threshold}")]
    KycRequired { threshold: Decimal },

    #[error("an active subscription is required to invest")]
    SubscriptionRequired,

    #[error("user account is blocked")]
    AccountBlocked,

    #[error("per-pool exposure limit exceeded: at most {limit} per pool for this role")]
    ExposureLimitExceeded { limit: Decimal },

    #[error("multi-factor authentication is required for this account")]
    MfaRequired,

    #[error("pool is not open for deposits")]
    PoolNotOpen,

    #[error("pool hard cap exceeded: at most {hard_cap} in total")]
    HardCapExceeded { hard_cap: Decimal },

    #[error("minimum investment is {minimum}")]
    BelowMinimum { minimum: Decimal },

    #[error("deposit validation window closed at {deadline}")]
    DepositWindowClosed { deadline: DateTime<Utc> },

    #[error("action is restricted to super admins")]
    SuperAdminOnly,

    #[error("caller is not authorized to manage this pool")]
    NotAuthorized,
}

/// Outcome of a gate evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Approved,
    Rejected(RejectionReason),
}

impl GateDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, GateDecision::Approved)
    }

    /// The rejection reason, if any.
    pub fn reason(&self) -> Option<&RejectionReason> {
        match self {
            GateDecision::Approved => None,
            GateDecision::Rejected(reason) => Some(reason),
        }
    }

    /// Converts an approval into `Ok(())` and a rejection into its reason.
    pub fn into_result(self) -> Result<(), RejectionReason> {
        match self {
            GateDecision::Approved => Ok(()),
            GateDecision::Rejected(reason) => Err(reason),
        }
    }
}

/// Decides whether a proposed deposit may proceed.
///
/// `open_exposure` is the sum of the caller's non-terminal
/// (CONFIRMED/ACTIVE/LOCKED) positions in this pool, fetched by the caller.
pub fn validate_deposit(
    ctx: &GateContext,
    pool: &Pool,
    open_exposure: Decimal,
    amount: Decimal,
    now: DateTime<Utc>,
) -> GateDecision {
    if amount > KYC_REVIEW_THRESHOLD && ctx.kyc_status != KycStatus::Approved {
        return GateDecision::Rejected(RejectionReason::KycRequired {
            threshold: KYC_REVIEW_THRESHOLD,
        });
    }

    if !ctx.subscription_active {
        return GateDecision::Rejected(RejectionReason::SubscriptionRequired);
    }

    if ctx.blocked {
        return GateDecision::Rejected(RejectionReason::AccountBlocked);
    }

    if let Some(reason) = check_role_exposure(ctx, pool, open_exposure, amount) {
        return GateDecision::Rejected(reason);
    }

    if !pool.status.accepts_deposits() {
        return GateDecision::Rejected(RejectionReason::PoolNotOpen);
    }
    if pool.current_amount + amount > pool.pool_hard_cap {
        return GateDecision::Rejected(RejectionReason::HardCapExceeded {
            hard_cap: pool.pool_hard_cap,
        });
    }

    if amount < pool.min_investment {
        return GateDecision::Rejected(RejectionReason::BelowMinimum {
            minimum: pool.min_investment,
        });
    }

    match pool.deposit_window_closes_at() {
        Some(deadline) if now <= deadline => GateDecision::Approved,
        Some(deadline) => {
            GateDecision::Rejected(RejectionReason::DepositWindowClosed { deadline })
        }
        // A pool without a start date has never opened its window.
        None => GateDecision::Rejected(RejectionReason::PoolNotOpen),
    }
}

fn check_role_exposure(
    ctx: &GateContext,
    pool: &Pool,
    open_exposure: Decimal,
    amount: Decimal,
) -> Option<RejectionReason> {
    let new_total = open_exposure + amount;
    match ctx.role {
        UserRole::Investor => {
            if new_total > pool.max_investment_per_user {
                return Some(RejectionReason::ExposureLimitExceeded {
                    limit: pool.max_investment_per_user,
                });
            }
        }
        UserRole::Admin | UserRole::Manager => {
            if new_total > pool.max_investment_per_admin {
                return Some(RejectionReason::ExposureLimitExceeded {
                    limit: pool.max_investment_per_admin,
                });
            }
        }
        UserRole::SuperAdmin => {
            // No amount ceiling, but MFA enforcement applies regardless of
            // the amount.
            if ctx.mfa_required && !ctx.mfa_enabled {
                return Some(RejectionReason::MfaRequired);
            }
        }
    }
    None
}

/// Administrative actions restricted to super admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitiveAction {
    ModifyPoolLimits,
    ModifyFees,
    EmergencyStop,
    ModifyDuration,
    ForceSettlement,
}

impl SensitiveAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensitiveAction::ModifyPoolLimits => "modify_pool_limits",
            SensitiveAction::ModifyFees => "modify_fees",
            SensitiveAction::EmergencyStop => "emergency_stop",
            SensitiveAction::ModifyDuration => "modify_duration",
            SensitiveAction::ForceSettlement => "force_settlement",
        }
    }
}

/// Decides whether the caller may perform a sensitive administrative action.
pub fn validate_sensitive_action(ctx: &GateContext, _action: SensitiveAction) -> GateDecision {
    if ctx.role != UserRole::SuperAdmin {
        return GateDecision::Rejected(RejectionReason::SuperAdminOnly);
    }
    if ctx.mfa_required && !ctx.mfa_enabled {
        return GateDecision::Rejected(RejectionReason::MfaRequired);
    }
    GateDecision::Approved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pools::pools_model::{ModelType, PoolStatus, RiskLevel};
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn pool(status: PoolStatus) -> Pool {
        let now = Utc::now();
        Pool {
            id: "p1".to_string(),
            name: "Momentum".to_string(),
            description: None,
            status,
            manager_id: "m1".to_string(),
            model_type: ModelType::Alpha,
            risk_level: RiskLevel::Medium,
            current_amount: dec!(0),
            total_invested: dec!(0),
            total_pnl: dec!(0),
            pool_hard_cap: dec!(10000),
            min_investment: dec!(100),
            max_investment_per_user: dec!(5000),
            max_investment_per_admin: dec!(8000),
            max_daily_drawdown: dec!(10),
            start_date: Some(now),
            end_date: Some(now + Duration::days(30)),
            settle_date: Some(now + Duration::days(31)),
            created_at: now,
            updated_at: now,
        }
    }

    fn ctx() -> GateContext {
        GateContext {
            user_id: "u1".to_string(),
            role: UserRole::Investor,
            kyc_status: KycStatus::Approved,
            mfa_enabled: false,
            mfa_required: false,
            subscription_active: true,
            blocked: false,
        }
    }

    #[test]
    fn test_approved_deposit() {
        let decision = validate_deposit(&ctx(), &pool(PoolStatus::Pending), dec!(0), dec!(500), Utc::now());
        assert!(decision.is_approved());
    }

    #[test]
    fn test_kyc_required_above_threshold() {
        let mut c = ctx();
        c.kyc_status = KycStatus::Pending;

        let decision =
            validate_deposit(&c, &pool(PoolStatus::Pending), dec!(0), dec!(1500), Utc::now());
        assert_eq!(
            decision.reason(),
            Some(&RejectionReason::KycRequired {
                threshold: dec!(1000)
            })
        );

        // At or below the threshold no KYC review is needed.
        let decision =
            validate_deposit(&c, &pool(PoolStatus::Pending), dec!(0), dec!(1000), Utc::now());
        assert!(decision.is_approved());
    }

    #[test]
    fn test_subscription_required() {
        let mut c = ctx();
        c.subscription_active = false;
        let decision =
            validate_deposit(&c, &pool(PoolStatus::Pending), dec!(0), dec!(500), Utc::now());
        assert_eq!(decision.reason(), Some(&RejectionReason::SubscriptionRequired));
    }

    #[test]
    fn test_blocked_user_rejected() {
        let mut c = ctx();
        c.blocked = true;
        let decision =
            validate_deposit(&c, &pool(PoolStatus::Pending), dec!(0), dec!(500), Utc::now());
        assert_eq!(decision.reason(), Some(&RejectionReason::AccountBlocked));
    }

    #[test]
    fn test_checks_short_circuit_in_order() {
        // KYC fires before the subscription and blocked checks.
        let mut c = ctx();
        c.kyc_status = KycStatus::Rejected;
        c.subscription_active = false;
        c.blocked = true;

        let decision =
            validate_deposit(&c, &pool(PoolStatus::Pending), dec!(0), dec!(2000), Utc::now());
        assert!(matches!(
            decision.reason(),
            Some(RejectionReason::KycRequired { .. })
        ));
    }

    #[test]
    fn test_investor_exposure_ceiling_is_cumulative() {
        // 4800 already held; another 300 would cross the 5000 ceiling.
        let decision = validate_deposit(
            &ctx(),
            &pool(PoolStatus::Pending),
            dec!(4800),
            dec!(300),
            Utc::now(),
        );
        assert_eq!(
            decision.reason(),
            Some(&RejectionReason::ExposureLimitExceeded { limit: dec!(5000) })
        );

        let decision = validate_deposit(
            &ctx(),
            &pool(PoolStatus::Pending),
            dec!(4800),
            dec!(200),
            Utc::now(),
        );
        assert!(decision.is_approved());
    }

    #[test]
    fn test_admin_uses_admin_ceiling() {
        let mut c = ctx();
        c.role = UserRole::Admin;
        let decision = validate_deposit(
            &c,
            &pool(PoolStatus::Pending),
            dec!(6000),
            dec!(1500),
            Utc::now(),
        );
        assert!(decision.is_approved());

        let decision = validate_deposit(
            &c,
            &pool(PoolStatus::Pending),
            dec!(6000),
            dec!(2500),
            Utc::now(),
        );
        assert_eq!(
            decision.reason(),
            Some(&RejectionReason::ExposureLimitExceeded { limit: dec!(8000) })
        );
    }

    #[test]
    fn test_super_admin_mfa_enforced_regardless_of_amount() {
        let mut c = ctx();
        c.role = UserRole::SuperAdmin;
        c.mfa_required = true;
        c.mfa_enabled = false;

        let decision =
            validate_deposit(&c, &pool(PoolStatus::Pending), dec!(0), dec!(100), Utc::now());
        assert_eq!(decision.reason(), Some(&RejectionReason::MfaRequired));

        c.mfa_enabled = true;
        let decision =
            validate_deposit(&c, &pool(PoolStatus::Pending), dec!(9000), dec!(500), Utc::now());
        assert!(decision.is_approved());
    }

    #[test]
    fn test_pool_must_be_open() {
        for status in [
            PoolStatus::Draft,
            PoolStatus::Paused,
            PoolStatus::Closed,
            PoolStatus::Cancelled,
        ] {
            let decision = validate_deposit(&ctx(), &pool(status), dec!(0), dec!(500), Utc::now());
            assert_eq!(decision.reason(), Some(&RejectionReason::PoolNotOpen));
        }
    }

    #[test]
    fn test_hard_cap_scenario() {
        // Pool{hardCap=10000, currentAmount=9500}: 600 rejected, 400 accepted.
        let mut p = pool(PoolStatus::Active);
        p.current_amount = dec!(9500);

        let decision = validate_deposit(&ctx(), &p, dec!(0), dec!(600), Utc::now());
        assert_eq!(
            decision.reason(),
            Some(&RejectionReason::HardCapExceeded {
                hard_cap: dec!(10000)
            })
        );

        let decision = validate_deposit(&ctx(), &p, dec!(0), dec!(400), Utc::now());
        assert!(decision.is_approved());
    }

    #[test]
    fn test_minimum_investment() {
        let decision =
            validate_deposit(&ctx(), &pool(PoolStatus::Pending), dec!(0), dec!(50), Utc::now());
        assert_eq!(
            decision.reason(),
            Some(&RejectionReason::BelowMinimum { minimum: dec!(100) })
        );
    }

    #[test]
    fn test_deposit_window_closes_after_48h() {
        let p = pool(PoolStatus::Active);
        let start = p.start_date.unwrap();

        let decision =
            validate_deposit(&ctx(), &p, dec!(0), dec!(500), start + Duration::hours(47));
        assert!(decision.is_approved());

        // Past the window even a perfect deposit is refused.
        let decision =
            validate_deposit(&ctx(), &p, dec!(0), dec!(500), start + Duration::hours(49));
        assert!(matches!(
            decision.reason(),
            Some(RejectionReason::DepositWindowClosed { .. })
        ));
    }

    #[test]
    fn test_sensitive_actions_super_admin_only() {
        let decision = validate_sensitive_action(&ctx(), SensitiveAction::EmergencyStop);
        assert_eq!(decision.reason(), Some(&RejectionReason::SuperAdminOnly));

        let mut c = ctx();
        c.role = UserRole::SuperAdmin;
        c.mfa_required = true;
        let decision = validate_sensitive_action(&c, SensitiveAction::ForceSettlement);
        assert_eq!(decision.reason(), Some(&RejectionReason::MfaRequired));

        c.mfa_enabled = true;
        assert!(validate_sensitive_action(&c, SensitiveAction::ModifyFees).is_approved());
    }
}
