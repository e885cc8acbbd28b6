//! User domain models.
//!
//! The engine reads users to build gate contexts and to resolve allocation
//! preferences; user mutation happens elsewhere and is out of scope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Platform role, in ascending order of privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Investor,
    Manager,
    Admin,
    SuperAdmin,
}

impl UserRole {
    /// Returns the persisted string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Investor => "investor",
            UserRole::Manager => "manager",
            UserRole::Admin => "admin",
            UserRole::SuperAdmin => "super_admin",
        }
    }

    /// True for roles with administrative privileges over pools.
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::SuperAdmin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of the KYC review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// Domain model for a platform user, restricted to the fields the engine
/// reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub role: UserRole,
    pub kyc_status: KycStatus,
    pub mfa_enabled: bool,
    /// MFA enforced for this account (set for super admins).
    pub mfa_required: bool,
    pub is_blocked: bool,
    pub has_active_subscription: bool,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    /// Matured capital is re-allocated automatically when set.
    pub auto_reinvest: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// True when the subscription flag is set or the paid period has not
    /// expired yet.
    pub fn subscription_active(&self, now: DateTime<Utc>) -> bool {
        self.has_active_subscription
            || self.subscription_expires_at.is_some_and(|at| at > now)
    }
}
