//! Engine event types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::risk::risk_model::PoolHealthSample;

/// Severity attached to an emitted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    #[default]
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "INFO",
            AlertSeverity::Warning => "WARNING",
            AlertSeverity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Events emitted by the engine after successful mutations and health
/// sweeps.
///
/// These are facts about engine state changes. Runtime adapters translate
/// them into platform-specific delivery (websocket push, dashboards, ...).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Periodic health sample for dashboards, emitted healthy or not.
    PoolHealth { sample: PoolHealthSample },

    /// The circuit breaker forced a pool out of trading.
    CircuitBreakerTripped {
        pool_id: String,
        drawdown_percentage: Decimal,
        reasons: Vec<String>,
    },

    /// A paused pool passed a fresh health check and resumed trading.
    PoolResumed { pool_id: String, resumed_by: String },

    /// Every active pool was halted unconditionally.
    EmergencyStop {
        paused_count: usize,
        triggered_by: String,
    },

    /// A pool reached its start date and began trading.
    PoolActivated { pool_id: String },

    /// A pool reached its end date and stopped accepting activity.
    PoolClosed { pool_id: String },

    /// A pool reached its settle date; positions are being settled.
    PoolSettling {
        pool_id: String,
        completed_investments: usize,
    },

    /// A pool was stopped by an administrative emergency action.
    PoolStopped { pool_id: String, stopped_by: String },

    /// A deposit was accepted and confirmed.
    InvestmentConfirmed {
        investment_id: String,
        pool_id: String,
        amount: Decimal,
    },

    /// Matured funds are parked and ready for withdrawal.
    FundsWithdrawable {
        investment_id: String,
        amount: Decimal,
    },

    /// No destination pool could absorb the matured funds.
    NoReinvestmentOptions {
        investment_id: String,
        amount: Decimal,
    },

    /// Matured capital was rolled into a new pool.
    ReinvestmentCompleted {
        source_investment_id: String,
        new_investment_id: String,
        from_pool_id: String,
        to_pool_id: String,
        amount: Decimal,
    },
}

impl EngineEvent {
    /// Severity the sink should attach when relaying this event.
    pub fn severity(&self) -> AlertSeverity {
        match self {
            EngineEvent::CircuitBreakerTripped { .. } | EngineEvent::EmergencyStop { .. } => {
                AlertSeverity::Critical
            }
            EngineEvent::PoolStopped { .. } => AlertSeverity::Warning,
            _ => AlertSeverity::Info,
        }
    }
}
