//! Risk monitor domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// A condition that marked a pool unhealthy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HealthAlert {
    /// Peak-to-trough decline crossed the pool's configured ceiling.
    DrawdownExceeded { observed: Decimal, limit: Decimal },

    /// The short-window P&L fell below the loss threshold.
    DailyLossExceeded {
        daily_pnl: Decimal,
        threshold: Decimal,
    },
}

impl std::fmt::Display for HealthAlert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthAlert::DrawdownExceeded { observed, limit } => {
                write!(f, "drawdown critical: {observed}% > {limit}%")
            }
            HealthAlert::DailyLossExceeded {
                daily_pnl,
                threshold,
            } => {
                write!(f, "daily loss: {daily_pnl} below threshold {threshold}")
            }
        }
    }
}

/// One health evaluation of a pool. Ephemeral: produced on each sweep,
/// consumed immediately, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolHealthSample {
    pub pool_id: String,
    pub current_pnl: Decimal,
    pub daily_pnl: Decimal,
    pub drawdown_percentage: Decimal,
    pub is_healthy: bool,
    pub alerts: Vec<HealthAlert>,
    pub sampled_at: DateTime<Utc>,
}

impl PoolHealthSample {
    /// Human-readable reason strings for the triggering conditions.
    pub fn reasons(&self) -> Vec<String> {
        self.alerts.iter().map(|a| a.to_string()).collect()
    }
}

/// One observation of a pool's capital and P&L, recorded per sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    pub at: DateTime<Utc>,
    pub total_invested: Decimal,
    pub total_pnl: Decimal,
}

impl EquityPoint {
    /// Net asset value per unit invested (1 = break-even).
    pub fn nav(&self) -> Decimal {
        if self.total_invested <= Decimal::ZERO {
            return Decimal::ONE;
        }
        Decimal::ONE + self.total_pnl / self.total_invested
    }
}

/// Business-tunable thresholds for the circuit breaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskConfig {
    /// A daily loss worse than this fraction of the pool's capital trips
    /// the breaker (default: 0.05 = 5%).
    pub daily_loss_fraction: Decimal,

    /// Return cushion used by the drawdown proxy while the equity series is
    /// too short for a real peak (default: 0.05).
    pub drawdown_cushion: Decimal,

    /// Look-back window for peak tracking and the daily P&L estimate
    /// (default: 24).
    pub history_window_hours: i64,

    /// Upper bound on retained equity points per pool (default: 2880, ten
    /// days of five-minute sweeps).
    pub max_history_points: usize,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            daily_loss_fraction: dec!(0.05),
            drawdown_cushion: dec!(0.05),
            history_window_hours: 24,
            max_history_points: 2880,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_messages_name_the_condition() {
        let alert = HealthAlert::DrawdownExceeded {
            observed: dec!(12.41),
            limit: dec!(10),
        };
        assert_eq!(alert.to_string(), "drawdown critical: 12.41% > 10%");

        let alert = HealthAlert::DailyLossExceeded {
            daily_pnl: dec!(-700),
            threshold: dec!(-500),
        };
        assert_eq!(alert.to_string(), "daily loss: -700 below threshold -500");
    }

    #[test]
    fn test_nav_guards_zero_invested() {
        let point = EquityPoint {
            at: Utc::now(),
            total_invested: Decimal::ZERO,
            total_pnl: dec!(100),
        };
        assert_eq!(point.nav(), Decimal::ONE);

        let point = EquityPoint {
            at: Utc::now(),
            total_invested: dec!(1000),
            total_pnl: dec!(100),
        };
        assert_eq!(point.nav(), dec!(1.1));
    }

    #[test]
    fn test_risk_config_defaults() {
        let config = RiskConfig::default();
        assert_eq!(config.daily_loss_fraction, dec!(0.05));
        assert_eq!(config.drawdown_cushion, dec!(0.05));
        assert_eq!(config.history_window_hours, 24);
    }

    #[test]
    fn test_sample_round_trip() {
        let sample = PoolHealthSample {
            pool_id: "p1".to_string(),
            current_pnl: dec!(-120),
            daily_pnl: dec!(-80),
            drawdown_percentage: dec!(11.2),
            is_healthy: false,
            alerts: vec![HealthAlert::DrawdownExceeded {
                observed: dec!(11.2),
                limit: dec!(10),
            }],
            sampled_at: Utc::now(),
        };

        let json = serde_json::to_string(&sample).unwrap();
        let parsed: PoolHealthSample = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.pool_id, "p1");
        assert!(!parsed.is_healthy);
        assert_eq!(parsed.alerts, sample.alerts);
    }
}
