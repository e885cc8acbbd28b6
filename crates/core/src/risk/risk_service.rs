//! Circuit-breaker service.
//!
//! Sweeps every ACTIVE pool on its own cadence, records an equity point per
//! pool, evaluates health against the recorded series, and force-pauses
//! unhealthy pools. The pause is a conditional status write: if an emergency
//! stop already moved the pool out of ACTIVE, the health-based transition
//! loses the race and is discarded.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use dashmap::DashMap;
use log::{debug, error, info, warn};
use rust_decimal::Decimal;

use super::risk_model::{EquityPoint, HealthAlert, PoolHealthSample, RiskConfig};
use crate::errors::{Error, Result};
use crate::events::{EngineEvent, NotificationSink};
use crate::pools::pools_model::{Pool, PoolStatus};
use crate::pools::pools_traits::PoolRepositoryTrait;
use crate::utils::Clock;

/// Contract for the risk monitor.
#[async_trait]
pub trait RiskMonitorTrait: Send + Sync {
    /// Sweeps every ACTIVE pool once: records equity, evaluates health,
    /// trips the breaker on unhealthy pools, and broadcasts every sample.
    /// Per-pool failures are logged and do not abort the sweep.
    async fn check_all(&self) -> Result<()>;

    /// Evaluates a pool's health against the recorded series without
    /// recording a new point or mutating anything.
    fn evaluate_pool(&self, pool: &Pool) -> PoolHealthSample;

    /// Resumes a PAUSED pool after a fresh, synchronous health evaluation.
    /// Fails with `StateConflict` while the pool is still unhealthy.
    async fn resume_pool(&self, pool_id: &str, resumed_by: &str) -> Result<Pool>;

    /// Unconditionally pauses every ACTIVE pool, bypassing health
    /// evaluation, and emits one aggregate CRITICAL alert. Returns the
    /// number of pools paused.
    async fn emergency_stop_all(&self, triggered_by: &str) -> Result<usize>;
}

/// Periodic health monitor with per-pool equity history.
pub struct RiskMonitor {
    pools: Arc<dyn PoolRepositoryTrait>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    config: RiskConfig,
    history: DashMap<String, VecDeque<EquityPoint>>,
}

impl RiskMonitor {
    pub fn new(
        pools: Arc<dyn PoolRepositoryTrait>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        config: RiskConfig,
    ) -> Self {
        Self {
            pools,
            sink,
            clock,
            config,
            history: DashMap::new(),
        }
    }

    fn record_equity(&self, pool: &Pool) {
        let point = EquityPoint {
            at: self.clock.now(),
            total_invested: pool.total_invested,
            total_pnl: pool.total_pnl,
        };
        let mut series = self.history.entry(pool.id.clone()).or_default();
        series.push_back(point);
        while series.len() > self.config.max_history_points {
            series.pop_front();
        }
    }

    /// Peak decline from the window high to the pool's current NAV, in
    /// percent. Falls back to the cushion proxy while the series is too
    /// short for a real peak.
    fn drawdown_percentage(&self, pool: &Pool, window: &[EquityPoint]) -> Decimal {
        let nav_now = EquityPoint {
            at: self.clock.now(),
            total_invested: pool.total_invested,
            total_pnl: pool.total_pnl,
        }
        .nav();

        if window.len() < 2 {
            return Self::proxy_drawdown(pool, self.config.drawdown_cushion);
        }

        let peak = window
            .iter()
            .map(EquityPoint::nav)
            .fold(nav_now, |a, b| a.max(b));
        if peak <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (((peak - nav_now) / peak) * Decimal::ONE_HUNDRED).max(Decimal::ZERO)
    }

    /// Return-projection proxy used before enough history exists:
    /// `(max_return - total_return) / (1 + max_return) * 100`, floored at 0,
    /// with `max_return = total_return + cushion`.
    fn proxy_drawdown(pool: &Pool, cushion: Decimal) -> Decimal {
        if pool.current_amount <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let total_return = pool.total_pnl / pool.current_amount;
        let max_return = total_return + cushion;
        let denominator = Decimal::ONE + max_return;
        if denominator <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (((max_return - total_return) / denominator) * Decimal::ONE_HUNDRED).max(Decimal::ZERO)
    }

    fn daily_pnl(&self, pool: &Pool, window: &[EquityPoint]) -> Decimal {
        match window.first() {
            Some(earliest) => pool.total_pnl - earliest.total_pnl,
            None => Decimal::ZERO,
        }
    }

    fn window_points(&self, pool_id: &str) -> Vec<EquityPoint> {
        let cutoff = self.clock.now() - Duration::hours(self.config.history_window_hours);
        self.history
            .get(pool_id)
            .map(|series| series.iter().filter(|p| p.at >= cutoff).copied().collect())
            .unwrap_or_default()
    }

    async fn trip_breaker(&self, pool: &Pool, sample: &PoolHealthSample) {
        match self
            .pools
            .transition_status(&pool.id, &[PoolStatus::Active], PoolStatus::Paused)
            .await
        {
            Ok(_) => {
                warn!(
                    "circuit breaker tripped for pool {}: {}",
                    pool.id,
                    sample.reasons().join(", ")
                );
                self.sink.broadcast(EngineEvent::CircuitBreakerTripped {
                    pool_id: pool.id.clone(),
                    drawdown_percentage: sample.drawdown_percentage,
                    reasons: sample.reasons(),
                });
            }
            Err(Error::StateConflict(_)) => {
                // The pool already left ACTIVE (emergency stop or lifecycle
                // transition won the race); the stale health write is
                // discarded.
                debug!("pool {} no longer ACTIVE, skipping breaker trip", pool.id);
            }
            Err(e) => {
                error!("failed to pause pool {}: {}", pool.id, e);
            }
        }
    }
}

#[async_trait]
impl RiskMonitorTrait for RiskMonitor {
    async fn check_all(&self) -> Result<()> {
        let active = self.pools.list_by_status(&[PoolStatus::Active])?;
        debug!("risk sweep over {} active pools", active.len());

        for pool in active {
            self.record_equity(&pool);
            let sample = self.evaluate_pool(&pool);

            if !sample.is_healthy {
                self.trip_breaker(&pool, &sample).await;
            }

            // Dashboards receive every sample, healthy or not.
            self.sink.broadcast(EngineEvent::PoolHealth { sample });
        }
        Ok(())
    }

    fn evaluate_pool(&self, pool: &Pool) -> PoolHealthSample {
        let window = self.window_points(&pool.id);
        let drawdown_percentage = self.drawdown_percentage(pool, &window);
        let daily_pnl = self.daily_pnl(pool, &window);
        let loss_threshold = -pool.current_amount * self.config.daily_loss_fraction;

        let mut alerts = Vec::new();
        if drawdown_percentage > pool.max_daily_drawdown {
            alerts.push(HealthAlert::DrawdownExceeded {
                observed: drawdown_percentage,
                limit: pool.max_daily_drawdown,
            });
        }
        if daily_pnl < loss_threshold {
            alerts.push(HealthAlert::DailyLossExceeded {
                daily_pnl,
                threshold: loss_threshold,
            });
        }

        PoolHealthSample {
            pool_id: pool.id.clone(),
            current_pnl: pool.total_pnl,
            daily_pnl,
            drawdown_percentage,
            is_healthy: alerts.is_empty(),
            alerts,
            sampled_at: self.clock.now(),
        }
    }

    async fn resume_pool(&self, pool_id: &str, resumed_by: &str) -> Result<Pool> {
        let pool = self.pools.get_by_id(pool_id)?;
        if pool.status != PoolStatus::Paused {
            return Err(Error::state_conflict(format!(
                "pool {} is {}, not paused",
                pool_id, pool.status
            )));
        }

        let sample = self.evaluate_pool(&pool);
        if !sample.is_healthy {
            return Err(Error::state_conflict(format!(
                "pool {} still unhealthy: {}",
                pool_id,
                sample.reasons().join(", ")
            )));
        }

        let pool = self
            .pools
            .transition_status(pool_id, &[PoolStatus::Paused], PoolStatus::Active)
            .await?;

        info!("pool {} resumed by {}", pool_id, resumed_by);
        self.sink.broadcast(EngineEvent::PoolResumed {
            pool_id: pool_id.to_string(),
            resumed_by: resumed_by.to_string(),
        });
        Ok(pool)
    }

    async fn emergency_stop_all(&self, triggered_by: &str) -> Result<usize> {
        let active = self.pools.list_by_status(&[PoolStatus::Active])?;
        let mut paused_count = 0;

        for pool in &active {
            match self
                .pools
                .transition_status(&pool.id, &[PoolStatus::Active], PoolStatus::Paused)
                .await
            {
                Ok(_) => paused_count += 1,
                Err(Error::StateConflict(_)) => {
                    debug!("pool {} already left ACTIVE during emergency stop", pool.id);
                }
                Err(e) => {
                    error!("failed to pause pool {} during emergency stop: {}", pool.id, e);
                }
            }
        }

        error!(
            "EMERGENCY STOP by {}: {} pools paused",
            triggered_by, paused_count
        );
        self.sink.broadcast(EngineEvent::EmergencyStop {
            paused_count,
            triggered_by: triggered_by.to_string(),
        });
        Ok(paused_count)
    }
}
