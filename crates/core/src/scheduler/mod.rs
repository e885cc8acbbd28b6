//! Periodic engine tasks.
//!
//! Three independent tickers drive the engine: the lifecycle sweep, the risk
//! sweep, and the allocation sweep. They share no in-process state; all
//! coordination happens through the ledger's conditional writes, so a
//! transition applied by one ticker simply makes the others' writes
//! no-ops. A tick that fails or times out is logged and retried on the next
//! interval.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::allocation::AllocationServiceTrait;
use crate::errors::Result;
use crate::pools::pools_traits::LifecycleServiceTrait;
use crate::risk::RiskMonitorTrait;

/// Cadences and the per-tick timeout, all in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerConfig {
    /// Lifecycle sweep cadence (default: 60, once per minute).
    pub lifecycle_interval_secs: u64,

    /// Risk sweep cadence (default: 300, every five minutes).
    pub risk_interval_secs: u64,

    /// Allocation sweep cadence (default: 86400, daily).
    pub allocation_interval_secs: u64,

    /// Upper bound on a single tick; a slow external call must not starve
    /// the following intervals (default: 30).
    pub tick_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lifecycle_interval_secs: 60,
            risk_interval_secs: 300,
            allocation_interval_secs: 86_400,
            tick_timeout_secs: 30,
        }
    }
}

/// Handle over the spawned tickers.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Signals every ticker to stop and waits for them to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

/// Spawns and owns the engine's periodic tasks.
pub struct EngineScheduler {
    lifecycle: Arc<dyn LifecycleServiceTrait>,
    risk: Arc<dyn RiskMonitorTrait>,
    allocation: Arc<dyn AllocationServiceTrait>,
    config: SchedulerConfig,
}

impl EngineScheduler {
    pub fn new(
        lifecycle: Arc<dyn LifecycleServiceTrait>,
        risk: Arc<dyn RiskMonitorTrait>,
        allocation: Arc<dyn AllocationServiceTrait>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            lifecycle,
            risk,
            allocation,
            config,
        }
    }

    /// Spawns the three tickers and returns the handle controlling them.
    pub fn spawn(&self) -> SchedulerHandle {
        let (shutdown, _) = watch::channel(false);
        let timeout = Duration::from_secs(self.config.tick_timeout_secs);

        let lifecycle = self.lifecycle.clone();
        let risk = self.risk.clone();
        let allocation = self.allocation.clone();

        let handles = vec![
            tokio::spawn(run_ticker(
                "lifecycle",
                Duration::from_secs(self.config.lifecycle_interval_secs),
                timeout,
                shutdown.subscribe(),
                move || {
                    let lifecycle = lifecycle.clone();
                    async move { lifecycle.tick().await.map(|_| ()) }
                },
            )),
            tokio::spawn(run_ticker(
                "risk",
                Duration::from_secs(self.config.risk_interval_secs),
                timeout,
                shutdown.subscribe(),
                move || {
                    let risk = risk.clone();
                    async move { risk.check_all().await }
                },
            )),
            tokio::spawn(run_ticker(
                "allocation",
                Duration::from_secs(self.config.allocation_interval_secs),
                timeout,
                shutdown.subscribe(),
                move || {
                    let allocation = allocation.clone();
                    async move { allocation.run_cycle().await.map(|_| ()) }
                },
            )),
        ];

        info!("engine scheduler started (lifecycle/risk/allocation tickers)");
        SchedulerHandle { shutdown, handles }
    }
}

async fn run_ticker<F, Fut>(
    name: &'static str,
    period: Duration,
    timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
    tick: F,
) where
    F: Fn() -> Fut + Send,
    Fut: Future<Output = Result<()>> + Send,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first interval tick fires immediately; skip it so a freshly
    // started engine waits one full period before its first sweep.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("{} ticker stopped", name);
                    return;
                }
            }
            _ = interval.tick() => {
                match tokio::time::timeout(timeout, tick()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        // Transient failures retry on the next interval.
                        error!("{} tick failed: {}", name, e);
                    }
                    Err(_) => {
                        warn!("{} tick timed out after {:?}", name, timeout);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::AllocationRunSummary;
    use crate::pools::lifecycle_service::LifecycleTickSummary;
    use crate::pools::pools_model::Pool;
    use crate::risk::risk_model::PoolHealthSample;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingServices {
        lifecycle_ticks: AtomicUsize,
        risk_ticks: AtomicUsize,
        allocation_ticks: AtomicUsize,
    }

    #[async_trait]
    impl LifecycleServiceTrait for CountingServices {
        async fn tick(&self) -> Result<LifecycleTickSummary> {
            self.lifecycle_ticks.fetch_add(1, Ordering::SeqCst);
            Ok(LifecycleTickSummary::default())
        }
    }

    #[async_trait]
    impl RiskMonitorTrait for CountingServices {
        async fn check_all(&self) -> Result<()> {
            self.risk_ticks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn evaluate_pool(&self, _pool: &Pool) -> PoolHealthSample {
            unimplemented!()
        }

        async fn resume_pool(&self, _pool_id: &str, _resumed_by: &str) -> Result<Pool> {
            unimplemented!()
        }

        async fn emergency_stop_all(&self, _triggered_by: &str) -> Result<usize> {
            unimplemented!()
        }
    }

    #[async_trait]
    impl AllocationServiceTrait for CountingServices {
        async fn run_cycle(&self) -> Result<AllocationRunSummary> {
            self.allocation_ticks.fetch_add(1, Ordering::SeqCst);
            Ok(AllocationRunSummary::default())
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.lifecycle_interval_secs, 60);
        assert_eq!(config.risk_interval_secs, 300);
        assert_eq!(config.allocation_interval_secs, 86_400);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tickers_fire_on_their_own_cadences() {
        let services = Arc::new(CountingServices::default());
        let scheduler = EngineScheduler::new(
            services.clone(),
            services.clone(),
            services.clone(),
            SchedulerConfig {
                lifecycle_interval_secs: 60,
                risk_interval_secs: 300,
                allocation_interval_secs: 86_400,
                tick_timeout_secs: 30,
            },
        );
        let handle = scheduler.spawn();

        // Eleven minutes of virtual time: 11 lifecycle ticks, 2 risk
        // sweeps, no allocation sweep yet.
        tokio::time::sleep(Duration::from_secs(11 * 60 + 1)).await;
        handle.stop().await;

        assert_eq!(services.lifecycle_ticks.load(Ordering::SeqCst), 11);
        assert_eq!(services.risk_ticks.load(Ordering::SeqCst), 2);
        assert_eq!(services.allocation_ticks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_tickers() {
        let services = Arc::new(CountingServices::default());
        let scheduler = EngineScheduler::new(
            services.clone(),
            services.clone(),
            services.clone(),
            SchedulerConfig {
                lifecycle_interval_secs: 10,
                risk_interval_secs: 10,
                allocation_interval_secs: 10,
                tick_timeout_secs: 5,
            },
        );
        let handle = scheduler.spawn();

        tokio::time::sleep(Duration::from_secs(11)).await;
        handle.stop().await;
        let after_stop = services.lifecycle_ticks.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(services.lifecycle_ticks.load(Ordering::SeqCst), after_stop);
        assert!(after_stop >= 1);
    }
}
