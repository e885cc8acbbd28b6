pub mod risk_model;
pub mod risk_service;

pub use risk_model::{EquityPoint, HealthAlert, PoolHealthSample, RiskConfig};
pub use risk_service::{RiskMonitor, RiskMonitorTrait};
