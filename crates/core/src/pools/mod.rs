pub mod lifecycle_service;
pub mod pools_model;
pub mod pools_service;
pub mod pools_traits;

pub use lifecycle_service::{LifecycleService, LifecycleTickSummary};
pub use pools_model::{ModelType, NewPool, Pool, PoolStatus, PoolUpdate, RiskLevel};
pub use pools_service::PoolService;
pub use pools_traits::{
    LifecycleServiceTrait, NoOpTradingAdapter, PoolRepositoryTrait, PoolServiceTrait,
    TradingAdapterTrait,
};
