pub mod allocation_model;
pub mod allocation_service;

pub use allocation_model::{AllocationRunSummary, AllocationTables, ReinvestmentOption};
pub use allocation_service::{AllocationEngine, AllocationServiceTrait};
