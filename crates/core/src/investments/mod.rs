pub mod eligibility;
pub mod investments_model;
pub mod investments_service;
pub mod investments_traits;

pub use eligibility::{GateContext, GateDecision, RejectionReason, SensitiveAction};
pub use investments_model::{Investment, InvestmentStatus, NewInvestment};
pub use investments_service::InvestmentService;
pub use investments_traits::{InvestmentRepositoryTrait, InvestmentServiceTrait};
