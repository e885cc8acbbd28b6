pub mod users_model;
pub mod users_traits;

pub use users_model::{KycStatus, User, UserRole};
pub use users_traits::UserRepositoryTrait;
