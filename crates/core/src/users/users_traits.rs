//! User repository trait.
//!
//! The engine only ever reads users; account management lives outside the
//! engine. The trait is ledger-agnostic so different stores can back it.

use super::users_model::User;
use crate::errors::Result;

/// Contract for read-only user lookups.
pub trait UserRepositoryTrait: Send + Sync {
    /// Retrieves a user by id.
    fn get_by_id(&self, user_id: &str) -> Result<User>;
}
