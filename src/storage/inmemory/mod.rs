//! In-memory storage implementations
//!
//! This module provides in-memory implementations of all storage traits.
//! These implementations are suitable for development, testing, and single-instance deployments.

mod exchange_tokens;
mod identity;

pub use exchange_tokens::MemoryExchangeTokenCache;
pub use identity::MemoryIdentityStorage;
