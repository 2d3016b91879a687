//! In-memory exchange token cache
//!
//! Tracks short-lived tokens that have been minted and not yet burned. Entries live only
//! in this process; a deployment with several instances needs a shared store instead.

use crate::storage::traits::ExchangeTokenCache;
use dashmap::DashSet;

/// Sharded concurrent set of live exchange tokens
#[derive(Default)]
pub struct MemoryExchangeTokenCache {
    tokens: DashSet<String>,
}

impl MemoryExchangeTokenCache {
    /// Create a new, empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live tokens
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl ExchangeTokenCache for MemoryExchangeTokenCache {
    fn insert(&self, token: &str) {
        self.tokens.insert(token.to_string());
    }

    fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    fn remove(&self, token: &str) -> bool {
        self.tokens.remove(token).is_some()
    }
}
