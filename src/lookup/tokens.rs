//! Route token storage.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;

use crate::config::schema::TokenConfig;
use crate::routing::route::ResolvedRoute;

/// Looks up routes stored behind opaque tokens.
pub trait TokenStore: Send + Sync {
    /// The route stored for `token`, if the token is known and still valid.
    fn lookup(&self, token: &str) -> Option<ResolvedRoute>;
}

/// A stored token.
#[derive(Debug, Clone)]
pub struct StoredToken {
    pub route: ResolvedRoute,
    /// Expiry timestamp (seconds since epoch).
    pub expires_at: Option<u64>,
    pub usage_limit: Option<u32>,
    pub usage_count: u32,
}

impl StoredToken {
    /// Check if the token has expired.
    pub fn is_expired(&self) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }

    fn is_used_up(&self) -> bool {
        self.usage_limit.is_some_and(|limit| self.usage_count >= limit)
    }
}

/// A thread-safe in-memory token store.
#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    inner: Arc<DashMap<String, StoredToken>>,
}

impl MemoryTokenStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store from configuration.
    pub fn from_config(tokens: &[TokenConfig]) -> Self {
        let store = Self::new();
        for token in tokens {
            store.insert(
                token.token.clone(),
                ResolvedRoute::new(token.action.clone(), token.params.clone()),
                token.expires_at,
                token.usage_limit,
            );
        }
        store
    }

    pub fn insert(
        &self,
        token: impl Into<String>,
        route: ResolvedRoute,
        expires_at: Option<u64>,
        usage_limit: Option<u32>,
    ) {
        self.inner.insert(
            token.into(),
            StoredToken {
                route,
                expires_at,
                usage_limit,
                usage_count: 0,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl TokenStore for MemoryTokenStore {
    fn lookup(&self, token: &str) -> Option<ResolvedRoute> {
        let mut entry = self.inner.get_mut(token)?;
        if entry.is_expired() {
            drop(entry);
            self.inner.remove(token);
            tracing::debug!("Dropped expired route token");
            return None;
        }
        if entry.is_used_up() {
            return None;
        }
        entry.usage_count += 1;
        Some(entry.route.clone())
    }
}
