//! Bounded TTL cache for verified identities.
//!
//! Owned by the [`crate::auth::AuthGate`] as an explicit collaborator:
//! lookups happen before the external verifier, misses fall through to it.
//! Entries are keyed by the raw bearer token and invalidated only by
//! expiry. Only provider claims are cached; the disabled-account check runs
//! against the database on every request. Concurrent misses for the same
//! token may verify twice, which is acceptable.

use std::time::Duration;

use moka::future::Cache;

use crate::auth::verifier::VerifiedIdentity;

#[derive(Clone)]
pub struct VerificationCache {
    inner: Cache<String, VerifiedIdentity>,
}

impl VerificationCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self { inner }
    }

    pub async fn get(&self, token: &str) -> Option<VerifiedIdentity> {
        self.inner.get(token).await
    }

    pub async fn insert(&self, token: String, identity: VerifiedIdentity) {
        self.inner.insert(token, identity).await;
    }
}
