//! Permission-gated authorization core.
//!
//! Each request walks a fixed sequence: the raw token is verified against
//! the external provider (through the TTL cache), the verified email must
//! belong to an accepted organization domain, the principal is upserted by
//! email and must not be disabled, and the effective permission set is
//! computed from the currently active grants. The organization gate runs
//! before the upsert, so a token from a foreign domain never creates a
//! principal row. The disabled check reads the database on every call and
//! is never cached.
//!
//! Mutating operations declare their required permissions and call
//! [`AuthContext::require`] before any side effect. `FULL` satisfies any
//! requirement; an empty effective set satisfies none.

pub mod cache;
pub mod errors;
pub mod verifier;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;

use crate::permissions::PermissionKind;
use crate::storage;
use self::cache::VerificationCache;
use self::errors::AuthError;
use self::verifier::IdentityVerifier;

/// An authenticated principal together with its effective permission set.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub principal: storage::Principal,
    pub permissions: HashSet<PermissionKind>,
}

impl AuthContext {
    /// Gate an operation on its declared permission requirement: the
    /// effective set must contain `Full` or intersect `required`.
    pub fn require(&self, required: &[PermissionKind]) -> Result<(), AuthError> {
        if self.permissions.contains(&PermissionKind::Full) {
            return Ok(());
        }
        if required.iter().any(|kind| self.permissions.contains(kind)) {
            return Ok(());
        }
        Err(AuthError::PermissionDenied {
            required: required
                .iter()
                .map(|kind| kind.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}

/// Resolves bearer tokens to principals and enforces the organization gate.
pub struct AuthGate {
    verifier: Arc<dyn IdentityVerifier>,
    cache: VerificationCache,
    allowed_domains: Vec<String>,
}

impl AuthGate {
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        allowed_domains: Vec<String>,
        cache_capacity: u64,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            verifier,
            cache: VerificationCache::new(cache_capacity, cache_ttl),
            allowed_domains,
        }
    }

    /// Authenticate a bearer token and resolve its principal.
    pub async fn authenticate(
        &self,
        db: &DatabaseConnection,
        token: &str,
    ) -> Result<AuthContext, AuthError> {
        let identity = match self.cache.get(token).await {
            Some(identity) => identity,
            None => {
                let identity = self.verifier.verify(token).await?;
                self.cache.insert(token.to_string(), identity.clone()).await;
                identity
            }
        };

        if !self.domain_allowed(&identity.email) {
            return Err(AuthError::OrganizationRejected {
                email: identity.email,
            });
        }

        let principal = storage::upsert_principal_by_email(db, &identity.email).await?;
        if principal.disabled {
            return Err(AuthError::AccountDisabled {
                email: principal.email,
            });
        }

        let permissions = storage::active_permission_kinds(db, principal.id).await?;
        Ok(AuthContext {
            principal,
            permissions,
        })
    }

    /// A domain is accepted when it equals an allow-listed domain or is a
    /// subdomain of one (`discente.ufma.br` under `ufma.br`).
    fn domain_allowed(&self, email: &str) -> bool {
        let Some((_, domain)) = email.rsplit_once('@') else {
            return false;
        };
        self.allowed_domains.iter().any(|allowed| {
            domain == allowed
                || (domain.len() > allowed.len()
                    && domain.ends_with(allowed)
                    && domain.as_bytes()[domain.len() - allowed.len() - 1] == b'.')
        })
    }
}
