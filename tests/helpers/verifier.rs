use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use lectern::auth::errors::AuthError;
use lectern::auth::verifier::{IdentityVerifier, VerifiedIdentity};

/// In-memory identity provider: a fixed token -> email table plus a call
/// counter for cache assertions. Unknown tokens fail verification.
pub struct StubVerifier {
    identities: HashMap<String, String>,
    calls: AtomicUsize,
}

impl StubVerifier {
    pub fn new() -> Self {
        Self {
            identities: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_token(mut self, token: &str, email: &str) -> Self {
        self.identities.insert(token.to_string(), email.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for StubVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityVerifier for StubVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.identities.get(token) {
            Some(email) => Ok(VerifiedIdentity {
                email: email.clone(),
                name: None,
                picture: None,
            }),
            None => Err(AuthError::AuthenticationFailed),
        }
    }
}
