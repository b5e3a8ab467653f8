//! External identity verification.
//!
//! The provider is a black box behind [`IdentityVerifier`]: given an opaque
//! bearer token it yields the verified claims or a failure. Tests substitute
//! a stub; production uses [`HttpTokenVerifier`] against the provider's
//! token-info endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::auth::errors::AuthError;

/// Claims returned by the identity provider for a valid token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError>;
}

/// Verifies tokens with a GET to the provider's token-info endpoint.
pub struct HttpTokenVerifier {
    client: reqwest::Client,
    token_info_url: String,
}

impl HttpTokenVerifier {
    pub fn new(token_info_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token_info_url,
        }
    }
}

#[async_trait]
impl IdentityVerifier for HttpTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        let response = self
            .client
            .get(&self.token_info_url)
            .query(&[("access_token", token)])
            .send()
            .await
            .map_err(|e| {
                tracing::error!("token verification request failed: {e}");
                AuthError::AuthenticationFailed
            })?;

        if !response.status().is_success() {
            return Err(AuthError::AuthenticationFailed);
        }

        response.json::<VerifiedIdentity>().await.map_err(|e| {
            tracing::error!("token-info response malformed: {e}");
            AuthError::AuthenticationFailed
        })
    }
}
