use std::fmt;

use async_trait::async_trait;

use crate::error::BoxError;

pub mod metadata;

pub use metadata::MetadataTokenSource;

/// A signed OIDC identity token issued for a target audience.
#[derive(Clone)]
pub struct IdentityToken(String);

impl IdentityToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Bearer-token string representation attached to the exchange request.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Token bodies must never land in logs or error output
impl fmt::Debug for IdentityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IdentityToken(***)")
    }
}

/// Source of signed identity tokens for a target audience.
///
/// Implementations may perform network I/O and must be safe to call from
/// concurrent tasks, though the provider only ever invokes one fetch per
/// refresh cycle.
#[async_trait]
pub trait IdentityTokenSource: Send + Sync + fmt::Debug {
    async fn identity_token(&self, audience: &str) -> Result<IdentityToken, BoxError>;
}

/// Token source returning a fixed, caller-supplied token.
///
/// Useful when the token is minted out of band (CI pipelines, tests); the
/// audience is ignored because the token is already bound to one.
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    token: IdentityToken,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: IdentityToken::new(token),
        }
    }
}

#[async_trait]
impl IdentityTokenSource for StaticTokenSource {
    async fn identity_token(&self, _audience: &str) -> Result<IdentityToken, BoxError> {
        Ok(self.token.clone())
    }
}
