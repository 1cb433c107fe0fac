use std::sync::Arc;

use thiserror::Error;

/// Error type accepted from the token-source and exchange capabilities.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by the credential provider.
///
/// Cloneable so that a single failed refresh cycle can be delivered to every
/// caller that joined it; the underlying causes are shared, not copied.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The identity-token source failed to produce a token.
    #[error("fetching identity token from the source provider")]
    TokenFetch {
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// STS rejected the exchange or could not be reached.
    #[error("exchanging identity token for temporary credentials")]
    Exchange {
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// Required configuration absent or malformed. Raised when the
    /// configuration is built, never during a refresh.
    #[error("invalid provider configuration: {reason}")]
    Configuration { reason: String },
}

impl ProviderError {
    pub fn token_fetch(source: BoxError) -> Self {
        Self::TokenFetch {
            source: source.into(),
        }
    }

    pub fn exchange(source: BoxError) -> Self {
        Self::Exchange {
            source: source.into(),
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}
