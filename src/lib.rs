//! AWS temporary credentials from OIDC identity tokens.
//!
//! `awsfed` bridges an OIDC identity provider (typically a GCP service
//! account or workload identity) and AWS STS: identity tokens are exchanged
//! through `AssumeRoleWithWebIdentity` for session credentials, which are
//! cached and refreshed shortly before they expire. The resulting
//! [`WebIdentityCredentials`] implements the SDK's `ProvideCredentials`, so
//! it plugs into any AWS service client.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use awsfed::config::ProviderConfig;
//! use awsfed::provider::WebIdentityCredentials;
//! use awsfed::token::MetadataTokenSource;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = ProviderConfig::builder()
//!     .role_arn("arn:aws:iam::123456789012:role/reader")
//!     .build()?;
//!
//! let provider =
//!     WebIdentityCredentials::with_sts(&config, Arc::new(MetadataTokenSource::new()?));
//!
//! let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
//!     .credentials_provider(provider)
//!     .region(config.region().clone())
//!     .load()
//!     .await;
//! let s3 = aws_sdk_s3::Client::new(&sdk_config);
//! # Ok(())
//! # }
//! ```

pub mod aws;
pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod provider;
pub mod token;

pub use config::ProviderConfig;
pub use error::ProviderError;
pub use provider::WebIdentityCredentials;
