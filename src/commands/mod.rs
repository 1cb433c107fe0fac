use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::provider::WebIdentityCredentials;
use crate::token::{IdentityTokenSource, MetadataTokenSource, StaticTokenSource};

pub mod auth;
pub mod completions;
pub mod configure;
pub mod ls;
pub mod process;

pub use auth::AuthCommand;
pub use completions::CompletionsCommand;
pub use configure::ConfigureCommand;
pub use ls::LsCommand;
pub use process::ProcessCommand;

/// Wire a provider from profile configuration, preferring an explicitly
/// supplied identity token over the metadata server.
pub(crate) fn build_provider(
    config: &Config,
    web_identity_token: Option<String>,
) -> Result<WebIdentityCredentials> {
    let provider_config = config
        .provider_config()
        .context("Invalid profile configuration")?;

    let token_source: Arc<dyn IdentityTokenSource> = match web_identity_token {
        Some(token) => Arc::new(StaticTokenSource::new(token)),
        None => Arc::new(
            MetadataTokenSource::new().context("Failed to build metadata token source")?,
        ),
    };

    Ok(WebIdentityCredentials::with_sts(
        &provider_config,
        token_source,
    ))
}
