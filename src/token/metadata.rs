use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::{IdentityToken, IdentityTokenSource};
use crate::constants::METADATA_IDENTITY_URL;
use crate::error::BoxError;

const METADATA_FLAVOR_HEADER: &str = "Metadata-Flavor";
const METADATA_FLAVOR_VALUE: &str = "Google";
const METADATA_TIMEOUT: Duration = Duration::from_secs(5);

/// Fetches identity tokens from the GCE metadata server.
///
/// Available on GCE, GKE, Cloud Run and Cloud Functions, where the attached
/// service account signs a token for whatever audience is requested. The
/// metadata server is link-local, so the timeout is short.
#[derive(Debug, Clone)]
pub struct MetadataTokenSource {
    client: Client,
    endpoint: Url,
}

impl MetadataTokenSource {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(METADATA_TIMEOUT).build()?;
        let endpoint =
            Url::parse(METADATA_IDENTITY_URL).expect("metadata identity URL is well-formed");
        Ok(Self { client, endpoint })
    }

    /// Point the source at a non-standard metadata endpoint, e.g. an
    /// emulator.
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    fn identity_url(&self, audience: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("audience", audience)
            .append_pair("format", "full");
        url
    }
}

#[async_trait]
impl IdentityTokenSource for MetadataTokenSource {
    async fn identity_token(&self, audience: &str) -> Result<IdentityToken, BoxError> {
        debug!("Requesting identity token from metadata server");

        let response = self
            .client
            .get(self.identity_url(audience))
            .header(METADATA_FLAVOR_HEADER, METADATA_FLAVOR_VALUE)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(format!("metadata server returned {}", response.status()).into());
        }

        let token = response.text().await?;
        Ok(IdentityToken::new(token.trim()))
    }
}
