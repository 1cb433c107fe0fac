use std::fmt;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sts::Client as StsClient;
use tracing::{debug, info};

use super::Credentials;
use crate::error::BoxError;

/// Parameters of the web-identity exchange, fixed at construction and never
/// mutated afterwards. The identity token is attached per refresh cycle.
#[derive(Debug, Clone)]
pub struct ExchangeRequest {
    pub role_arn: String,
    pub session_name: String,
    pub audience: String,
    pub duration_seconds: i32,
}

/// Capability performing the identity-token-for-credentials exchange.
///
/// Implementations are stateless and reentrant; the provider invokes at most
/// one exchange per refresh cycle.
#[async_trait]
pub trait ExchangeCredentials: Send + Sync + fmt::Debug {
    async fn exchange(
        &self,
        request: &ExchangeRequest,
        identity_token: &str,
    ) -> Result<Credentials, BoxError>;
}

/// Exchange client backed by AWS STS `AssumeRoleWithWebIdentity`.
#[derive(Debug, Clone)]
pub struct StsExchange {
    region: Region,
}

impl StsExchange {
    /// The exchange call is unsigned, so a region is the only thing needed
    /// to reach the right STS endpoint.
    pub fn new(region: Region) -> Self {
        Self { region }
    }
}

#[async_trait]
impl ExchangeCredentials for StsExchange {
    async fn exchange(
        &self,
        request: &ExchangeRequest,
        identity_token: &str,
    ) -> Result<Credentials, BoxError> {
        info!("Calling AWS STS AssumeRoleWithWebIdentity");
        debug!("Role ARN: {}", request.role_arn);
        debug!("Session name: {}", request.session_name);
        debug!("Region: {}", self.region);
        debug!("Duration: {} seconds", request.duration_seconds);

        // AssumeRoleWithWebIdentity is anonymous; ambient credentials must
        // not leak into the request
        let config = aws_config::defaults(BehaviorVersion::latest())
            .no_credentials()
            .region(self.region.clone())
            .load()
            .await;

        let client = StsClient::new(&config);

        let response = client
            .assume_role_with_web_identity()
            .role_arn(&request.role_arn)
            .role_session_name(&request.session_name)
            .web_identity_token(identity_token)
            .duration_seconds(request.duration_seconds)
            .send()
            .await?;

        let sts_creds = response.credentials().ok_or("AWS STS returned no credentials")?;

        let credentials = Credentials {
            access_key_id: sts_creds.access_key_id().to_string(),
            secret_access_key: sts_creds.secret_access_key().to_string(),
            session_token: sts_creds.session_token().to_string(),
            expiration: *sts_creds.expiration(),
        };

        info!("Successfully obtained AWS credentials");
        Ok(credentials)
    }
}
