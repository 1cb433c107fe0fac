use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use clap::Args;
use tracing::info;

use crate::{commands, config};

#[derive(Debug, Clone, Args)]
pub struct LsCommand {
    #[arg(help = "S3 bucket to list")]
    pub bucket: String,

    #[arg(long, default_value_t = 100, help = "Maximum number of keys to list")]
    pub max_keys: i32,

    #[arg(
        long,
        help = "Use this identity token instead of fetching one from the metadata server"
    )]
    pub web_identity_token: Option<String>,
}

impl LsCommand {
    /// List a bucket with a client that signs every request using the
    /// federated provider, demonstrating the full chain.
    pub async fn execute(self, profile: &str) -> Result<()> {
        let config = config::load(profile).await.with_context(|| {
            format!(
                "Failed to load configuration for profile '{profile}'. Please run 'awsfed configure' first."
            )
        })?;

        let region = config
            .provider_config()
            .context("Invalid profile configuration")?
            .region()
            .clone();

        let provider = commands::build_provider(&config, self.web_identity_token)?;

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(provider)
            .region(region)
            .load()
            .await;

        let client = aws_sdk_s3::Client::new(&sdk_config);

        info!("Listing objects in bucket: {}", self.bucket);

        let response = client
            .list_objects_v2()
            .bucket(&self.bucket)
            .max_keys(self.max_keys)
            .send()
            .await
            .context("Failed to list objects")?;

        for object in response.contents() {
            println!("{}", object.key().unwrap_or_default());
        }

        Ok(())
    }
}
