use anyhow::{Context, Result};
use aws_smithy_types::date_time::Format;
use clap::Args;
use tracing::info;

use crate::{aws, commands, config};

#[derive(Debug, Clone, Args)]
pub struct AuthCommand {
    #[arg(
        short = 'r',
        long,
        help = "IAM role ARN to assume (overrides profile configuration)"
    )]
    pub role_arn: Option<String>,

    #[arg(
        long,
        help = "Use this identity token instead of fetching one from the metadata server"
    )]
    pub web_identity_token: Option<String>,
}

impl AuthCommand {
    pub async fn execute(self, profile: &str) -> Result<()> {
        info!("Starting authentication for profile: {}", profile);

        let mut config = config::load(profile).await.with_context(|| {
            format!(
                "Failed to load configuration for profile '{profile}'. Please run 'awsfed configure' first."
            )
        })?;

        if let Some(role_arn) = self.role_arn {
            config.role_arn = role_arn;
        }

        let provider = commands::build_provider(&config, self.web_identity_token)?;

        info!("Requesting AWS credentials for role: {}", config.role_arn);

        let credentials = provider
            .credentials()
            .await
            .context("Failed to obtain temporary credentials")?;

        aws::credentials::save_credentials(profile, &credentials)
            .await
            .context("Failed to save AWS credentials")?;

        println!("\nAWS credentials saved to {profile} profile.");
        println!(
            "Credentials will expire at: {}",
            credentials
                .expiration
                .fmt(Format::DateTime)
                .unwrap_or_else(|_| "unknown".to_string())
        );

        Ok(())
    }
}
