use std::io::{self, Write};

use anyhow::{Context, Result};
use aws_smithy_types::date_time::Format;
use clap::Args;
use serde::Serialize;

use crate::aws::Credentials;
use crate::{commands, config};

/// Output format consumed by the AWS CLI/SDK `credential_process` hook
#[derive(Debug, Serialize)]
struct ProcessCredentials {
    #[serde(rename = "Version")]
    version: u32,
    #[serde(rename = "AccessKeyId")]
    access_key_id: String,
    #[serde(rename = "SecretAccessKey")]
    secret_access_key: String,
    #[serde(rename = "SessionToken")]
    session_token: String,
    #[serde(rename = "Expiration")]
    expiration: String,
}

impl ProcessCredentials {
    fn from_credentials(creds: &Credentials) -> Result<Self> {
        let expiration = creds
            .expiration
            .fmt(Format::DateTime)
            .context("Failed to format credential expiration")?;

        Ok(Self {
            version: 1,
            access_key_id: creds.access_key_id.clone(),
            secret_access_key: creds.secret_access_key.clone(),
            session_token: creds.session_token.clone(),
            expiration,
        })
    }
}

#[derive(Debug, Clone, Args)]
pub struct ProcessCommand {
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

impl ProcessCommand {
    /// Print fresh credentials as credential_process JSON on stdout.
    ///
    /// The AWS CLI invokes this on every client construction, so everything
    /// except the JSON document stays off stdout.
    pub async fn execute(self, profile: &str) -> Result<()> {
        let mut config = config::load(profile).await.with_context(|| {
            format!(
                "Failed to load configuration for profile '{profile}'. Please run 'awsfed configure' first."
            )
        })?;

        if let Some(role_arn) = self.role_arn {
            config.role_arn = role_arn;
        }

        let provider = commands::build_provider(&config, self.web_identity_token)?;

        let credentials = provider
            .credentials()
            .await
            .context("Failed to obtain temporary credentials")?;

        let output = ProcessCredentials::from_credentials(&credentials)?;

        let stdout = io::stdout();
        let mut handle = stdout.lock();
        serde_json::to_writer(&mut handle, &output)
            .context("Failed to serialize process credentials")?;
        writeln!(handle)?;

        Ok(())
    }
}
