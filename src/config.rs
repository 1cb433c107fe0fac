use std::time::Duration;

use anyhow::{Context, Result};
use aws_config::Region;
use dialoguer::{Input, theme::ColorfulTheme};
use ini::{Ini, Properties};
use tokio::fs;

use crate::aws::sts::ExchangeRequest;
use crate::constants::{
    self, DEFAULT_AWS_REGION, DEFAULT_PREEMPT_WINDOW, DEFAULT_SESSION_DURATION_SECS,
    DEFAULT_SESSION_NAME, DEFAULT_STS_AUDIENCE, MAX_SESSION_DURATION_SECS,
    MIN_SESSION_DURATION_SECS,
};
use crate::error::ProviderError;

/// Validated, immutable configuration for the credential provider.
///
/// Built once through [`ProviderConfig::builder`]; empty strings select the
/// same defaults the original SDK providers use.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    role_arn: String,
    session_name: String,
    audience: String,
    region: Region,
    duration_seconds: i32,
    preemption_window: Duration,
}

impl ProviderConfig {
    pub fn builder() -> ProviderConfigBuilder {
        ProviderConfigBuilder::default()
    }

    pub fn role_arn(&self) -> &str {
        &self.role_arn
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn duration_seconds(&self) -> i32 {
        self.duration_seconds
    }

    pub fn preemption_window(&self) -> Duration {
        self.preemption_window
    }

    pub(crate) fn exchange_request(&self) -> ExchangeRequest {
        ExchangeRequest {
            role_arn: self.role_arn.clone(),
            session_name: self.session_name.clone(),
            audience: self.audience.clone(),
            duration_seconds: self.duration_seconds,
        }
    }
}

#[derive(Debug, Default)]
pub struct ProviderConfigBuilder {
    role_arn: Option<String>,
    session_name: Option<String>,
    audience: Option<String>,
    region: Option<String>,
    duration_seconds: Option<i32>,
    preemption_window: Option<Duration>,
}

impl ProviderConfigBuilder {
    pub fn role_arn(mut self, role_arn: impl Into<String>) -> Self {
        self.role_arn = Some(role_arn.into());
        self
    }

    pub fn session_name(mut self, session_name: impl Into<String>) -> Self {
        self.session_name = Some(session_name.into());
        self
    }

    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn duration_seconds(mut self, duration_seconds: i32) -> Self {
        self.duration_seconds = Some(duration_seconds);
        self
    }

    pub fn preemption_window(mut self, preemption_window: Duration) -> Self {
        self.preemption_window = Some(preemption_window);
        self
    }

    /// Validate and freeze the configuration. Fails fast here so a refresh
    /// can never fail on configuration.
    pub fn build(self) -> Result<ProviderConfig, ProviderError> {
        let role_arn = self.role_arn.unwrap_or_default();
        if role_arn.trim().is_empty() {
            return Err(ProviderError::configuration("role_arn is required"));
        }
        if !is_valid_role_arn(&role_arn) {
            return Err(ProviderError::configuration(format!(
                "'{role_arn}' is not an IAM role ARN"
            )));
        }

        let duration_seconds = self
            .duration_seconds
            .unwrap_or(DEFAULT_SESSION_DURATION_SECS)
            .clamp(MIN_SESSION_DURATION_SECS, MAX_SESSION_DURATION_SECS);

        Ok(ProviderConfig {
            role_arn,
            session_name: non_empty(self.session_name)
                .unwrap_or_else(|| DEFAULT_SESSION_NAME.to_string()),
            audience: non_empty(self.audience)
                .unwrap_or_else(|| DEFAULT_STS_AUDIENCE.to_string()),
            region: Region::new(
                non_empty(self.region).unwrap_or_else(|| DEFAULT_AWS_REGION.to_string()),
            ),
            duration_seconds,
            preemption_window: self.preemption_window.unwrap_or(DEFAULT_PREEMPT_WINDOW),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Shape check for arn:<partition>:iam::<account>:role/<name>
pub fn is_valid_role_arn(arn: &str) -> bool {
    let parts: Vec<&str> = arn.splitn(6, ':').collect();

    parts.len() == 6
        && parts[0] == "arn"
        && !parts[1].is_empty()
        && parts[2] == "iam"
        && parts[3].is_empty()
        && parts[4].chars().all(|c| c.is_ascii_digit())
        && !parts[4].is_empty()
        && parts[5].starts_with("role/")
        && parts[5].len() > "role/".len()
}

/// Per-profile settings stored in the AWS config file.
#[derive(Debug, Clone)]
pub struct Config {
    pub role_arn: String,
    pub session_name: String,
    pub audience: String,
    pub region: String,
    pub duration_seconds: i32,
}

impl Config {
    fn from_ini_section(section: &Properties) -> Self {
        Self {
            role_arn: section.get("role_arn").unwrap_or("").to_string(),
            session_name: section
                .get("role_session_name")
                .unwrap_or(DEFAULT_SESSION_NAME)
                .to_string(),
            audience: section
                .get("web_identity_audience")
                .unwrap_or(DEFAULT_STS_AUDIENCE)
                .to_string(),
            region: section.get("region").unwrap_or("").to_string(),
            duration_seconds: section
                .get("duration_seconds")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SESSION_DURATION_SECS),
        }
    }

    fn save_to_ini(&self, ini: &mut Ini, profile: &str) {
        let section_name = if profile == "default" {
            profile.to_string()
        } else {
            format!("profile {profile}")
        };

        ini.with_section(Some(section_name))
            .set("role_arn", &self.role_arn)
            .set("role_session_name", &self.session_name)
            .set("web_identity_audience", &self.audience)
            .set("region", &self.region)
            .set("duration_seconds", self.duration_seconds.to_string());
    }

    /// Bridge the profile settings into a validated provider configuration.
    pub fn provider_config(&self) -> Result<ProviderConfig, ProviderError> {
        ProviderConfig::builder()
            .role_arn(&self.role_arn)
            .session_name(&self.session_name)
            .audience(&self.audience)
            .region(&self.region)
            .duration_seconds(self.duration_seconds)
            .build()
    }
}

pub async fn load(profile: &str) -> Result<Config> {
    let path = constants::get_aws_config_path().context("Failed to determine AWS config path")?;
    let ini = Ini::load_from_file(&path)
        .context("Failed to load config file. Please run `awsfed configure` first")?;

    let section_name = if profile == "default" {
        profile.to_string()
    } else {
        format!("profile {profile}")
    };

    let section = ini
        .section(Some(&section_name))
        .with_context(|| format!("Profile '{profile}' not found in config"))?;

    Ok(Config::from_ini_section(section))
}

pub async fn save(profile: &str, config: &Config) -> Result<()> {
    let path = constants::get_aws_config_path().context("Failed to determine AWS config path")?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut ini = if path.exists() {
        Ini::load_from_file(&path).unwrap_or_else(|_| Ini::new())
    } else {
        Ini::new()
    };

    config.save_to_ini(&mut ini, profile);

    ini.write_to_file(&path)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

pub async fn configure_interactive(profile: &str) -> Result<()> {
    println!("Configuring awsfed for profile: {profile}");

    let existing_config = load(profile).await.ok();

    if existing_config.is_some() {
        println!("Press Enter to keep current values, or type new values.");
    }
    println!();

    let theme = ColorfulTheme::default();

    let default_config = existing_config.unwrap_or(Config {
        role_arn: String::new(),
        session_name: DEFAULT_SESSION_NAME.to_string(),
        audience: DEFAULT_STS_AUDIENCE.to_string(),
        region: DEFAULT_AWS_REGION.to_string(),
        duration_seconds: DEFAULT_SESSION_DURATION_SECS,
    });

    let role_arn = Input::<String>::with_theme(&theme)
        .with_prompt("IAM Role ARN")
        .default(default_config.role_arn.clone())
        .allow_empty(!default_config.role_arn.is_empty())
        .validate_with(|input: &String| {
            if input.is_empty() {
                Err("Role ARN is required")
            } else if !is_valid_role_arn(input) {
                Err("Expected arn:<partition>:iam::<account>:role/<name>")
            } else {
                Ok(())
            }
        })
        .interact_text()
        .context("Failed to read role ARN")?;

    let session_name = Input::<String>::with_theme(&theme)
        .with_prompt("Role Session Name")
        .default(default_config.session_name)
        .interact_text()
        .context("Failed to read session name")?;

    let audience = Input::<String>::with_theme(&theme)
        .with_prompt("Identity Token Audience")
        .default(default_config.audience)
        .interact_text()
        .context("Failed to read audience")?;

    let region = Input::<String>::with_theme(&theme)
        .with_prompt("AWS Region")
        .default(default_config.region)
        .interact_text()
        .context("Failed to read region")?;

    let duration_seconds = Input::<i32>::with_theme(&theme)
        .with_prompt(format!(
            "Session Duration Seconds ({MIN_SESSION_DURATION_SECS}-{MAX_SESSION_DURATION_SECS})"
        ))
        .default(default_config.duration_seconds)
        .validate_with(|input: &i32| {
            if (MIN_SESSION_DURATION_SECS..=MAX_SESSION_DURATION_SECS).contains(input) {
                Ok(())
            } else {
                Err("Please enter a value between 900 and 43200")
            }
        })
        .interact_text()
        .context("Failed to read session duration")?;

    let config = Config {
        role_arn,
        session_name,
        audience,
        region,
        duration_seconds,
    };

    save(profile, &config).await?;

    println!("\nConfiguration saved successfully.");
    Ok(())
}
