use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use crate::commands::{
    AuthCommand, CompletionsCommand, ConfigureCommand, LsCommand, ProcessCommand,
};

#[derive(Debug, Clone, Parser)]
#[command(name = "awsfed", version, about = "AWS temporary credentials from OIDC web identity federation", long_about = None, arg_required_else_help = false)]
pub struct Cli {
    #[arg(
        short = 'p',
        long,
        global = true,
        default_value = "default",
        help = "AWS profile name"
    )]
    pub profile: String,

    #[arg(short = 'v', long, global = true, action = ArgAction::Count, help = "Increase verbosity (-v info, -vv debug, -vvv trace)")]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    #[command(about = "Assume the configured role and save credentials to the profile")]
    Auth(AuthCommand),
    #[command(about = "Emit credential_process JSON for the AWS CLI and SDKs")]
    Process(ProcessCommand),
    #[command(about = "List an S3 bucket using the federated credentials")]
    Ls(LsCommand),
    #[command(about = "Configure role, audience and region settings")]
    Configure(ConfigureCommand),
    #[command(about = "Generate shell completion scripts for awsfed")]
    Completions(CompletionsCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let profile = self.profile;
        let command = self.command.unwrap_or(Commands::Auth(AuthCommand {
            role_arn: None,
            web_identity_token: None,
        }));

        match command {
            Commands::Auth(cmd) => cmd.execute(&profile).await,
            Commands::Process(cmd) => cmd.execute(&profile).await,
            Commands::Ls(cmd) => cmd.execute(&profile).await,
            Commands::Configure(cmd) => cmd.execute(&profile).await,
            Commands::Completions(cmd) => {
                cmd.execute();
                Ok(())
            }
        }
    }
}
