//! Smart intercom signaling server
//!
//! ```text
//! smart-intercom [--config intercom.toml] [serve]
//! smart-intercom [--config intercom.toml] issue-token --operator front-door
//! smart-intercom [--config intercom.toml] issue-token --plugin kitchen-tablet
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};

use smart_intercom_api::logging::{log_welcome, setup_logging};
use smart_intercom_api::server::{run, shutdown_signal};
use smart_intercom_api::{JwtIssuer, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "smart-intercom", version, about = "Smart intercom call-signaling server")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print a credential signed with the configured secret
    #[command(group(ArgGroup::new("principal").required(true).args(["operator", "plugin"])))]
    IssueToken {
        /// Issue an operator credential (intercom device, operator tooling)
        #[arg(long, value_name = "SUBJECT")]
        operator: Option<String>,
        /// Issue a plugin credential
        #[arg(long, value_name = "NAME")]
        plugin: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ServerConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            setup_logging(&config.logging)?;
            log_welcome("smart-intercom", env!("CARGO_PKG_VERSION"));
            run(&config, shutdown_signal()).await?;
        }
        Command::IssueToken { operator, plugin } => {
            let issuer = JwtIssuer::new(config.jwt.clone())?;
            let token = match (operator, plugin) {
                (Some(subject), _) => issuer.issue_operator_token(&subject)?,
                (None, Some(name)) => issuer.issue_plugin_token(&name)?,
                (None, None) => anyhow::bail!("one of --operator or --plugin is required"),
            };
            println!("{}", token);
        }
    }

    Ok(())
}
