//! Command-line configuration.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use messaging::MessagingConfig;

use crate::commands::{Command, CommandResult};

/// Drive a node's messaging layer against an in-process peer.
#[derive(Parser, Debug)]
#[command(name = "peerctl")]
#[command(about = "Request/reply diagnostics for content-distribution nodes", long_about = None)]
pub struct CliConfig {
    /// JSON messaging configuration; missing fields take defaults
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the reply timeout, in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Credential file checked by the identity gate
    #[arg(long, env = "PEERCTL_CREDENTIAL")]
    pub credential: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    /// Messaging configuration after file loading and flag overrides.
    pub fn messaging_config(&self) -> anyhow::Result<MessagingConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                MessagingConfig::from_json_str(&json)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => MessagingConfig::default(),
        };
        if let Some(timeout_ms) = self.timeout_ms {
            config.default_timeout_ms = timeout_ms;
        }
        if let Some(credential) = &self.credential {
            config.credential_path = Some(credential.clone());
        }
        Ok(config)
    }

    pub async fn run(self) -> anyhow::Result<CommandResult> {
        let config = self.messaging_config()?;
        let gate = config.identity_gate();
        self.command.execute(&config, gate.as_ref()).await
    }
}
