use crate::config::{ConnectionResolver, DEFAULT_CONNECTION_ENV_KEY, DEFAULT_SETTINGS_FILE};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::io::Read;

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "time-entry-manager")]
#[command(about = "Ensure one time entry exists for every day of a date range")]
pub struct CliConfig {
    /// JSON payload, e.g. {"StartOn": "2022-01-03", "EndOn": "2022-01-05"}. Read from stdin when omitted.
    #[arg(long)]
    pub payload: Option<String>,

    /// Path to the TOML settings file
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    pub settings: String,

    /// Connection string, takes precedence over the environment and the settings file
    #[arg(long)]
    pub connection: Option<String>,

    /// Environment variable holding the connection string
    #[arg(long, default_value = DEFAULT_CONNECTION_ENV_KEY)]
    pub connection_env: String,

    /// Run against an empty in-memory store instead of Dataverse
    #[arg(long)]
    pub in_memory: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    pub fn resolver(&self) -> ConnectionResolver {
        ConnectionResolver::new()
            .with_env_key(self.connection_env.clone())
            .with_settings_path(&self.settings)
            .with_override(self.connection.clone())
    }

    pub fn read_payload(&self) -> std::io::Result<String> {
        match &self.payload {
            Some(payload) => Ok(payload.clone()),
            None => {
                let mut body = String::new();
                std::io::stdin().read_to_string(&mut body)?;
                Ok(body)
            }
        }
    }
}
