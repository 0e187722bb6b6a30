//! Command-line surface for automation runtimes
//!
//! One subcommand per resource kind. Connection settings are shared flags
//! with environment fallbacks, so a runtime can inject credentials without
//! putting them on the command line. The only thing written to stdout is
//! the JSON result document; logs go to stderr.

pub mod commands;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::api::{config, EngineConfig};
use crate::reconcile::State;
use crate::Result;

/// segmentctl - declarative management of segmentation policy engine objects
#[derive(Parser, Debug)]
#[command(name = "segmentctl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Policy engine connection settings
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Compute and report the would-be change without applying it
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Resource kind to manage
    #[command(subcommand)]
    pub command: Commands,
}

/// Policy engine connection flags, shared by every subcommand
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Engine hostname or URL
    #[arg(long, env = config::ENV_HOST, global = true, default_value = "")]
    pub hostname: String,

    /// Engine HTTPS port
    #[arg(long, env = config::ENV_PORT, global = true, default_value_t = crate::DEFAULT_PORT)]
    pub port: u16,

    /// Organization ID
    #[arg(long, env = config::ENV_ORG_ID, global = true, default_value_t = crate::DEFAULT_ORG_ID)]
    pub org_id: u64,

    /// API key username
    #[arg(long, env = config::ENV_API_KEY_USERNAME, global = true, hide_env_values = true, default_value = "")]
    pub api_key_username: String,

    /// API key secret
    #[arg(long, env = config::ENV_API_KEY_SECRET, global = true, hide_env_values = true, default_value = "")]
    pub api_key_secret: String,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Path to a PEM CA bundle used to verify the engine
    #[arg(long, global = true)]
    pub tls_ca: Option<std::path::PathBuf>,

    /// Path to a PEM client certificate for mTLS
    #[arg(long, global = true)]
    pub tls_client_cert: Option<std::path::PathBuf>,

    /// Path to the PEM private key for the client certificate
    #[arg(long, global = true)]
    pub tls_client_key: Option<std::path::PathBuf>,

    /// Proxy for HTTP requests
    #[arg(long, global = true)]
    pub http_proxy: Option<String>,

    /// Proxy for HTTPS requests
    #[arg(long, global = true)]
    pub https_proxy: Option<String>,
}

impl ConnectionArgs {
    /// Convert the parsed flags into an [`EngineConfig`]
    pub fn to_config(&self) -> Result<EngineConfig> {
        if self.hostname.is_empty() {
            return Err(crate::Error::validation(format!(
                "an engine hostname is required (--hostname or {})",
                config::ENV_HOST
            )));
        }
        if self.api_key_username.is_empty() || self.api_key_secret.is_empty() {
            return Err(crate::Error::validation(
                "API key credentials are required (--api-key-username/--api-key-secret)",
            ));
        }
        let mut cfg = EngineConfig::new(
            &self.hostname,
            &self.api_key_username,
            &self.api_key_secret,
        );
        cfg.port = self.port;
        cfg.org_id = self.org_id;
        cfg.tls_verify = !self.insecure;
        cfg.tls_ca = self.tls_ca.clone();
        cfg.tls_client_cert = self.tls_client_cert.clone();
        cfg.tls_client_key = self.tls_client_key.clone();
        cfg.http_proxy = self.http_proxy.clone();
        cfg.https_proxy = self.https_proxy.clone();
        Ok(cfg)
    }
}

/// Desired presence, as accepted on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum StateArg {
    /// Create or update the object to match the given fields
    #[default]
    Present,
    /// Remove the object if it exists
    Absent,
}

impl From<StateArg> for State {
    fn from(arg: StateArg) -> Self {
        match arg {
            StateArg::Present => State::Present,
            StateArg::Absent => State::Absent,
        }
    }
}

/// Resource subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage labels
    Label(commands::label::LabelArgs),
    /// Manage container clusters
    ContainerCluster(commands::container_cluster::ContainerClusterArgs),
    /// Manage pairing profiles
    PairingProfile(commands::pairing_profile::PairingProfileArgs),
    /// Generate a pairing key from an existing pairing profile
    PairingKey(commands::pairing_key::PairingKeyArgs),
}

impl Cli {
    /// Run the parsed command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Label(args) => {
                commands::label::run(&self.connection, args, self.dry_run).await
            }
            Commands::ContainerCluster(args) => {
                commands::container_cluster::run(&self.connection, args, self.dry_run).await
            }
            Commands::PairingProfile(args) => {
                commands::pairing_profile::run(&self.connection, args, self.dry_run).await
            }
            Commands::PairingKey(args) => {
                commands::pairing_key::run(&self.connection, args, self.dry_run).await
            }
        }
    }
}
