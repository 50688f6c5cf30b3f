use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "hcaas")]
#[command(about = "Reconcile HCaaS healthcheck resources through the tsuru service proxy")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// tsuru API host (overrides config and the active tsuru target)
    #[arg(long, global = true, env = "HCAAS_HOST")]
    pub host: Option<String>,

    /// tsuru API token (overrides config and the tsuru session token)
    #[arg(long, global = true, env = "HCAAS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Config profile name
    #[arg(short, long, global = true, env = "HCAAS_PROFILE", default_value = "default")]
    pub profile: String,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,

    /// Operation timeout in seconds for create and delete (one minute of it
    /// is reserved as a safety margin)
    #[arg(long, global = true, env = "HCAAS_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, env = "HCAAS_LOG", default_value = "warn")]
    pub log_level: String,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Table,
}

impl OutputFormat {
    pub fn parse_name(name: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(name, true).ok()
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Monitored URLs
    Url {
        #[command(subcommand)]
        command: UrlCommands,
    },
    /// Watchers notified on failures
    Watcher {
        #[command(subcommand)]
        command: WatcherCommands,
    },
    /// Watcher groups
    Group {
        #[command(subcommand)]
        command: GroupCommands,
    },
    /// Manage CLI configuration
    Config(ConfigArgs),
}

#[derive(Subcommand)]
pub enum UrlCommands {
    /// Register a URL to monitor
    Create(UrlCreateArgs),
    /// Refresh a tracked URL from the remote listing
    Read(LookupArgs),
    /// Stop monitoring a URL
    Delete(LookupArgs),
    /// Adopt an already registered URL
    Import(LookupArgs),
}

#[derive(Subcommand)]
pub enum WatcherCommands {
    /// Register a watcher
    Create(WatcherCreateArgs),
    /// Refresh a tracked watcher from the remote listing
    Read(LookupArgs),
    /// Remove a watcher
    Delete(LookupArgs),
    /// Adopt an already registered watcher
    Import(LookupArgs),
}

#[derive(Subcommand)]
pub enum GroupCommands {
    /// Register a group
    Create(GroupCreateArgs),
    /// Refresh a tracked group from the remote listing
    Read(LookupArgs),
    /// Remove a group
    Delete(LookupArgs),
    /// Adopt an already registered group
    Import(LookupArgs),
}

#[derive(clap::Args)]
pub struct PlacementArgs {
    /// HCaaS instance name
    #[arg(long)]
    pub instance: String,
    /// HCaaS service name (defaults to the profile value, then "healthcheck")
    #[arg(long)]
    pub service_name: Option<String>,
    /// Write the resulting state to this file
    #[arg(long)]
    pub state: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct UrlCreateArgs {
    #[command(flatten)]
    pub placement: PlacementArgs,
    /// URL to monitor
    #[arg(long)]
    pub url: String,
    /// Substring the response body must contain
    #[arg(long, default_value = "")]
    pub expected_string: String,
    /// Comment attached to alerts
    #[arg(long, default_value = "")]
    pub comment: String,
}

#[derive(clap::Args)]
pub struct WatcherCreateArgs {
    #[command(flatten)]
    pub placement: PlacementArgs,
    /// Watcher email
    #[arg(long)]
    pub email: String,
    /// Watcher password
    #[arg(long, env = "HCAAS_WATCHER_PASSWORD", hide_env_values = true, default_value = "")]
    pub password: String,
}

#[derive(clap::Args)]
pub struct GroupCreateArgs {
    #[command(flatten)]
    pub placement: PlacementArgs,
    /// Group name
    #[arg(long)]
    pub group: String,
}

/// Identifies an existing resource either by id or by a state file written
/// by a previous command. With `--state`, the updated state is written back.
#[derive(clap::Args)]
pub struct LookupArgs {
    /// HCaaS instance name
    #[arg(long, required_unless_present = "state")]
    pub instance: Option<String>,
    /// HCaaS service name
    #[arg(long)]
    pub service_name: Option<String>,
    /// Resource id (URL, email or group name)
    #[arg(long, required_unless_present = "state", conflicts_with = "state")]
    pub id: Option<String>,
    /// State file from a previous create or import
    #[arg(long)]
    pub state: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current config
    Show,
    /// Set config value
    Set(ConfigSetArgs),
}

#[derive(clap::Args)]
pub struct ConfigSetArgs {
    /// Key to set (host, token, service_name, timeout, format)
    pub key: String,
    /// Value
    pub value: String,
}
