mod cli;
mod commands;
mod config;
mod observability;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use hcaas_core::{
    DEFAULT_OPERATION_TIMEOUT, DEFAULT_SERVICE_NAME, GroupRecord, LockedExecutor, Provider,
    UrlRecord, WatcherRecord,
};

use cli::{Cli, Commands, ConfigCommands, GroupCommands, UrlCommands, WatcherCommands};
use commands::resource::{self, Action};
use config::Settings;
use output::print_error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    observability::init_tracing(&cli.log_level);

    if let Err(e) = run(cli).await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let profile = cli.profile.clone();
    let settings = Settings::merge(&cli, config::load_profile(&profile)?);
    let service = settings.service_name.as_str();
    let format = settings.format;

    match cli.command {
        Commands::Url { command } => {
            let action = match command {
                UrlCommands::Create(args) => Action::Create {
                    placement: args.placement,
                    record: UrlRecord {
                        url: args.url,
                        expected_string: args.expected_string,
                        comment: args.comment,
                    },
                },
                UrlCommands::Read(args) => Action::Read(args),
                UrlCommands::Delete(args) => Action::Delete(args),
                UrlCommands::Import(args) => Action::Import(args),
            };
            let provider = make_provider(&settings)?;
            resource::run(&provider.urls, action, service, format).await
        }
        Commands::Watcher { command } => {
            let action = match command {
                WatcherCommands::Create(args) => Action::Create {
                    placement: args.placement,
                    record: WatcherRecord {
                        email: args.email,
                        password: args.password,
                    },
                },
                WatcherCommands::Read(args) => Action::Read(args),
                WatcherCommands::Delete(args) => Action::Delete(args),
                WatcherCommands::Import(args) => Action::Import(args),
            };
            let provider = make_provider(&settings)?;
            resource::run(&provider.watchers, action, service, format).await
        }
        Commands::Group { command } => {
            let action = match command {
                GroupCommands::Create(args) => Action::Create {
                    placement: args.placement,
                    record: GroupRecord { group: args.group },
                },
                GroupCommands::Read(args) => Action::Read(args),
                GroupCommands::Delete(args) => Action::Delete(args),
                GroupCommands::Import(args) => Action::Import(args),
            };
            let provider = make_provider(&settings)?;
            resource::run(&provider.groups, action, service, format).await
        }
        Commands::Config(args) => match args.command {
            ConfigCommands::Show => show_config(&profile),
            ConfigCommands::Set(set_args) => {
                let mut cfg = config::load_profile(&profile)?;
                cfg.set(&set_args.key, &set_args.value)?;
                config::save_profile(&profile, cfg)?;
                output::print_success(&format!("Set {} = {}", set_args.key, set_args.value));
                Ok(())
            }
        },
    }
}

fn make_provider(settings: &Settings) -> Result<Provider> {
    let connection = settings
        .connection()
        .context("Cannot determine the tsuru API target")?;
    tracing::debug!(host = %connection.host(), "Resolved connection");
    let http = reqwest::Client::builder()
        .user_agent(concat!("hcaas/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;
    Ok(Provider::new(
        connection,
        LockedExecutor::new(http),
        settings.timeouts,
    ))
}

fn show_config(profile: &str) -> Result<()> {
    let cfg = config::load_profile(profile)?;
    let unset = || "(not set)".to_string();
    println!("{}: {}", "Profile".cyan(), profile);
    println!("{}: {}", "Host".cyan(), cfg.host.unwrap_or_else(unset));
    println!(
        "{}: {}",
        "Token".cyan(),
        cfg.token.map(|_| "***".to_string()).unwrap_or_else(unset)
    );
    println!(
        "{}: {}",
        "Service".cyan(),
        cfg.service_name
            .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string())
    );
    println!(
        "{}: {}",
        "Timeout".cyan(),
        cfg.timeout
            .map(|secs| format!("{secs}s"))
            .unwrap_or_else(|| format!("{}s (default)", DEFAULT_OPERATION_TIMEOUT.as_secs()))
    );
    println!(
        "{}: {}",
        "Format".cyan(),
        cfg.format.as_deref().unwrap_or("json")
    );
    Ok(())
}
