//! CLI definitions for LaunchWarden.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use launchwarden_core::ServiceDomain;

/// LaunchWarden CLI.
#[derive(Parser)]
#[command(name = "launchwarden")]
#[command(about = "Inspect and control launchd services")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (default: ~/.launchwarden/config.toml)
    #[arg(short, long, global = true, env = "LAUNCHWARDEN_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Selects one service by label, optionally narrowed to a domain.
#[derive(clap::Args, Debug, Clone)]
pub(crate) struct ServiceArgs {
    /// Service label, e.g. com.example.agent
    pub label: String,

    /// Domain the service lives in (needed when the label is ambiguous)
    #[arg(short, long)]
    pub domain: Option<ServiceDomain>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// List services and their states
    List {
        /// Only this domain
        #[arg(short, long)]
        domain: Option<ServiceDomain>,

        /// Case-insensitive filter on label, name and vendor
        #[arg(short, long)]
        search: Option<String>,

        /// Include Apple system services
        #[arg(long)]
        all: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one service in detail
    Show {
        #[command(flatten)]
        service: ServiceArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Enable and load a service
    Start {
        #[command(flatten)]
        service: ServiceArgs,
    },

    /// Unload and disable a service
    Stop {
        #[command(flatten)]
        service: ServiceArgs,
    },

    /// Enable and load a service
    Enable {
        #[command(flatten)]
        service: ServiceArgs,
    },

    /// Unload and disable a service
    Disable {
        #[command(flatten)]
        service: ServiceArgs,
    },

    /// Ask launchd why a service was last started
    Blame {
        #[command(flatten)]
        service: ServiceArgs,
    },

    /// Watch domain directories and print state changes
    Watch {
        /// Include Apple system services
        #[arg(long)]
        all: bool,
    },
}

impl Commands {
    /// Whether the command reads the system domains regardless of `--all`.
    pub(crate) fn targets_system(&self) -> bool {
        let domain = match self {
            Commands::List { domain, .. } => *domain,
            Commands::Show { service, .. }
            | Commands::Start { service }
            | Commands::Stop { service }
            | Commands::Enable { service }
            | Commands::Disable { service }
            | Commands::Blame { service } => service.domain,
            Commands::Watch { .. } => None,
        };
        domain.is_some_and(|d| d.is_system())
    }
}
