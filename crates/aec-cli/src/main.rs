use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::ActorArgs;

#[derive(Parser)]
#[command(name = "aec", version, about = "AEC Roster CLI")]
struct Cli {
    #[command(flatten)]
    actor: ActorArgs,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recurring slot management
    Slot {
        #[command(subcommand)]
        action: commands::slot::SlotAction,
    },
    /// Session materialization and attendance
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Substitution requests
    Substitution {
        #[command(subcommand)]
        action: commands::substitution::SubstitutionCommand,
    },
    /// Audit trail
    Audit {
        #[command(subcommand)]
        action: commands::audit::AuditCommand,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Logs go to stderr so stdout stays parseable. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose >= 1)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Slot { action } => commands::slot::run(action, &cli.actor),
        Commands::Session { action } => commands::session::run(action, &cli.actor),
        Commands::Substitution { action } => commands::substitution::run(action, &cli.actor),
        Commands::Audit { action } => commands::audit::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
