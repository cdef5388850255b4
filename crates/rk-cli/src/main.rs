//! Command-line host for the Rollkeeper dice bot.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "rk=info,rk_bot=info";

#[derive(Parser)]
#[command(
    name = "rk",
    about = "Rollkeeper: dice rolls and character cards for tabletop chat channels",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one chat command against a card file
    Roll {
        /// The command as typed in chat, e.g. ".r 困难侦察"
        command: String,

        /// JSON card file (cards and user links)
        #[arg(short, long)]
        cards: PathBuf,

        /// TOML channel configuration
        #[arg(long)]
        config: Option<PathBuf>,

        /// Id of the sending user
        #[arg(short, long, default_value = "cli")]
        user: String,

        /// Display name of the sending user (default: the id)
        #[arg(long)]
        name: Option<String>,

        /// Treat the sender as a channel manager
        #[arg(long)]
        manager: bool,

        /// Mentioned user ids
        #[arg(short, long)]
        mention: Vec<String>,

        /// RNG seed for a reproducible roll
        #[arg(short, long)]
        seed: Option<u64>,

        /// Show the result without writing the card file
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate a channel configuration file
    CheckConfig {
        /// TOML channel configuration
        file: PathBuf,
    },

    /// List the entries and abilities of a card
    Show {
        /// Card name
        card: String,

        /// JSON card file
        #[arg(short, long)]
        cards: PathBuf,

        /// TOML channel configuration (for extra alias groups)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the stored card data as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Roll {
            command,
            cards,
            config,
            user,
            name,
            manager,
            mention,
            seed,
            dry_run,
        } => commands::roll::run(&commands::roll::RollArgs {
            command: &command,
            cards: &cards,
            config: config.as_deref(),
            user: &user,
            name: name.as_deref(),
            manager,
            mentions: &mention,
            seed,
            dry_run,
        }),
        Commands::CheckConfig { file } => commands::check::run(&file),
        Commands::Show {
            card,
            cards,
            config,
            json,
        } => commands::show::run(&cards, config.as_deref(), &card, json),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
