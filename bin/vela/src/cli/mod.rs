use clap::{value_parser, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

pub mod args;
pub mod commands;

/// The main Vela CLI interface
#[derive(Debug, Parser)]
#[command(author, version, about = "Vela", long_about = None)]
pub struct Cli {
    /// The command to execute
    #[clap(subcommand)]
    command: Commands,

    /// The verbosity level
    #[clap(long, short, global = true, default_value_t = 2, value_parser = value_parser!(u8).range(..=4))]
    verbosity: u8,
}

impl Cli {
    /// Get the log level based on the verbosity level
    pub fn get_log_level(&self) -> String {
        match self.verbosity {
            0 => "error",
            1 => "warn",
            2 => "info",
            3 => "debug",
            _ => "trace",
        }
        .into()
    }
}

/// Commands to be executed
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a batch of user operations described by a JSON scenario
    #[command(name = "simulate")]
    Simulate(commands::SimulateCommand),

    /// Print the counterfactual address of an account
    #[command(name = "address")]
    Address(commands::AddressCommand),

    /// Print the hash of a user operation read from a JSON file
    #[command(name = "hash")]
    Hash(commands::HashCommand),

    /// Print the signer address derived from a mnemonic
    #[command(name = "create-wallet")]
    CreateWallet(commands::CreateWalletCommand),
}

pub fn run() -> eyre::Result<()> {
    let cli = Cli::parse();

    let rust_log = match std::env::var("RUST_LOG") {
        Ok(val) => format!("{val},vela={}", cli.get_log_level()),
        Err(_) => format!("vela={}", cli.get_log_level()),
    };
    std::env::set_var("RUST_LOG", rust_log);
    // stdout carries the command output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Simulate(command) => command.execute(),
        Commands::Address(command) => command.execute(),
        Commands::Hash(command) => command.execute(),
        Commands::CreateWallet(command) => command.execute(),
    }
}
