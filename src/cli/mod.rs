pub mod accounts;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "slc_bank")]
#[command(about = "SLC virtual currency bank server", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = "bank.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the RPC server (the default)
    Serve {
        /// Overrides `server.port`
        #[arg(long)]
        port: Option<u16>,
        /// Overrides `storage.path`
        #[arg(long)]
        data: Option<String>,
    },
    /// Print the accounts held in a snapshot without starting the server
    Accounts {
        /// Overrides `storage.path`
        #[arg(long)]
        data: Option<String>,
        /// Also print each account's transaction history
        #[arg(long)]
        history: bool,
    },
    /// Write the default configuration to `--config`
    InitConfig {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}
