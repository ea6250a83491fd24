use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use slc_bank::bank::Bank;
use slc_bank::cli::{self, Cli, Commands};
use slc_bank::config::BankConfig;
use slc_bank::rpc::RpcServer;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logging first so config loading is visible; RUST_LOG wins over the file.
    let log_level = read_log_level(&cli.config);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .init();

    let result = match cli.command.unwrap_or(Commands::Serve { port: None, data: None }) {
        Commands::Serve { port, data } => run_server(&cli.config, port, data).await,
        Commands::Accounts { data, history } => {
            let config = BankConfig::load_or_default(&cli.config);
            let path = data.unwrap_or(config.storage.path);
            cli::accounts::handle_accounts_command(&path, history).map_err(|e| e.to_string())
        }
        Commands::InitConfig { force } => init_config(&cli.config, force),
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run_server(config_path: &str, port: Option<u16>, data: Option<String>) -> Result<(), String> {
    let mut config = BankConfig::load_or_default(config_path);
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(data) = data {
        config.storage.path = data;
    }

    let bind = config.server.bind.clone();
    let port = config.server.port;
    let bank = Bank::open(config).map_err(|e| format!("Failed to open ledger: {}", e))?;
    info!("SLC bank ready, commission account '{}'", bank.config().ledger.system_account);

    RpcServer::new(Arc::new(bank), &bind, port)
        .start()
        .await
        .map_err(|e| format!("RPC server failed: {}", e))
}

fn init_config(path: &str, force: bool) -> Result<(), String> {
    if std::path::Path::new(path).exists() && !force {
        return Err(format!("{} already exists (use --force to overwrite)", path));
    }
    BankConfig::default()
        .write_to(path)
        .map_err(|e| format!("Could not write {}: {}", path, e))?;
    info!("Default config written to {}", path);
    Ok(())
}

/// Peek at the log level without the side effects of `load_or_default`
fn read_log_level(path: &str) -> String {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| toml::from_str::<BankConfig>(&s).ok())
        .map(|c| c.server.log_level)
        .unwrap_or_else(|| "info".to_string())
}
