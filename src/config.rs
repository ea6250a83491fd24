use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct BankConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "./data/database.json".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LedgerConfig {
    #[serde(default = "default_starting_balance")]
    pub starting_balance: Decimal,
    /// Fee charged on top of every transfer, as a fraction of the amount.
    #[serde(default = "default_commission_rate")]
    pub commission_rate: Decimal,
    #[serde(default = "default_system_account")]
    pub system_account: String,
    /// Usernames that are granted admin rights when they register.
    #[serde(default = "default_admin_usernames")]
    pub admin_usernames: Vec<String>,
    #[serde(default = "default_friend_code_attempts")]
    pub friend_code_attempts: usize,
    #[serde(default)]
    pub enforce_friend_scope: bool,
}

fn default_starting_balance() -> Decimal {
    dec!(100)
}

fn default_commission_rate() -> Decimal {
    dec!(0.1)
}

fn default_system_account() -> String {
    "Kommisa".to_string()
}

fn default_admin_usernames() -> Vec<String> {
    vec!["admin".to_string()]
}

fn default_friend_code_attempts() -> usize {
    16
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            starting_balance: default_starting_balance(),
            commission_rate: default_commission_rate(),
            system_account: default_system_account(),
            admin_usernames: default_admin_usernames(),
            friend_code_attempts: default_friend_code_attempts(),
            enforce_friend_scope: false,
        }
    }
}

impl LedgerConfig {
    pub fn is_admin_username(&self, username: &str) -> bool {
        self.admin_usernames
            .iter()
            .any(|name| name.eq_ignore_ascii_case(username))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: i64,
}

fn default_ttl_hours() -> i64 {
    24
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { ttl_hours: default_ttl_hours() }
    }
}

impl BankConfig {
    pub fn load_or_default(path: &str) -> Self {
        if std::path::Path::new(path).exists() {
            match std::fs::read_to_string(path) {
                Ok(s) => match toml::from_str(&s) {
                    Ok(c) => {
                        info!("Config loaded from {}", path);
                        c
                    }
                    Err(e) => {
                        warn!("Error parsing config: {}. Using defaults.", e);
                        Self::default()
                    }
                },
                Err(e) => {
                    warn!("Error reading config: {}. Using defaults.", e);
                    Self::default()
                }
            }
        } else {
            info!("Config file not found at '{}'. Creating default.", path);
            let config = Self::default();
            if let Err(e) = config.write_to(path) {
                warn!("Could not write default config: {}", e);
            }
            config
        }
    }

    pub fn write_to(&self, path: &str) -> std::io::Result<()> {
        let s = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, s)
    }
}
