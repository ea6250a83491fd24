//! Account and transaction records

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Account identifier - the username
pub type AccountId = String;

/// Main account structure, as persisted
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub username: AccountId,
    pub password_hash: String, // Argon2id PHC string, empty for the system account

    pub balance: Decimal,

    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_super_admin: bool,
    #[serde(default)]
    pub is_system_account: bool,

    pub registered_at: DateTime<Utc>,

    #[serde(default)]
    pub friends: BTreeSet<AccountId>,
    #[serde(default)]
    pub friend_code: Option<String>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,

    #[serde(default)]
    pub commission_paid: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commission_stats: Option<CommissionStats>,
}

/// Running totals kept on the commission sink
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommissionStats {
    pub total_collected: Decimal,
    pub transactions_count: u64,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Send,
    Receive,
    AdminAdjustment,
    AdminReceive,
}

/// How the sender picked the recipient. Recorded, not enforced by default.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransferScope {
    Friends,
    #[default]
    #[serde(alias = "all")]
    Open,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commission: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty: Option<AccountId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<TransferScope>,
}

impl Account {
    pub fn new(username: AccountId, password_hash: String, balance: Decimal) -> Self {
        Self {
            username,
            password_hash,
            balance,
            is_admin: false,
            is_super_admin: false,
            is_system_account: false,
            registered_at: Utc::now(),
            friends: BTreeSet::new(),
            friend_code: None,
            transactions: Vec::new(),
            commission_paid: Decimal::ZERO,
            commission_stats: None,
        }
    }

    /// The commission sink. It has no credential, so nobody can log in as it.
    pub fn system(username: AccountId) -> Self {
        let mut account = Self::new(username, String::new(), Decimal::ZERO);
        account.is_admin = true;
        account.is_super_admin = true;
        account.is_system_account = true;
        account.commission_stats = Some(CommissionStats::default());
        account
    }

    /// Check if account has admin privileges
    pub fn has_admin_rights(&self) -> bool {
        self.is_admin || self.is_super_admin
    }

    /// Public projection, without the credential
    pub fn view(&self) -> AccountView {
        AccountView {
            username: self.username.clone(),
            balance: self.balance,
            is_admin: self.is_admin,
            is_super_admin: self.is_super_admin,
            is_system_account: self.is_system_account,
            registered_at: self.registered_at,
            friends: self.friends.iter().cloned().collect(),
            friend_code: self.friend_code.clone(),
            transactions: self.transactions.clone(),
            commission_paid: self.commission_paid,
            commission_stats: self.commission_stats.clone(),
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            username: self.username.clone(),
            balance: self.balance,
            is_admin: self.is_admin,
            is_super_admin: self.is_super_admin,
            registered_at: self.registered_at,
            friends_count: self.friends.len(),
            transactions_count: self.transactions.len(),
        }
    }
}

/// What clients get to see of an account
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub username: AccountId,
    pub balance: Decimal,
    pub is_admin: bool,
    pub is_super_admin: bool,
    pub is_system_account: bool,
    pub registered_at: DateTime<Utc>,
    pub friends: Vec<AccountId>,
    pub friend_code: Option<String>,
    pub transactions: Vec<Transaction>,
    pub commission_paid: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_stats: Option<CommissionStats>,
}

/// Row of the admin user listing
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub username: AccountId,
    pub balance: Decimal,
    pub is_admin: bool,
    pub is_super_admin: bool,
    pub registered_at: DateTime<Utc>,
    pub friends_count: usize,
    pub transactions_count: usize,
}
