//! Account storage and management

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use super::auth::hash_password;
use super::friend_code::FriendCodeRegistry;
use super::types::{Account, AccountId, UserSummary};
use crate::config::LedgerConfig;
use crate::error::{AuthError, LedgerError};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 4;

/// Registration input that passed the length checks, with the password
/// already hashed
#[derive(Debug, Clone)]
pub struct Registration {
    username: AccountId,
    password_hash: String,
}

impl Registration {
    /// Trim and validate the credentials, then hash the password.
    /// Needs no access to the store.
    pub fn prepare(username: &str, password: &str) -> Result<Self, LedgerError> {
        let username = username.trim();

        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(LedgerError::InvalidInput(format!(
                "username must be at least {} characters",
                MIN_USERNAME_LEN
            )));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(LedgerError::InvalidInput(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        Ok(Self {
            username: username.to_string(),
            password_hash: hash_password(password)?,
        })
    }
}

/// Every account, the friend-code map and the name of the commission sink.
/// This is the whole persisted document.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountStore {
    #[serde(default)]
    accounts: BTreeMap<AccountId, Account>,
    #[serde(default)]
    friend_codes: FriendCodeRegistry,
    system_account: AccountId,
}

impl AccountStore {
    /// Create an empty store holding only the commission sink
    pub fn new(system_account: &str) -> Self {
        let mut store = Self {
            accounts: BTreeMap::new(),
            friend_codes: FriendCodeRegistry::new(),
            system_account: system_account.to_string(),
        };
        store.ensure_system_account();
        store
    }

    /// Re-create the commission sink if a loaded document lacks it.
    /// Returns true when the store changed.
    pub fn ensure_system_account(&mut self) -> bool {
        if self.accounts.contains_key(&self.system_account) {
            return false;
        }
        let sink = Account::system(self.system_account.clone());
        self.accounts.insert(sink.username.clone(), sink);
        true
    }

    pub fn system_account(&self) -> &str {
        &self.system_account
    }

    pub fn is_reserved(&self, username: &str) -> bool {
        username.eq_ignore_ascii_case(&self.system_account)
    }

    /// Insert a prepared registration.
    ///
    /// The password was hashed by [`Registration::prepare`] before the store
    /// was touched; here only the checks that need the account map run.
    pub fn create(
        &mut self,
        registration: Registration,
        config: &LedgerConfig,
    ) -> Result<Account, LedgerError> {
        let Registration {
            username,
            password_hash,
        } = registration;

        if self.is_reserved(&username) {
            return Err(LedgerError::ReservedName(username));
        }
        if self.accounts.contains_key(&username) {
            return Err(LedgerError::DuplicateUsername(username));
        }

        let friend_code = self
            .friend_codes
            .issue(&username, config.friend_code_attempts)?;

        let mut account = Account::new(username, password_hash, config.starting_balance);
        account.is_admin = config.is_admin_username(&account.username);
        account.friend_code = Some(friend_code);

        self.accounts.insert(account.username.clone(), account.clone());
        info!(user = %account.username, admin = account.is_admin, "account created");

        Ok(account)
    }

    /// The account a login attempt is checked against
    pub fn login_target(&self, username: &str) -> Result<&Account, AuthError> {
        self.accounts
            .get(username)
            .ok_or_else(|| AuthError::UnknownUser(username.to_string()))
    }

    /// Get account by name
    pub fn get(&self, username: &str) -> Result<&Account, LedgerError> {
        self.accounts
            .get(username)
            .ok_or_else(|| LedgerError::UnknownUser(username.to_string()))
    }

    /// Get mutable account by name
    pub fn get_mut(&mut self, username: &str) -> Result<&mut Account, LedgerError> {
        self.accounts
            .get_mut(username)
            .ok_or_else(|| LedgerError::UnknownUser(username.to_string()))
    }

    pub fn contains(&self, username: &str) -> bool {
        self.accounts.contains_key(username)
    }

    /// Add the owner of `friend_code` to the friend list of `username`
    pub fn add_friend(&mut self, username: &str, friend_code: &str) -> Result<AccountId, LedgerError> {
        let friend = self
            .friend_codes
            .resolve(friend_code)
            .cloned()
            .ok_or_else(|| LedgerError::UnknownFriendCode(friend_code.trim().to_string()))?;

        if friend == username {
            return Err(LedgerError::InvalidInput(
                "you cannot add yourself as a friend".to_string(),
            ));
        }
        // A code whose owner is missing is never accepted.
        if !self.accounts.contains_key(&friend) {
            return Err(LedgerError::UnknownFriendCode(friend_code.trim().to_string()));
        }

        self.get_mut(username)?.friends.insert(friend.clone());
        Ok(friend)
    }

    /// Summaries of every ordinary account (the commission sink is left out)
    pub fn list_users(&self) -> Vec<UserSummary> {
        self.accounts
            .values()
            .filter(|account| !account.is_system_account)
            .map(Account::summary)
            .collect()
    }

    /// Get all accounts
    pub fn all_accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn friend_codes(&self) -> &FriendCodeRegistry {
        &self.friend_codes
    }

    /// Sum of all balances, commission sink included. `None` on overflow.
    pub fn total_supply(&self) -> Option<Decimal> {
        self.accounts
            .values()
            .try_fold(Decimal::ZERO, |total, account| total.checked_add(account.balance))
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }
}
