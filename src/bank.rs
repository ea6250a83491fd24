//! The bank service: one lock around the account store, sessions threaded
//! through every call, and a durable snapshot before any success is reported.

use rust_decimal::Decimal;
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

use crate::account::{AccountStore, AccountView, Registration, TransferScope, UserSummary};
use crate::config::BankConfig;
use crate::error::LedgerError;
use crate::ledger::{AdminOps, BalanceAdjustment, TransferEngine, TransferReceipt, TransferRequest};
use crate::session::{Session, SessionManager};
use crate::storage::Storage;

pub struct Bank {
    store: Mutex<AccountStore>,
    storage: Storage,
    sessions: SessionManager,
    engine: TransferEngine,
    config: BankConfig,
}

/// What `register` and `login` hand back
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub session: Session,
    pub user: AccountView,
}

impl Bank {
    /// Load (or initialize) the snapshot named in the config
    pub fn open(config: BankConfig) -> Result<Self, LedgerError> {
        let storage = Storage::new(&config.storage.path);
        let store = storage.load_or_init(&config.ledger.system_account)?;
        Ok(Self::with_store(config, storage, store))
    }

    pub fn with_store(config: BankConfig, storage: Storage, store: AccountStore) -> Self {
        Self {
            store: Mutex::new(store),
            storage,
            sessions: SessionManager::new(config.session.ttl_hours),
            engine: TransferEngine::new(&config.ledger),
            config,
        }
    }

    pub fn config(&self) -> &BankConfig {
        &self.config
    }

    /// Run `op` against a staged copy of the store, persist the copy, then
    /// publish it. Any failure, including the write, leaves memory as it was.
    fn commit<T>(
        &self,
        op: impl FnOnce(&mut AccountStore) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let mut store = self.lock_store()?;
        let mut staged = store.clone();
        let out = op(&mut staged)?;
        self.storage.save(&staged)?;
        *store = staged;
        Ok(out)
    }

    fn read<T>(&self, op: impl FnOnce(&AccountStore) -> Result<T, LedgerError>) -> Result<T, LedgerError> {
        let store = self.lock_store()?;
        op(&store)
    }

    fn lock_store(&self) -> Result<MutexGuard<'_, AccountStore>, LedgerError> {
        self.store.lock().map_err(|e| {
            tracing::error!("Mutex poisoned: {}", e);
            LedgerError::Internal("account store lock poisoned".to_string())
        })
    }

    /// Create an account and log it in. Hashing happens before the store
    /// lock is taken.
    pub fn register(&self, username: &str, password: &str) -> Result<SignedIn, LedgerError> {
        let registration = Registration::prepare(username, password)?;
        let account = self.commit(|store| store.create(registration, &self.config.ledger))?;
        let session = self.sessions.open(&account)?;
        Ok(SignedIn {
            session,
            user: account.view(),
        })
    }

    pub fn login(&self, username: &str, password: &str) -> Result<SignedIn, LedgerError> {
        let account = self.read(|store| Ok(store.login_target(username)?.clone()))?;
        let session = self.sessions.login(&account, password)?;
        Ok(SignedIn {
            session,
            user: account.view(),
        })
    }

    pub fn logout(&self, token: Option<&str>) -> Result<bool, LedgerError> {
        match token {
            Some(token) => self.sessions.logout(token),
            None => Ok(false),
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.active_count()
    }

    pub fn session(&self, token: Option<&str>) -> Result<Session, LedgerError> {
        self.sessions.resolve(token)
    }

    pub fn get_user(&self, username: &str) -> Result<AccountView, LedgerError> {
        self.read(|store| Ok(store.get(username)?.view()))
    }

    /// The caller's own account
    pub fn me(&self, token: Option<&str>) -> Result<AccountView, LedgerError> {
        let session = self.sessions.resolve(token)?;
        self.get_user(&session.username)
    }

    pub fn add_friend(&self, token: Option<&str>, friend_code: &str) -> Result<AccountView, LedgerError> {
        let session = self.sessions.resolve(token)?;
        self.commit(|store| {
            store.add_friend(&session.username, friend_code)?;
            Ok(store.get(&session.username)?.view())
        })
    }

    pub fn transfer(
        &self,
        token: Option<&str>,
        from: &str,
        to: &str,
        amount: Decimal,
        note: Option<String>,
        scope: TransferScope,
    ) -> Result<TransferReceipt, LedgerError> {
        let session = self.sessions.resolve(token)?;
        let req = TransferRequest {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            note,
            scope,
        };
        self.commit(|store| self.engine.transfer(store, &session, req))
    }

    pub fn admin_list_users(&self, token: Option<&str>) -> Result<Vec<UserSummary>, LedgerError> {
        let session = self.admin_session(token)?;
        self.read(|store| AdminOps::list_users(store, &session))
    }

    pub fn admin_set_balance(
        &self,
        token: Option<&str>,
        username: &str,
        new_balance: Decimal,
    ) -> Result<BalanceAdjustment, LedgerError> {
        let session = self.admin_session(token)?;
        self.commit(|store| AdminOps::set_balance(store, &session, username, new_balance))
    }

    pub fn admin_credit(
        &self,
        token: Option<&str>,
        username: &str,
        amount: Decimal,
    ) -> Result<Decimal, LedgerError> {
        let session = self.admin_session(token)?;
        self.commit(|store| AdminOps::credit(store, &session, username, amount))
    }

    fn admin_session(&self, token: Option<&str>) -> Result<Session, LedgerError> {
        let session = self.sessions.resolve(token)?;
        if let Err(e) = session.require_admin() {
            warn!(user = %session.username, "admin operation refused");
            return Err(e);
        }
        Ok(session)
    }
}
