//! Privileged balance operations

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::amount;
use crate::account::{AccountStore, Transaction, TransactionKind, UserSummary};
use crate::error::LedgerError;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceAdjustment {
    pub old_balance: Decimal,
    pub new_balance: Decimal,
    /// Set when an ordinary account ends up below zero
    pub below_zero: bool,
}

pub struct AdminOps;

impl AdminOps {
    /// Overwrite a balance. The recorded amount is the size of the change.
    pub fn set_balance(
        store: &mut AccountStore,
        session: &Session,
        username: &str,
        new_balance: Decimal,
    ) -> Result<BalanceAdjustment, LedgerError> {
        session.require_admin()?;
        let new_balance = amount::check_bounds(new_balance)?;

        let account = store.get_mut(username)?;
        let old_balance = account.balance;
        let change = amount::sub(new_balance, old_balance)?.abs();
        account.balance = new_balance;
        account.transactions.push(Transaction {
            id: Uuid::new_v4(),
            kind: TransactionKind::AdminAdjustment,
            amount: change,
            commission: None,
            counterparty: Some(session.username.clone()),
            note: Some("Balance adjusted by administrator".to_string()),
            time: Utc::now(),
            scope: None,
        });

        let below_zero = new_balance < Decimal::ZERO && !account.is_system_account;
        if below_zero {
            warn!(admin = %session.username, user = %username, balance = %new_balance, "admin set a negative balance");
        }
        info!(admin = %session.username, user = %username, old = %old_balance, new = %new_balance, "balance overwritten");

        Ok(BalanceAdjustment {
            old_balance,
            new_balance,
            below_zero,
        })
    }

    /// Grant funds out of thin air. Returns the new balance.
    pub fn credit(
        store: &mut AccountStore,
        session: &Session,
        username: &str,
        amount: Decimal,
    ) -> Result<Decimal, LedgerError> {
        session.require_admin()?;
        let amount = amount::check_positive(amount)?;

        let account = store.get_mut(username)?;
        account.balance = amount::add(account.balance, amount)?;
        account.transactions.push(Transaction {
            id: Uuid::new_v4(),
            kind: TransactionKind::AdminReceive,
            amount,
            commission: None,
            counterparty: Some(session.username.clone()),
            note: Some("Transfer from administrator".to_string()),
            time: Utc::now(),
            scope: None,
        });
        info!(admin = %session.username, user = %username, amount = %amount, "admin credit");

        Ok(account.balance)
    }

    pub fn list_users(store: &AccountStore, session: &Session) -> Result<Vec<UserSummary>, LedgerError> {
        session.require_admin()?;
        Ok(store.list_users())
    }
}
