//! Fee-bearing transfers between accounts

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::amount;
use crate::account::{AccountId, AccountStore, Transaction, TransactionKind, TransferScope};
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::session::Session;

pub const MAX_NOTE_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransferRequest {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Decimal,
    pub note: Option<String>,
    pub scope: TransferScope,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub transaction_id: Uuid,
    pub amount: Decimal,
    pub commission: Decimal,
    pub new_balance: Decimal,
}

pub struct TransferEngine {
    commission_rate: Decimal,
    enforce_friend_scope: bool,
}

impl TransferEngine {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            commission_rate: config.commission_rate,
            enforce_friend_scope: config.enforce_friend_scope,
        }
    }

    /// Fee charged on top of `amount`. A positive rate never yields a zero
    /// fee: amounts too small to carry one are refused.
    pub fn commission_for(&self, amount: Decimal) -> Result<Decimal, LedgerError> {
        let commission = amount::mul(amount, self.commission_rate)?;
        if commission.is_zero() && !self.commission_rate.is_zero() {
            return Err(LedgerError::InvalidAmount(format!(
                "{} SLC is too small to carry a commission",
                amount
            )));
        }
        Ok(commission)
    }

    /// Move `amount` from the session's account to `req.to`, charging the
    /// commission on top. Every check, including the overflow checks on the
    /// resulting balances, runs before the first write, so a failure leaves
    /// the store untouched.
    pub fn transfer(
        &self,
        store: &mut AccountStore,
        session: &Session,
        req: TransferRequest,
    ) -> Result<TransferReceipt, LedgerError> {
        session.require_identity(&req.from)?;

        let amount = amount::check_positive(req.amount)?;
        let note = normalize_note(req.note)?;

        if !store.contains(&req.to) {
            return Err(LedgerError::UnknownRecipient(req.to));
        }
        if req.from == req.to {
            return Err(LedgerError::SelfTransfer);
        }

        let sender = store.get(&req.from)?;
        if self.enforce_friend_scope
            && req.scope == TransferScope::Friends
            && !sender.friends.contains(&req.to)
        {
            return Err(LedgerError::NotAFriend(req.to));
        }

        let commission = self.commission_for(amount)?;
        let total = amount::add(amount, commission)?;
        if sender.balance < total {
            return Err(LedgerError::InsufficientFunds {
                needed: total,
                available: sender.balance,
            });
        }
        let sender_balance = amount::sub(sender.balance, total)?;
        let sender_paid = amount::add(sender.commission_paid, commission)?;

        let recipient_balance = amount::add(store.get(&req.to)?.balance, amount)?;

        let sink_name = store.system_account().to_string();
        let sink = store.get(&sink_name)?;
        // Sending to the sink itself stacks both credits on one balance.
        let sink_base = if req.to == sink_name {
            recipient_balance
        } else {
            sink.balance
        };
        let sink_balance = amount::add(sink_base, commission)?;
        let collected = sink
            .commission_stats
            .as_ref()
            .map_or(Decimal::ZERO, |stats| stats.total_collected);
        let collected = amount::add(collected, commission)?;

        let id = Uuid::new_v4();
        let time = Utc::now();

        let sender = store.get_mut(&req.from)?;
        sender.balance = sender_balance;
        sender.commission_paid = sender_paid;
        sender.transactions.push(Transaction {
            id,
            kind: TransactionKind::Send,
            amount,
            commission: Some(commission),
            counterparty: Some(req.to.clone()),
            note: note.clone(),
            time,
            scope: Some(req.scope),
        });

        let recipient = store.get_mut(&req.to)?;
        recipient.balance = recipient_balance;
        recipient.transactions.push(Transaction {
            id,
            kind: TransactionKind::Receive,
            amount,
            commission: None,
            counterparty: Some(req.from.clone()),
            note,
            time,
            scope: Some(req.scope),
        });

        let sink = store.get_mut(&sink_name)?;
        sink.balance = sink_balance;
        let stats = sink.commission_stats.get_or_insert_with(Default::default);
        stats.total_collected = collected;
        stats.transactions_count += 1;

        info!(
            from = %req.from,
            to = %req.to,
            amount = %amount,
            commission = %commission,
            tx = %id,
            "transfer applied"
        );

        Ok(TransferReceipt {
            transaction_id: id,
            amount,
            commission,
            new_balance: sender_balance,
        })
    }
}

fn normalize_note(note: Option<String>) -> Result<Option<String>, LedgerError> {
    let note = note
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    if let Some(n) = &note {
        if n.chars().count() > MAX_NOTE_LEN {
            return Err(LedgerError::InvalidInput(format!(
                "note must be at most {} characters",
                MAX_NOTE_LEN
            )));
        }
    }
    Ok(note)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Registration;
    use crate::ledger::amount::{MAX_AMOUNT, MAX_AMOUNT_SCALE};
    use crate::session::SessionManager;
    use rust_decimal_macros::dec;

    struct Fixture {
        store: AccountStore,
        sessions: SessionManager,
        engine: TransferEngine,
    }

    fn fixture(config: LedgerConfig) -> Fixture {
        let mut store = AccountStore::new(&config.system_account);
        for user in ["alice", "bob"] {
            let registration = Registration::prepare(user, "pass1234").unwrap();
            store.create(registration, &config).unwrap();
        }
        Fixture {
            store,
            sessions: SessionManager::new(24),
            engine: TransferEngine::new(&config),
        }
    }

    fn request(from: &str, to: &str, amount: Decimal) -> TransferRequest {
        TransferRequest {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            note: None,
            scope: TransferScope::Open,
        }
    }

    impl Fixture {
        fn login(&self, user: &str) -> Session {
            self.sessions.login(self.store.get(user).unwrap(), "pass1234").unwrap()
        }

        fn balance(&self, user: &str) -> Decimal {
            self.store.get(user).unwrap().balance
        }
    }

    #[test]
    fn test_alice_pays_bob() {
        let mut fx = fixture(LedgerConfig::default());
        let alice = fx.login("alice");

        let mut req = request("alice", "bob", dec!(20));
        req.note = Some("lunch".into());
        let receipt = fx.engine.transfer(&mut fx.store, &alice, req).unwrap();

        assert_eq!(receipt.new_balance, dec!(78.0));
        assert_eq!(receipt.commission, dec!(2.0));
        assert_eq!(fx.balance("alice"), dec!(78.0));
        assert_eq!(fx.balance("bob"), dec!(120.0));
        assert_eq!(fx.balance("Kommisa"), dec!(2.0));

        let sent = &fx.store.get("alice").unwrap().transactions;
        let received = &fx.store.get("bob").unwrap().transactions;
        assert_eq!(sent.len(), 1);
        assert_eq!(received.len(), 1);

        assert_eq!(sent[0].kind, TransactionKind::Send);
        assert_eq!(sent[0].amount, dec!(20));
        assert_eq!(sent[0].commission, Some(dec!(2.0)));
        assert_eq!(sent[0].counterparty.as_deref(), Some("bob"));
        assert_eq!(sent[0].note.as_deref(), Some("lunch"));

        assert_eq!(received[0].kind, TransactionKind::Receive);
        assert_eq!(received[0].amount, dec!(20));
        assert_eq!(received[0].commission, None);
        assert_eq!(received[0].counterparty.as_deref(), Some("alice"));

        assert_eq!(sent[0].id, received[0].id);
        assert_eq!(sent[0].time, received[0].time);
        assert_eq!(receipt.transaction_id, sent[0].id);
    }

    #[test]
    fn test_conservation_and_commission_bookkeeping() {
        let mut fx = fixture(LedgerConfig::default());
        let alice = fx.login("alice");
        let supply = fx.store.total_supply();

        for amount in [dec!(1.5), dec!(0.01), dec!(33.33), dec!(0.00000001), dec!(7.12345678)] {
            let before_alice = fx.balance("alice");
            let before_bob = fx.balance("bob");
            let before_sink = fx.balance("Kommisa");

            fx.engine
                .transfer(&mut fx.store, &alice, request("alice", "bob", amount))
                .unwrap();

            assert_eq!(before_alice - fx.balance("alice"), amount * dec!(1.1));
            assert_eq!(fx.balance("bob") - before_bob, amount);
            assert_eq!(fx.balance("Kommisa") - before_sink, amount * dec!(0.1));
            assert_eq!(fx.store.total_supply(), supply);
        }

        let sink = fx.store.get("Kommisa").unwrap();
        let stats = sink.commission_stats.as_ref().unwrap();
        assert_eq!(stats.transactions_count, 5);
        assert_eq!(stats.total_collected, sink.balance);
        assert_eq!(fx.store.get("alice").unwrap().commission_paid, sink.balance);
    }

    #[test]
    fn test_insufficient_funds_changes_nothing() {
        let mut fx = fixture(LedgerConfig::default());
        let alice = fx.login("alice");
        let before = fx.store.clone();

        // 95 + 9.5 fee is more than 100
        let err = fx
            .engine
            .transfer(&mut fx.store, &alice, request("alice", "bob", dec!(95)))
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds { needed: dec!(104.50), available: dec!(100) }
        );
        assert_eq!(fx.store, before);
    }

    #[test]
    fn test_exact_balance_is_enough() {
        let config = LedgerConfig {
            starting_balance: dec!(110),
            ..LedgerConfig::default()
        };
        let mut fx = fixture(config);
        let alice = fx.login("alice");

        fx.engine
            .transfer(&mut fx.store, &alice, request("alice", "bob", dec!(100)))
            .unwrap();
        assert_eq!(fx.balance("alice"), Decimal::ZERO);
        assert_eq!(fx.balance("bob"), dec!(210));
    }

    #[test]
    fn test_must_act_as_session_user() {
        let mut fx = fixture(LedgerConfig::default());
        let bob = fx.login("bob");
        let before = fx.store.clone();

        let err = fx
            .engine
            .transfer(&mut fx.store, &bob, request("alice", "bob", dec!(10)))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized(_)));
        assert_eq!(fx.store, before);
    }

    #[test]
    fn test_rejects_bad_amounts() {
        let mut fx = fixture(LedgerConfig::default());
        let alice = fx.login("alice");
        let before = fx.store.clone();

        let too_precise = dec!(0.0000000000000000000000000001);
        for amount in [Decimal::ZERO, dec!(-5), Decimal::MAX, MAX_AMOUNT + dec!(1), too_precise] {
            let err = fx
                .engine
                .transfer(&mut fx.store, &alice, request("alice", "bob", amount))
                .unwrap_err();
            assert!(matches!(err, LedgerError::InvalidAmount(_)), "{} gave {:?}", amount, err);
        }
        assert_eq!(fx.store, before);
    }

    #[test]
    fn test_smallest_amount_still_pays_commission() {
        let mut fx = fixture(LedgerConfig::default());
        let alice = fx.login("alice");
        let smallest = Decimal::new(1, MAX_AMOUNT_SCALE);

        let receipt = fx
            .engine
            .transfer(&mut fx.store, &alice, request("alice", "bob", smallest))
            .unwrap();
        assert_eq!(receipt.commission, dec!(0.000000001));
        assert!(receipt.commission > Decimal::ZERO);
        assert_eq!(fx.balance("Kommisa"), dec!(0.000000001));
    }

    #[test]
    fn test_commission_that_rounds_away_is_refused() {
        let config = LedgerConfig {
            commission_rate: dec!(0.0000000000000000000001),
            ..LedgerConfig::default()
        };
        let engine = TransferEngine::new(&config);

        assert!(matches!(
            engine.commission_for(dec!(0.00000001)),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(engine.commission_for(dec!(1)).unwrap() > Decimal::ZERO);

        let free = TransferEngine::new(&LedgerConfig {
            commission_rate: Decimal::ZERO,
            ..LedgerConfig::default()
        });
        assert_eq!(free.commission_for(dec!(0.00000001)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_recipient_overflow_is_refused_before_any_write() {
        let mut fx = fixture(LedgerConfig::default());
        let alice = fx.login("alice");
        fx.store.get_mut("bob").unwrap().balance = Decimal::MAX;
        let before = fx.store.clone();

        let err = fx
            .engine
            .transfer(&mut fx.store, &alice, request("alice", "bob", dec!(10)))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
        assert_eq!(fx.store, before);
    }

    #[test]
    fn test_sending_to_the_sink_credits_it_twice() {
        let mut fx = fixture(LedgerConfig::default());
        let alice = fx.login("alice");

        fx.engine
            .transfer(&mut fx.store, &alice, request("alice", "Kommisa", dec!(10)))
            .unwrap();
        assert_eq!(fx.balance("alice"), dec!(89.0));
        assert_eq!(fx.balance("Kommisa"), dec!(11.0));
        assert_eq!(fx.store.total_supply(), Some(dec!(200)));
    }

    #[test]
    fn test_unknown_recipient() {
        let mut fx = fixture(LedgerConfig::default());
        let alice = fx.login("alice");

        let err = fx
            .engine
            .transfer(&mut fx.store, &alice, request("alice", "carol", dec!(5)))
            .unwrap_err();
        assert_eq!(err, LedgerError::UnknownRecipient("carol".into()));
    }

    #[test]
    fn test_self_transfer_is_rejected() {
        let mut fx = fixture(LedgerConfig::default());
        let alice = fx.login("alice");
        let before = fx.store.clone();

        let err = fx
            .engine
            .transfer(&mut fx.store, &alice, request("alice", "alice", dec!(5)))
            .unwrap_err();
        assert_eq!(err, LedgerError::SelfTransfer);
        assert_eq!(fx.store, before);
    }

    #[test]
    fn test_friend_scope_recorded_but_not_enforced_by_default() {
        let mut fx = fixture(LedgerConfig::default());
        let alice = fx.login("alice");

        let mut req = request("alice", "bob", dec!(5));
        req.scope = TransferScope::Friends;
        fx.engine.transfer(&mut fx.store, &alice, req).unwrap();

        let tx = &fx.store.get("bob").unwrap().transactions[0];
        assert_eq!(tx.scope, Some(TransferScope::Friends));
    }

    #[test]
    fn test_friend_scope_enforced_when_configured() {
        let config = LedgerConfig {
            enforce_friend_scope: true,
            ..LedgerConfig::default()
        };
        let mut fx = fixture(config);
        let alice = fx.login("alice");

        let mut req = request("alice", "bob", dec!(5));
        req.scope = TransferScope::Friends;
        let err = fx.engine.transfer(&mut fx.store, &alice, req.clone()).unwrap_err();
        assert_eq!(err, LedgerError::NotAFriend("bob".into()));

        let bob_code = fx.store.get("bob").unwrap().friend_code.clone().unwrap();
        fx.store.add_friend("alice", &bob_code).unwrap();
        fx.engine.transfer(&mut fx.store, &alice, req).unwrap();
        assert_eq!(fx.balance("bob"), dec!(105));
    }

    #[test]
    fn test_note_limits() {
        let mut fx = fixture(LedgerConfig::default());
        let alice = fx.login("alice");

        let mut req = request("alice", "bob", dec!(1));
        req.note = Some("x".repeat(MAX_NOTE_LEN + 1));
        assert!(matches!(
            fx.engine.transfer(&mut fx.store, &alice, req),
            Err(LedgerError::InvalidInput(_))
        ));

        let mut req = request("alice", "bob", dec!(1));
        req.note = Some("   ".into());
        fx.engine.transfer(&mut fx.store, &alice, req).unwrap();
        assert_eq!(fx.store.get("bob").unwrap().transactions[0].note, None);
    }
}
