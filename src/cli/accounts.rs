use crate::account::{Account, AccountStore, TransactionKind};
use crate::error::LedgerError;
use crate::storage::Storage;
use std::fmt::Write;

/// Read-only listing of a snapshot
pub fn handle_accounts_command(path: &str, history: bool) -> Result<(), LedgerError> {
    match Storage::new(path).read()? {
        Some(store) => {
            print!("{}", render(&store, history));
            Ok(())
        }
        None => {
            println!("No snapshot at {}", path);
            Ok(())
        }
    }
}

pub fn render(store: &AccountStore, history: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<20} {:>14} {:<15} {:>6}",
        "USERNAME", "BALANCE", "FRIEND CODE", "TXS"
    );
    for account in store.all_accounts() {
        let _ = writeln!(
            out,
            "{:<20} {:>14} {:<15} {:>6}{}",
            account.username,
            account.balance,
            account.friend_code.as_deref().unwrap_or("-"),
            account.transactions.len(),
            marker(account)
        );
        if history {
            for tx in &account.transactions {
                let _ = writeln!(
                    out,
                    "    {} {:<16} {:>12} {}",
                    tx.time.format("%Y-%m-%d %H:%M:%S"),
                    kind_label(tx.kind),
                    tx.amount,
                    tx.counterparty.as_deref().unwrap_or("")
                );
            }
        }
    }
    match store.total_supply() {
        Some(total) => {
            let _ = writeln!(out, "Total supply: {} SLC", total);
        }
        None => {
            let _ = writeln!(out, "Total supply: out of range");
        }
    }
    let _ = writeln!(out, "Friend codes issued: {}", store.friend_codes().issued());
    out
}

fn marker(account: &Account) -> &'static str {
    if account.is_system_account {
        " [system]"
    } else if account.has_admin_rights() {
        " [admin]"
    } else {
        ""
    }
}

fn kind_label(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::Send => "send",
        TransactionKind::Receive => "receive",
        TransactionKind::AdminAdjustment => "admin_adjustment",
        TransactionKind::AdminReceive => "admin_receive",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Registration;
    use crate::config::LedgerConfig;

    #[test]
    fn test_render_lists_accounts_and_supply() {
        let mut store = AccountStore::new("Kommisa");
        let registration = Registration::prepare("alice", "pass1234").unwrap();
        store.create(registration, &LedgerConfig::default()).unwrap();

        let out = render(&store, false);
        assert!(out.contains("alice"));
        assert!(out.contains("Kommisa"));
        assert!(out.contains("[system]"));
        assert!(out.contains("Total supply: 100 SLC"));
        assert!(out.contains("Friend codes issued: 1"));
    }
}
