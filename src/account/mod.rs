//! Account System Module
//!
//! - Username-keyed account records with argon2 credentials
//! - Friend codes, unique across the whole bank
//! - Public projections that never carry the credential

pub mod auth;
pub mod friend_code;
pub mod store;
pub mod types;

pub use friend_code::FriendCodeRegistry;
pub use store::{AccountStore, Registration};
pub use types::{
    Account, AccountId, AccountView, CommissionStats, Transaction, TransactionKind,
    TransferScope, UserSummary,
};
