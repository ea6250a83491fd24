//! Balance-moving operations: fee-bearing transfers and admin adjustments.

pub mod admin;
pub mod amount;
pub mod transfer;

pub use admin::{AdminOps, BalanceAdjustment};
pub use transfer::{TransferEngine, TransferReceipt, TransferRequest};
