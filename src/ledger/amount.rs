//! Limits and overflow-checked arithmetic for SLC amounts
//!
//! Every balance change in the ledger goes through these helpers, so an
//! out-of-range value surfaces as `InvalidAmount` instead of a panic.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::LedgerError;

/// Most fractional digits an amount may carry
pub const MAX_AMOUNT_SCALE: u32 = 8;

/// Largest transfer, credit or administrator-set balance
pub const MAX_AMOUNT: Decimal = dec!(1000000000000);

/// A positive amount within the size and precision limits
pub fn check_positive(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(format!(
            "amount must be positive, got {}",
            amount
        )));
    }
    check_bounds(amount)
}

/// Any amount, negatives included, within the size and precision limits
pub fn check_bounds(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount.abs() > MAX_AMOUNT {
        return Err(LedgerError::InvalidAmount(format!(
            "amount exceeds the limit of {} SLC",
            MAX_AMOUNT
        )));
    }
    if amount.normalize().scale() > MAX_AMOUNT_SCALE {
        return Err(LedgerError::InvalidAmount(format!(
            "amount may have at most {} decimal places",
            MAX_AMOUNT_SCALE
        )));
    }
    Ok(amount)
}

pub fn add(a: Decimal, b: Decimal) -> Result<Decimal, LedgerError> {
    a.checked_add(b).ok_or_else(out_of_range)
}

pub fn sub(a: Decimal, b: Decimal) -> Result<Decimal, LedgerError> {
    a.checked_sub(b).ok_or_else(out_of_range)
}

pub fn mul(a: Decimal, b: Decimal) -> Result<Decimal, LedgerError> {
    a.checked_mul(b).ok_or_else(out_of_range)
}

fn out_of_range() -> LedgerError {
    LedgerError::InvalidAmount("resulting balance is out of range".to_string())
}
