use rust_decimal::Decimal;
use thiserror::Error;

/// Credential failures reported by the account store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("User not found: {0}")]
    UnknownUser(String),
    #[error("Wrong password")]
    BadCredential,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Username is already taken: {0}")]
    DuplicateUsername(String),
    #[error("This name is reserved by the system: {0}")]
    ReservedName(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Insufficient funds: need {needed} SLC, available {available} SLC")]
    InsufficientFunds { needed: Decimal, available: Decimal },
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("User not found: {0}")]
    UnknownUser(String),
    #[error("Recipient not found: {0}")]
    UnknownRecipient(String),
    #[error("Cannot transfer to yourself")]
    SelfTransfer,
    #[error("Unknown friend code: {0}")]
    UnknownFriendCode(String),
    #[error("{0} is not in your friend list")]
    NotAFriend(String),
    #[error("Could not issue a unique friend code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: usize },
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Stable machine-readable code sent to clients next to the message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_)
            | Self::SelfTransfer
            | Self::UnknownFriendCode(_)
            | Self::NotAFriend(_) => "validation_error",
            Self::DuplicateUsername(_) => "duplicate_username",
            Self::ReservedName(_) => "reserved_name",
            Self::Auth(_) => "auth_error",
            Self::Unauthorized(_) => "unauthorized",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::UnknownUser(_) => "unknown_user",
            Self::UnknownRecipient(_) => "unknown_recipient",
            Self::CodeSpaceExhausted { .. } => "code_space_exhausted",
            Self::Persistence(_) => "persistence_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Persistence(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_kinds_group_validation_errors() {
        assert_eq!(LedgerError::SelfTransfer.kind(), "validation_error");
        assert_eq!(LedgerError::NotAFriend("bob".into()).kind(), "validation_error");
        assert_eq!(LedgerError::Auth(AuthError::BadCredential).kind(), "auth_error");
    }

    #[test]
    fn test_insufficient_funds_message() {
        let err = LedgerError::InsufficientFunds { needed: dec!(22.0), available: dec!(10) };
        assert_eq!(err.to_string(), "Insufficient funds: need 22.0 SLC, available 10 SLC");
    }
}
