//! Server-held sessions.
//!
//! A session is created by `login` (or registration) and addressed by an opaque
//! token the client sends back as `Authorization: Bearer <token>`. The admin flag
//! captured here is the only thing privilege checks look at.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::account::auth::verify_password;
use crate::account::{Account, AccountId};
use crate::error::LedgerError;

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub username: AccountId,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn require_admin(&self) -> Result<(), LedgerError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized("administrator rights required".to_string()))
        }
    }

    /// The caller may only act as the account it logged in as
    pub fn require_identity(&self, username: &str) -> Result<(), LedgerError> {
        if self.username == username {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized(format!(
                "session belongs to {}, not {}",
                self.username, username
            )))
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Longest session lifetime honoured, about ten years
pub const MAX_TTL_HOURS: i64 = 24 * 365 * 10;

pub struct SessionManager {
    sessions: Mutex<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionManager {
    /// `ttl_hours` is clamped to `0..=MAX_TTL_HOURS`
    pub fn new(ttl_hours: i64) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl: Duration::hours(ttl_hours.clamp(0, MAX_TTL_HOURS)),
        }
    }

    /// Check the password against an account snapshot and open a session.
    /// Callers pass a clone taken under the store lock, never the guard itself.
    pub fn login(&self, account: &Account, password: &str) -> Result<Session, LedgerError> {
        verify_password(password, &account.password_hash)?;
        self.open(account)
    }

    /// Open a session for an already authenticated account
    pub fn open(&self, account: &Account) -> Result<Session, LedgerError> {
        let now = Utc::now();
        let session = Session {
            token: Uuid::new_v4().simple().to_string(),
            username: account.username.clone(),
            is_admin: account.has_admin_rights(),
            created_at: now,
            expires_at: now + self.ttl,
        };

        let mut sessions = self.lock()?;
        sessions.retain(|_, s| !s.is_expired(now));
        sessions.insert(session.token.clone(), session.clone());
        info!(user = %session.username, admin = session.is_admin, "session opened");

        Ok(session)
    }

    /// Look up the session behind a token
    pub fn resolve(&self, token: Option<&str>) -> Result<Session, LedgerError> {
        let token = token.ok_or_else(|| LedgerError::Unauthorized("not logged in".to_string()))?;
        let now = Utc::now();

        let mut sessions = self.lock()?;
        let expired = match sessions.get(token) {
            Some(session) if !session.is_expired(now) => return Ok(session.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            sessions.remove(token);
            debug!("expired session token presented");
            Err(LedgerError::Unauthorized("session expired".to_string()))
        } else {
            Err(LedgerError::Unauthorized("not logged in".to_string()))
        }
    }

    /// Invalidate a session. Returns false if the token was unknown.
    pub fn logout(&self, token: &str) -> Result<bool, LedgerError> {
        let removed = self.lock()?.remove(token);
        if let Some(session) = &removed {
            info!(user = %session.username, "session closed");
        }
        Ok(removed.is_some())
    }

    pub fn active_count(&self) -> usize {
        let now = Utc::now();
        self.lock()
            .map(|sessions| sessions.values().filter(|s| !s.is_expired(now)).count())
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Session>>, LedgerError> {
        self.sessions
            .lock()
            .map_err(|_| LedgerError::Internal("session table lock poisoned".to_string()))
    }
}
