//! Friend code issuance.
//!
//! Codes look like `SLC-7KQM-X2PA`: two blocks of four characters drawn from an
//! alphabet without the easily confused `I`, `O`, `0` and `1`.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::types::AccountId;
use crate::error::LedgerError;

pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const CODE_PREFIX: &str = "SLC";
const BLOCK_LEN: usize = 4;
const BLOCKS: usize = 2;

/// Map of issued code -> owning username
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct FriendCodeRegistry {
    codes: BTreeMap<String, AccountId>,
}

impl FriendCodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh code for `username` using the thread RNG
    pub fn issue(&mut self, username: &str, max_attempts: usize) -> Result<String, LedgerError> {
        self.issue_with(username, max_attempts, &mut rand::thread_rng())
    }

    /// Issue a fresh code, retrying on collision up to `max_attempts` times
    pub fn issue_with<R: Rng + ?Sized>(
        &mut self,
        username: &str,
        max_attempts: usize,
        rng: &mut R,
    ) -> Result<String, LedgerError> {
        for _ in 0..max_attempts {
            let code = generate_code(rng);
            if !self.codes.contains_key(&code) {
                self.codes.insert(code.clone(), username.to_string());
                return Ok(code);
            }
        }
        Err(LedgerError::CodeSpaceExhausted { attempts: max_attempts })
    }

    /// Owner of a code. Lookup ignores case and surrounding whitespace.
    pub fn resolve(&self, code: &str) -> Option<&AccountId> {
        self.codes.get(&code.trim().to_ascii_uppercase())
    }

    /// Number of codes handed out so far
    pub fn issued(&self) -> usize {
        self.codes.len()
    }
}

fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut code = String::with_capacity(CODE_PREFIX.len() + BLOCKS * (BLOCK_LEN + 1));
    code.push_str(CODE_PREFIX);
    for _ in 0..BLOCKS {
        code.push('-');
        for _ in 0..BLOCK_LEN {
            let idx = rng.gen_range(0..CODE_ALPHABET.len());
            code.push(CODE_ALPHABET[idx] as char);
        }
    }
    code
}
