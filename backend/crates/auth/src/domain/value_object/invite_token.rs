//! Invite Token Value Object
//!
//! 256-bit random secret, hex-encoded. The token is the only thing an
//! invitee receives, so it never appears in logs; use [`InviteToken::fingerprint`].

use std::fmt;

/// Raw entropy in bytes
pub const INVITE_TOKEN_BYTES: usize = 32;

/// Encoded length in characters
const INVITE_TOKEN_LEN: usize = INVITE_TOKEN_BYTES * 2;

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct InviteToken(String);

impl InviteToken {
    /// Generate a fresh unguessable token
    pub fn generate() -> Self {
        Self(platform::crypto::random_token_hex(INVITE_TOKEN_BYTES))
    }

    /// Parse a token from a URL path segment
    ///
    /// Anything that could not have been generated here is rejected
    /// without touching the store.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let well_formed = raw.len() == INVITE_TOKEN_LEN
            && raw.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        well_formed.then(|| Self(raw.to_string()))
    }

    /// Create from database value (assumed already validated)
    pub fn from_db(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Log-safe fingerprint
    pub fn fingerprint(&self) -> String {
        platform::crypto::log_fingerprint(&self.0)
    }
}

impl fmt::Debug for InviteToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InviteToken({})", self.fingerprint())
    }
}
