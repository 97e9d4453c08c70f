//! In-memory refresh token records.
//!
//! Only a SHA-256 digest of each refresh token is kept. Every removal path
//! goes through `DashMap::remove*`, so a record is deleted at most once even
//! when rotation, revocation and the sweep race each other.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Server-side state for one live refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub user_id: String,
    pub hashed_token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Wire shape: `{ activeTokens, expiredTokens }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStats {
    pub active_tokens: usize,
    pub expired_tokens: usize,
}

/// Hex-encoded SHA-256 of a token string.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Refresh token records keyed by token id.
#[derive(Debug, Default)]
pub struct RefreshTokenStore {
    records: DashMap<String, RefreshTokenRecord>,
}

impl RefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, token_id: String, record: RefreshTokenRecord) {
        self.records.insert(token_id, record);
    }

    pub fn get(&self, token_id: &str) -> Option<RefreshTokenRecord> {
        self.records.get(token_id).map(|r| r.value().clone())
    }

    pub fn remove(&self, token_id: &str) -> Option<RefreshTokenRecord> {
        self.records.remove(token_id).map(|(_, record)| record)
    }

    /// Remove the record only if it still carries `hashed_token`.
    ///
    /// Of several concurrent rotations presenting the same token, exactly one
    /// gets `Some`.
    pub fn consume(&self, token_id: &str, hashed_token: &str) -> Option<RefreshTokenRecord> {
        self.records
            .remove_if(token_id, |_, record| record.hashed_token == hashed_token)
            .map(|(_, record)| record)
    }

    /// Remove every record owned by `user_id`, returning how many went.
    pub fn remove_user(&self, user_id: &str) -> usize {
        let mut removed = 0;
        self.records.retain(|_, record| {
            if record.user_id == user_id {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }

    /// Remove every record that expired before `now`.
    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        self.records.retain(|_, record| {
            if record.is_expired_at(now) {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }

    /// Count records by expiry relative to `now`. Expired records still
    /// awaiting the sweep are included.
    pub fn stats_at(&self, now: DateTime<Utc>) -> TokenStats {
        self.records
            .iter()
            .fold(TokenStats::default(), |mut stats, entry| {
                if entry.value().is_expired_at(now) {
                    stats.expired_tokens += 1;
                } else {
                    stats.active_tokens += 1;
                }
                stats
            })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
