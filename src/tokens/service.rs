//! Token issuance and rotation.
//!
//! # Lifecycle
//! ```text
//! issue(user)          → access JWT + refresh JWT, refresh digest stored
//! rotate(refresh)      → verify, consume the record, issue a fresh pair
//! revoke(refresh)      → delete one record
//! revoke_all(user)     → delete every record of a user
//! sweep_expired()      → hourly backstop for abandoned sessions
//! ```
//!
//! Rotation and revocation failures are ordinary outcomes (`None` / `false`):
//! the caller asks the user to log in again.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::lifecycle::tasks::ScheduledTask;
use crate::observability::metrics;
use crate::tokens::claims::{AccessClaims, AuthUser, RefreshClaims, TokenPair, TokenType};
use crate::tokens::clock::{Clock, SystemClock};
use crate::tokens::expiry::parse_expiry;
use crate::tokens::store::{hash_token, RefreshTokenRecord, RefreshTokenStore, TokenStats};
use crate::tokens::users::UserDirectory;

/// Why a token operation did not go through.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
    #[error("invalid token type")]
    WrongType,
    #[error("refresh token expired")]
    Expired,
    #[error("refresh token not found")]
    NotFound,
    #[error("invalid refresh token")]
    HashMismatch,
    #[error("unknown user {0}")]
    UnknownUser(String),
}

/// Access token rejection reasons, worded for API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessTokenError {
    #[error("Token expired")]
    Expired,
    #[error("Malformed token")]
    Malformed,
    #[error("Invalid token type")]
    WrongType,
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Issues, rotates and revokes access/refresh token pairs.
pub struct TokenService {
    access_keys: SigningKeys,
    refresh_keys: SigningKeys,
    access_ttl: Duration,
    refresh_ttl: Duration,
    sweep_interval: Duration,
    store: RefreshTokenStore,
    users: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(config: &AuthConfig, users: Arc<dyn UserDirectory>) -> Self {
        Self::with_clock(config, users, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: &AuthConfig,
        users: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            access_keys: SigningKeys::from_secret(&config.access_token_secret),
            refresh_keys: SigningKeys::from_secret(&config.refresh_token_secret),
            access_ttl: parse_expiry(&config.access_token_expiry),
            refresh_ttl: parse_expiry(&config.refresh_token_expiry),
            sweep_interval: Duration::from_secs(config.sweep_interval_secs),
            store: RefreshTokenStore::new(),
            users,
            clock,
        }
    }

    /// Issue a new pair for `user` and track the refresh side.
    pub fn issue(&self, user: &AuthUser) -> Result<TokenPair, TokenError> {
        let now = self.clock.now();
        let iat = now.timestamp();

        let access_claims = AccessClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            roles: user.roles.clone(),
            permissions: user.permissions.clone(),
            token_type: TokenType::Access,
            iat,
            exp: expiry_timestamp(iat, self.access_ttl),
        };
        let access_token = sign(&access_claims, &self.access_keys)?;

        let token_id = Uuid::new_v4().to_string();
        let refresh_claims = RefreshClaims {
            sub: user.id.clone(),
            token_type: TokenType::Refresh,
            token_id: token_id.clone(),
            iat,
            exp: expiry_timestamp(iat, self.refresh_ttl),
        };
        let refresh_token = sign(&refresh_claims, &self.refresh_keys)?;

        self.store.insert(
            token_id,
            RefreshTokenRecord {
                user_id: user.id.clone(),
                hashed_token: hash_token(&refresh_token),
                created_at: now,
                expires_at: add_ttl(now, self.refresh_ttl),
            },
        );
        metrics::record_token_event("issued", 1);
        tracing::debug!(user_id = %user.id, "Issued token pair");

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.access_ttl.as_secs(),
        })
    }

    /// Exchange a refresh token for a brand-new pair. The presented token is
    /// consumed and can never be used again.
    pub fn rotate(&self, refresh_token: &str) -> Option<TokenPair> {
        match self.try_rotate(refresh_token) {
            Ok(pair) => {
                metrics::record_token_event("rotated", 1);
                Some(pair)
            }
            Err(e) => {
                tracing::debug!(reason = %e, "Token refresh failed");
                metrics::record_token_event("rotation_rejected", 1);
                None
            }
        }
    }

    fn try_rotate(&self, refresh_token: &str) -> Result<TokenPair, TokenError> {
        let claims = self.decode_refresh(refresh_token)?;
        let record = self.store.get(&claims.token_id).ok_or(TokenError::NotFound)?;

        let now = self.clock.now();
        if record.is_expired_at(now) || claims.exp <= now.timestamp() {
            self.store.remove(&claims.token_id);
            return Err(TokenError::Expired);
        }

        let hashed = hash_token(refresh_token);
        if hashed != record.hashed_token {
            return Err(TokenError::HashMismatch);
        }

        let record = self
            .store
            .consume(&claims.token_id, &hashed)
            .ok_or(TokenError::NotFound)?;

        let user = self
            .users
            .find_user(&record.user_id)
            .ok_or(TokenError::UnknownUser(record.user_id))?;

        self.issue(&user)
    }

    /// Delete the record behind `refresh_token`. Returns whether one existed.
    pub fn revoke(&self, refresh_token: &str) -> bool {
        let claims = match self.decode_refresh(refresh_token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(reason = %e, "Ignoring revocation of invalid token");
                return false;
            }
        };

        let removed = self.store.remove(&claims.token_id).is_some();
        if removed {
            metrics::record_token_event("revoked", 1);
        }
        removed
    }

    /// Delete every record owned by `user_id` ("log out everywhere").
    pub fn revoke_all(&self, user_id: &str) -> usize {
        let removed = self.store.remove_user(user_id);
        tracing::info!(user_id, removed, "Revoked all refresh tokens for user");
        metrics::record_token_event("revoked", removed as u64);
        removed
    }

    /// Delete every record whose expiry has passed.
    pub fn sweep_expired(&self) -> usize {
        let removed = self.store.sweep_expired_at(self.clock.now());
        if removed > 0 {
            tracing::info!(removed, "Swept expired refresh tokens");
            metrics::record_token_event("swept", removed as u64);
        }
        removed
    }

    pub fn stats(&self) -> TokenStats {
        let stats = self.store.stats_at(self.clock.now());
        metrics::record_refresh_tokens(stats.active_tokens, stats.expired_tokens);
        stats
    }

    /// Verify an access token and return its claims.
    pub fn verify_access(&self, access_token: &str) -> Result<AccessClaims, AccessTokenError> {
        let claims: AccessClaims =
            decode_claims(access_token, &self.access_keys).map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => AccessTokenError::Expired,
                _ => AccessTokenError::Malformed,
            })?;

        if claims.token_type != TokenType::Access {
            return Err(AccessTokenError::WrongType);
        }
        if claims.exp <= self.clock.now().timestamp() {
            return Err(AccessTokenError::Expired);
        }
        Ok(claims)
    }

    /// Start the recurring expiry sweep. The schedule stops when the
    /// returned task is cancelled or dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> ScheduledTask {
        let service = Arc::clone(self);
        ScheduledTask::every("refresh-token-sweep", self.sweep_interval, move || {
            service.sweep_expired();
        })
    }

    fn decode_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let claims: RefreshClaims =
            decode_claims(token, &self.refresh_keys).map_err(TokenError::Invalid)?;
        if claims.token_type != TokenType::Refresh {
            return Err(TokenError::WrongType);
        }
        Ok(claims)
    }
}

fn sign<T: serde::Serialize>(claims: &T, keys: &SigningKeys) -> Result<String, TokenError> {
    encode(&Header::new(Algorithm::HS256), claims, &keys.encoding).map_err(TokenError::Signing)
}

// Expiry is checked against the service clock, not by jsonwebtoken.
fn decode_claims<T: DeserializeOwned>(
    token: &str,
    keys: &SigningKeys,
) -> Result<T, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    decode::<T>(token, &keys.decoding, &validation).map(|data| data.claims)
}

fn expiry_timestamp(iat: i64, ttl: Duration) -> i64 {
    iat.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX))
}

fn add_ttl(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
