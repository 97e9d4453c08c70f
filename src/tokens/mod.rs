//! Access and refresh tokens.
//!
//! Access tokens are short-lived and stateless. Refresh tokens are long-lived,
//! single-use and backed by a server-side record holding only their SHA-256
//! digest, so a leaked record store cannot be replayed.

pub mod claims;
pub mod clock;
pub mod expiry;
pub mod service;
pub mod store;
pub mod users;

pub use claims::{AccessClaims, AuthUser, RefreshClaims, TokenPair, TokenType};
pub use clock::{Clock, SystemClock};
pub use expiry::parse_expiry;
pub use service::{AccessTokenError, TokenError, TokenService};
pub use store::{RefreshTokenRecord, RefreshTokenStore, TokenStats};
pub use users::{StaticUserDirectory, UserDirectory};
