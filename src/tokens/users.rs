//! Subject lookup used when a refresh token is rotated.

use crate::tokens::claims::AuthUser;

/// Resolves a user id into the roles and permissions embedded in new
/// access tokens. `None` means the user no longer exists.
pub trait UserDirectory: Send + Sync {
    fn find_user(&self, user_id: &str) -> Option<AuthUser>;
}

/// Directory used until an identity store is wired in: every id resolves to
/// a plain `user` with `read` permission.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticUserDirectory;

impl UserDirectory for StaticUserDirectory {
    fn find_user(&self, user_id: &str) -> Option<AuthUser> {
        Some(AuthUser {
            id: user_id.to_string(),
            email: format!("user-{user_id}@example.com"),
            roles: vec!["user".to_string()],
            permissions: vec!["read".to_string()],
        })
    }
}
