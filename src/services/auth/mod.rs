pub mod firebase;
pub mod local;

use async_trait::async_trait;
use serde::Serialize;

/// Who signed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthSession {
    pub email: String,
    pub user_id: String,
}

/// Sign-in failures, worded for the operator.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid email address.")]
    InvalidIdentifier,

    #[error("User account is disabled.")]
    AccountDisabled,

    #[error("User not found. Please check your username.")]
    IdentifierNotFound,

    #[error("Incorrect password.")]
    WrongSecret,

    #[error("Login failed. Please try again.")]
    Rejected,

    #[error("authentication service unavailable: {0}")]
    Transport(String),
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, identifier: &str, secret: &str) -> Result<AuthSession, AuthError>;
}

/// Loose `local@domain.tld` shape check done before any lookup.
pub(crate) fn looks_like_email(identifier: &str) -> bool {
    let Some((local, domain)) = identifier.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !identifier.contains(char::is_whitespace)
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}
