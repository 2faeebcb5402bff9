use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use super::{looks_like_email, AuthError, AuthProvider, AuthSession};

#[derive(Debug, Clone)]
pub struct LocalAccount {
    pub email: String,
    pub password: String,
    pub disabled: bool,
}

/// Checks credentials against a fixed account list. Used with the SQLite
/// store where there is no hosted identity service.
pub struct LocalAuthProvider {
    accounts: Vec<LocalAccount>,
}

impl LocalAuthProvider {
    pub fn new(accounts: Vec<LocalAccount>) -> Self {
        Self { accounts }
    }

    pub fn single(email: &str, password: &str) -> Self {
        Self::new(vec![LocalAccount {
            email: email.to_string(),
            password: password.to_string(),
            disabled: false,
        }])
    }
}

#[async_trait]
impl AuthProvider for LocalAuthProvider {
    async fn sign_in(&self, identifier: &str, secret: &str) -> Result<AuthSession, AuthError> {
        let identifier = identifier.trim();
        if !looks_like_email(identifier) {
            return Err(AuthError::InvalidIdentifier);
        }

        let account = self
            .accounts
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(identifier))
            .ok_or(AuthError::IdentifierNotFound)?;

        if account.disabled {
            return Err(AuthError::AccountDisabled);
        }
        if !secrets_match(&account.password, secret) {
            return Err(AuthError::WrongSecret);
        }

        Ok(AuthSession {
            email: account.email.clone(),
            user_id: format!("local:{}", account.email.to_lowercase()),
        })
    }
}

/// Compares MACs of both values so the check takes the same time whatever
/// the length or first differing byte of the candidate.
fn secrets_match(expected: &str, candidate: &str) -> bool {
    let digest = |value: &str| {
        Hmac::<Sha1>::new_from_slice(b"boothdesk-local-auth").map(|mut mac| {
            mac.update(value.as_bytes());
            mac
        })
    };
    match (digest(expected), digest(candidate)) {
        (Ok(expected), Ok(candidate)) => candidate
            .verify_slice(&expected.finalize().into_bytes())
            .is_ok(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> LocalAuthProvider {
        LocalAuthProvider::new(vec![
            LocalAccount {
                email: "owner@example.com".to_string(),
                password: "hunter2".to_string(),
                disabled: false,
            },
            LocalAccount {
                email: "former@example.com".to_string(),
                password: "pw".to_string(),
                disabled: true,
            },
        ])
    }

    #[tokio::test]
    async fn test_sign_in() {
        let session = provider()
            .sign_in("Owner@Example.com", "hunter2")
            .await
            .unwrap();
        assert_eq!(session.email, "owner@example.com");
        assert_eq!(session.user_id, "local:owner@example.com");
    }

    #[test]
    fn test_secrets_match() {
        assert!(secrets_match("hunter2", "hunter2"));
        assert!(secrets_match("", ""));
        assert!(!secrets_match("hunter2", "hunter3"));
        assert!(!secrets_match("hunter2", "hunter"));
        assert!(!secrets_match("hunter2", "hunter22"));
        assert!(!secrets_match("hunter2", ""));
    }

    #[tokio::test]
    async fn test_failures() {
        let provider = provider();
        assert_eq!(
            provider.sign_in("not-an-email", "x").await,
            Err(AuthError::InvalidIdentifier)
        );
        assert_eq!(
            provider.sign_in("nobody@example.com", "x").await,
            Err(AuthError::IdentifierNotFound)
        );
        assert_eq!(
            provider.sign_in("owner@example.com", "wrong").await,
            Err(AuthError::WrongSecret)
        );
        assert_eq!(
            provider.sign_in("owner@example.com", "hunter2 ").await,
            Err(AuthError::WrongSecret)
        );
        assert_eq!(
            provider.sign_in("former@example.com", "pw").await,
            Err(AuthError::AccountDisabled)
        );
    }
}
