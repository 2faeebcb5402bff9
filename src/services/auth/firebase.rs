use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{AuthError, AuthProvider, AuthSession};

const IDENTITY_TOOLKIT_URL: &str =
    "https://identitytoolkit.googleapis.com/v1/accounts:signInWithPassword";

/// Email/password sign-in through the Firebase Identity Toolkit REST API.
pub struct FirebaseAuthProvider {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    email: String,
    local_id: String,
}

impl FirebaseAuthProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_endpoint(api_key, IDENTITY_TOOLKIT_URL.to_string())
    }

    pub fn with_endpoint(api_key: String, endpoint: String) -> Self {
        Self {
            api_key,
            endpoint,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AuthProvider for FirebaseAuthProvider {
    async fn sign_in(&self, identifier: &str, secret: &str) -> Result<AuthSession, AuthError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "email": identifier.trim(),
                "password": secret,
                "returnSecureToken": true,
            }))
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = resp.status();
        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = data["error"]["message"].as_str().unwrap_or_default();
            tracing::info!(%status, message, "sign-in rejected");
            return Err(error_from_message(message));
        }

        let session: SignInResponse =
            serde_json::from_value(data).map_err(|e| AuthError::Transport(e.to_string()))?;
        Ok(AuthSession {
            email: session.email,
            user_id: session.local_id,
        })
    }
}

/// The error message is a code, sometimes followed by ` : detail`.
fn error_from_message(message: &str) -> AuthError {
    let code = message.split(' ').next().unwrap_or_default();
    match code {
        "INVALID_EMAIL" => AuthError::InvalidIdentifier,
        "USER_DISABLED" => AuthError::AccountDisabled,
        "EMAIL_NOT_FOUND" => AuthError::IdentifierNotFound,
        "INVALID_PASSWORD" => AuthError::WrongSecret,
        _ => AuthError::Rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(error_from_message("INVALID_EMAIL"), AuthError::InvalidIdentifier);
        assert_eq!(error_from_message("USER_DISABLED"), AuthError::AccountDisabled);
        assert_eq!(error_from_message("EMAIL_NOT_FOUND"), AuthError::IdentifierNotFound);
        assert_eq!(error_from_message("INVALID_PASSWORD"), AuthError::WrongSecret);
    }

    #[test]
    fn test_error_code_with_detail() {
        assert_eq!(
            error_from_message("TOO_MANY_ATTEMPTS_TRY_LATER : Access temporarily disabled"),
            AuthError::Rejected
        );
        assert_eq!(
            error_from_message("USER_DISABLED : The user account has been disabled."),
            AuthError::AccountDisabled
        );
        assert_eq!(error_from_message(""), AuthError::Rejected);
    }

    #[test]
    fn test_sign_in_response_shape() {
        let data = json!({
            "kind": "identitytoolkit#VerifyPasswordResponse",
            "localId": "uid-123",
            "email": "owner@example.com",
            "idToken": "...",
            "registered": true
        });
        let parsed: SignInResponse = serde_json::from_value(data).unwrap();
        assert_eq!(parsed.local_id, "uid-123");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let provider = FirebaseAuthProvider::with_endpoint(
            "key".to_string(),
            "http://127.0.0.1:1/signIn".to_string(),
        );
        let err = provider.sign_in("owner@example.com", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::Transport(_)));
    }
}
