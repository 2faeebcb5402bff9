use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("malformed session token")]
    Malformed,

    #[error("session signature mismatch")]
    BadSignature,

    #[error("session expired")]
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub email: String,
    pub issued_at: DateTime<Utc>,
}

/// Signs and checks the bearer tokens handed out at login.
///
/// A token is `base64url(email|issued_ms).base64url(hmac_sha1)`.
#[derive(Clone)]
pub struct SessionKeys {
    mac: HmacSha1,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl: Duration) -> anyhow::Result<Self> {
        anyhow::ensure!(!secret.is_empty(), "session secret must not be empty");
        let mac = HmacSha1::new_from_slice(secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("invalid session secret: {e}"))?;
        Ok(Self { mac, ttl })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, email: &str, now: DateTime<Utc>) -> String {
        let payload = format!("{email}|{}", now.timestamp_millis());
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        let signature = mac.finalize().into_bytes();

        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload.as_bytes()),
            URL_SAFE_NO_PAD.encode(signature)
        )
    }

    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, SessionError> {
        let (payload, signature) = token.split_once('.').ok_or(SessionError::Malformed)?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| SessionError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| SessionError::Malformed)?;

        let mut mac = self.mac.clone();
        mac.update(&payload);
        mac.verify_slice(&signature)
            .map_err(|_| SessionError::BadSignature)?;

        let payload = String::from_utf8(payload).map_err(|_| SessionError::Malformed)?;
        let (email, issued_ms) = payload.rsplit_once('|').ok_or(SessionError::Malformed)?;
        let issued_ms: i64 = issued_ms.parse().map_err(|_| SessionError::Malformed)?;
        let issued_at = Utc
            .timestamp_millis_opt(issued_ms)
            .single()
            .ok_or(SessionError::Malformed)?;

        if now - issued_at > self.ttl {
            return Err(SessionError::Expired);
        }

        Ok(SessionClaims {
            email: email.to_string(),
            issued_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> SessionKeys {
        SessionKeys::new("test-secret", Duration::hours(12)).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let keys = keys();
        let token = keys.issue("admin@example.com", now());

        let claims = keys.verify(&token, now() + Duration::hours(1)).unwrap();
        assert_eq!(claims.email, "admin@example.com");
        assert_eq!(claims.issued_at, now());
    }

    #[test]
    fn test_expired() {
        let keys = keys();
        let token = keys.issue("admin@example.com", now());
        assert_eq!(
            keys.verify(&token, now() + Duration::hours(13)),
            Err(SessionError::Expired)
        );
    }

    #[test]
    fn test_other_secret_rejected() {
        let token = keys().issue("admin@example.com", now());
        let other = SessionKeys::new("another-secret", Duration::hours(12)).unwrap();
        assert_eq!(other.verify(&token, now()), Err(SessionError::BadSignature));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let keys = keys();
        let token = keys.issue("admin@example.com", now());
        let (_, signature) = token.split_once('.').unwrap();
        let forged = format!(
            "{}.{signature}",
            URL_SAFE_NO_PAD.encode(format!("intruder@example.com|{}", now().timestamp_millis()))
        );
        assert_eq!(keys.verify(&forged, now()), Err(SessionError::BadSignature));
    }

    #[test]
    fn test_malformed() {
        let keys = keys();
        assert_eq!(keys.verify("", now()), Err(SessionError::Malformed));
        assert_eq!(keys.verify("no-dot-here", now()), Err(SessionError::Malformed));
        assert_eq!(keys.verify("!!.??", now()), Err(SessionError::Malformed));
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(SessionKeys::new("", Duration::hours(1)).is_err());
    }
}
