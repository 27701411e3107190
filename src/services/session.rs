//! Dashboard session tokens.
//!
//! Tokens are HS256 JWTs carrying the user id and expire one hour after issuance. Issuing
//! happens in the auth service at login; it is exposed here so both sides share one format.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Fixed session lifetime in seconds.
pub const SESSION_TTL_SECS: i64 = 3600;

/// JWT session claims
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid, // User ID
    pub iat: i64,  // Issued at
    pub exp: i64,  // Expiration time
}

/// Verifies bearer tokens for dashboard-originated requests.
#[derive(Clone)]
pub struct SessionAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SessionAuthenticator {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Create a session token for `user_id`.
    pub fn issue(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(SESSION_TTL_SECS)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("create JWT: {e}")))
    }

    /// Check signature and expiry, returning the user id.
    ///
    /// Every verification failure (bad signature, expired, garbage) is `InvalidToken`.
    pub fn verify(&self, token: &str) -> Result<Uuid, AppError> {
        decode::<SessionClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims.sub)
            .map_err(|e| {
                tracing::debug!(error = %e, "session token rejected");
                AppError::InvalidToken
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify() {
        let sessions = SessionAuthenticator::new("test-secret");
        let user_id = Uuid::new_v4();

        let token = sessions.issue(user_id).unwrap();
        assert_eq!(sessions.verify(&token).unwrap(), user_id);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = SessionAuthenticator::new("one").issue(Uuid::new_v4()).unwrap();
        let result = SessionAuthenticator::new("two").verify(&token);
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: Uuid::new_v4(),
            iat: (now - Duration::hours(3)).timestamp(),
            exp: (now - Duration::hours(2)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let result = SessionAuthenticator::new("test-secret").verify(&token);
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_garbage_rejected() {
        let result = SessionAuthenticator::new("test-secret").verify("not.a.jwt");
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_expiry_is_one_hour() {
        let sessions = SessionAuthenticator::new("test-secret");
        let token = sessions.issue(Uuid::new_v4()).unwrap();

        let data = decode::<SessionClaims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims.exp - data.claims.iat, SESSION_TTL_SECS);
    }
}
