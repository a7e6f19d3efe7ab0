//! Signed, time-bounded identity tokens shared by both services.
//!
//! A token is a self-contained HMAC-SHA256 claim bundle carrying the user id
//! and expiry. Nothing is persisted server-side, so a token cannot be revoked
//! before it expires; the only way to invalidate outstanding sessions is to
//! rotate the shared secret.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    /// Bad signature, unparseable claims, or a signing scheme other than the
    /// expected one. The verifier never negotiates algorithms.
    #[error("Invalid token")]
    Malformed,

    #[error("Token signing failed: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Malformed,
        }
    }
}

/// Claim set embedded in every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User identifier.
    pub sub: i32,

    /// Expiry as unix seconds.
    pub exp: i64,
}

impl Claims {
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Encodes and verifies tokens with a symmetric secret.
///
/// The secret is an explicit constructor argument rather than ambient process
/// state, so differently-configured codecs can coexist in one process.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenCodec {
    #[must_use]
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // An expiry one second in the past is already an expired token.
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    /// Issues a token for `user_id` expiring `ttl` from now.
    pub fn issue(&self, user_id: i32) -> Result<String, TokenError> {
        self.encode(user_id, Utc::now() + self.ttl)
    }

    /// Encodes a claim set with an explicit expiry.
    pub fn encode(&self, user_id: i32, expires_at: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user_id,
            exp: expires_at.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verifies signature, scheme, and expiry, and returns the claims.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(secret: &str) -> TokenCodec {
        TokenCodec::new(secret, Duration::minutes(30))
    }

    #[test]
    fn test_round_trip() {
        let codec = codec("test-secret");
        let expires_at = Utc::now() + Duration::minutes(10);

        let token = codec.encode(42, expires_at).unwrap();
        let claims = codec.decode(&token).unwrap();

        assert_eq!(claims.sub, 42);
        assert_eq!(claims.exp, expires_at.timestamp());
    }

    #[test]
    fn test_issue_uses_configured_ttl() {
        let codec = TokenCodec::new("test-secret", Duration::minutes(30));
        let before = Utc::now();

        let token = codec.issue(7).unwrap();
        let claims = codec.decode(&token).unwrap();

        let expected = (before + Duration::minutes(30)).timestamp();
        assert!((claims.exp - expected).abs() <= 2);
    }

    #[test]
    fn test_expired_token_rejected_even_with_valid_signature() {
        let codec = codec("test-secret");

        let token = codec.encode(42, Utc::now() - Duration::minutes(1)).unwrap();

        assert_eq!(codec.decode(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_wrong_secret_is_malformed() {
        let issued = codec("secret-a")
            .encode(42, Utc::now() + Duration::minutes(10))
            .unwrap();

        assert_eq!(codec("secret-b").decode(&issued), Err(TokenError::Malformed));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert_eq!(
            codec("test-secret").decode("not.a.token"),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn test_foreign_signing_scheme_rejected() {
        // Same secret, different declared algorithm: must not verify.
        let claims = Claims {
            sub: 42,
            exp: (Utc::now() + Duration::minutes(10)).timestamp(),
        };
        let foreign = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert_eq!(
            codec("test-secret").decode(&foreign),
            Err(TokenError::Malformed)
        );
    }
}
