//! HS256 session tokens.
//!
//! ## Example
//!
//! ```ignore
//! use gatehouse_auth::token::TokenService;
//!
//! let tokens = TokenService::new(&config.signing_key, config.token_lifetime);
//! let token = tokens.issue("user-id", "admin")?;
//! let subject = tokens.verify(&token)?;
//! assert_eq!(subject.role, "admin");
//! ```

use std::fmt;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::{DEFAULT_TOKEN_LIFETIME, SigningSecret};
use crate::error::AuthError;

const SESSION_ALGORITHM: Algorithm = Algorithm::HS256;

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the user id.
    pub sub: String,

    /// Role name used by the role allow-lists.
    pub role: String,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Unique token identifier.
    pub jti: String,
}

impl SessionClaims {
    /// Builds claims issued now and expiring after `lifetime`.
    #[must_use]
    pub fn new(subject_id: impl Into<String>, role: impl Into<String>, lifetime: Duration) -> Self {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let lifetime = i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX);

        Self {
            sub: subject_id.into(),
            role: role.into(),
            iat: now,
            exp: now.saturating_add(lifetime),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Returns `true` if the token has expired at `now` (Unix seconds).
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.exp
    }
}

/// Identity extracted from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub subject_id: String,
    pub role: String,
}

/// Issues and verifies session tokens with a single symmetric key.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &SigningSecret, lifetime: Duration) -> Self {
        let mut validation = Validation::new(SESSION_ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            lifetime,
        }
    }

    /// Creates a service with the default 24 hour lifetime.
    #[must_use]
    pub fn with_default_lifetime(secret: &SigningSecret) -> Self {
        Self::new(secret, DEFAULT_TOKEN_LIFETIME)
    }

    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issues a token for `subject_id` with `role`.
    ///
    /// # Errors
    /// Returns `AuthError::Internal` if encoding fails.
    pub fn issue(&self, subject_id: &str, role: &str) -> Result<String, AuthError> {
        self.sign(&SessionClaims::new(subject_id, role, self.lifetime))
    }

    /// Signs arbitrary session claims.
    ///
    /// # Errors
    /// Returns `AuthError::Internal` if encoding fails.
    pub fn sign(&self, claims: &SessionClaims) -> Result<String, AuthError> {
        encode(&Header::new(SESSION_ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| AuthError::internal(format!("token encoding failed: {e}")))
    }

    /// Verifies a token and returns its subject.
    ///
    /// # Errors
    /// Returns `AuthError::Unauthenticated` for any invalid, foreign,
    /// tampered, or expired token.
    pub fn verify(&self, token: &str) -> Result<TokenSubject, AuthError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!(reason = ?e.kind(), "Session token rejected");
                AuthError::Unauthenticated
            })?;

        let claims = data.claims;
        if claims.is_expired_at(OffsetDateTime::now_utc().unix_timestamp()) {
            tracing::debug!("Session token rejected: expired");
            return Err(AuthError::Unauthenticated);
        }
        if claims.sub.is_empty() {
            tracing::debug!("Session token rejected: empty subject");
            return Err(AuthError::Unauthenticated);
        }

        Ok(TokenSubject {
            subject_id: claims.sub,
            role: claims.role,
        })
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &SESSION_ALGORITHM)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

    fn secret() -> SigningSecret {
        SigningSecret::new("test-signing-key-0123456789abcdef")
    }

    fn service() -> TokenService {
        TokenService::with_default_lifetime(&secret())
    }

    fn now() -> i64 {
        OffsetDateTime::now_utc().unix_timestamp()
    }

    #[test]
    fn test_issue_and_verify() {
        let service = service();
        let token = service.issue("user-123", "admin").unwrap();

        let subject = service.verify(&token).unwrap();
        assert_eq!(subject.subject_id, "user-123");
        assert_eq!(subject.role, "admin");
    }

    #[test]
    fn test_issued_claims() {
        let claims = SessionClaims::new("u", "user", Duration::from_secs(3600));
        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(!claims.jti.is_empty());
        assert_ne!(claims.jti, SessionClaims::new("u", "user", Duration::ZERO).jti);
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = service();
        let claims = SessionClaims {
            sub: "user-123".to_string(),
            role: "user".to_string(),
            iat: now() - 120,
            exp: now() - 60,
            jti: "jti".to_string(),
        };
        let token = service.sign(&claims).unwrap();

        assert!(matches!(
            service.verify(&token),
            Err(AuthError::Unauthenticated)
        ));
    }

    #[test]
    fn test_token_from_other_key_rejected() {
        let other = TokenService::with_default_lifetime(&SigningSecret::new(
            "another-signing-key-0123456789abc",
        ));
        let token = other.issue("user-123", "admin").unwrap();

        assert!(matches!(
            service().verify(&token),
            Err(AuthError::Unauthenticated)
        ));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let service = service();
        let token = service.issue("user-123", "user").unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let forged_claims = SessionClaims {
            role: "superadmin".to_string(),
            ..SessionClaims::new("user-123", "user", Duration::from_secs(60))
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert!(service.verify(&forged).is_err());
    }

    #[test]
    fn test_alg_none_rejected() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let claims = SessionClaims::new("user-123", "superadmin", Duration::from_secs(60));
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());

        for token in [format!("{header}.{payload}."), format!("{header}.{payload}")] {
            assert!(matches!(
                service().verify(&token),
                Err(AuthError::Unauthenticated)
            ));
        }
    }

    #[test]
    fn test_other_hmac_algorithm_rejected() {
        let claims = SessionClaims::new("user-123", "admin", Duration::from_secs(60));
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(secret().as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            service().verify(&token),
            Err(AuthError::Unauthenticated)
        ));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let service = service();
        for token in ["", "not-a-jwt", "a.b.c", "...."] {
            assert!(
                matches!(service.verify(token), Err(AuthError::Unauthenticated)),
                "token {token:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_debug_hides_keys() {
        let debug = format!("{:?}", service());
        assert!(debug.contains("HS256"));
        assert!(!debug.contains("test-signing-key"));
    }
}
