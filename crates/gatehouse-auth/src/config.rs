//! Authentication and authorization configuration.
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth]
//! signing_key = "change-me-to-at-least-32-random-bytes"
//! token_lifetime = "24h"
//! public_paths = ["/ping", "/users/login", "/users/register"]
//!
//! [auth.lockout]
//! threshold = 3
//! window = "5m"
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::lockout::{DEFAULT_LOCKOUT_THRESHOLD, DEFAULT_LOCKOUT_WINDOW, LockoutPolicy};

/// Minimum accepted length of the HMAC signing key, in bytes.
pub const MIN_SIGNING_KEY_LEN: usize = 32;

/// Default session token lifetime.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 3600);

/// Root authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Symmetric key for HS256 session tokens.
    /// Prefer `GATEHOUSE__AUTH__SIGNING_KEY` over the config file.
    pub signing_key: SigningSecret,

    /// Session token lifetime.
    #[serde(with = "humantime_serde")]
    pub token_lifetime: Duration,

    /// Failed-login lockout settings.
    pub lockout: LockoutConfig,

    /// Paths that bypass the authorization gate.
    /// An entry matches the exact path or any sub-path below it.
    pub public_paths: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            signing_key: SigningSecret::default(),
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
            lockout: LockoutConfig::default(),
            public_paths: vec![
                "/ping".to_string(),
                "/users/login".to_string(),
                "/users/register".to_string(),
            ],
        }
    }
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns a `ConfigError` describing the first invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signing_key.is_empty() {
            return Err(ConfigError::missing("auth.signing_key"));
        }
        if self.signing_key.len() < MIN_SIGNING_KEY_LEN {
            return Err(ConfigError::invalid(
                "auth.signing_key",
                format!("must be at least {MIN_SIGNING_KEY_LEN} bytes"),
            ));
        }
        if self.token_lifetime.is_zero() {
            return Err(ConfigError::invalid("auth.token_lifetime", "must be > 0"));
        }
        self.lockout.validate()?;
        if let Some(bad) = self.public_paths.iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::invalid(
                "auth.public_paths",
                format!("'{bad}' must start with '/'"),
            ));
        }
        Ok(())
    }
}

/// Failed-login lockout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LockoutConfig {
    /// Failures at which the principal is locked out.
    pub threshold: u64,

    /// Counter lifetime, refreshed on every failure.
    #[serde(with = "humantime_serde")]
    pub window: Duration,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_LOCKOUT_THRESHOLD,
            window: DEFAULT_LOCKOUT_WINDOW,
        }
    }
}

impl LockoutConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.threshold == 0 {
            return Err(ConfigError::invalid("auth.lockout.threshold", "must be > 0"));
        }
        if self.window.is_zero() {
            return Err(ConfigError::invalid("auth.lockout.window", "must be > 0"));
        }
        Ok(())
    }

    #[must_use]
    pub fn policy(&self) -> LockoutPolicy {
        LockoutPolicy {
            threshold: self.threshold,
            window: self.window,
        }
    }
}

/// HMAC signing key that never appears in logs or serialized output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SigningSecret(String);

impl SigningSecret {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(***)")
    }
}

impl Serialize for SigningSecret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("***")
    }
}

impl<'de> Deserialize<'de> for SigningSecret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self)
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting is missing.
    #[error("missing required setting: {field}")]
    Missing {
        /// Dotted path of the setting.
        field: String,
    },

    /// A setting has an invalid value.
    #[error("invalid value for {field}: {message}")]
    Invalid {
        /// Dotted path of the setting.
        field: String,
        /// Why the value is invalid.
        message: String,
    },
}

impl ConfigError {
    #[must_use]
    pub fn missing(field: impl Into<String>) -> Self {
        Self::Missing {
            field: field.into(),
        }
    }

    #[must_use]
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AuthConfig {
        AuthConfig {
            signing_key: SigningSecret::new("0123456789abcdef0123456789abcdef"),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let cfg = AuthConfig::default();
        assert_eq!(cfg.token_lifetime, Duration::from_secs(86_400));
        assert_eq!(cfg.lockout.threshold, 3);
        assert_eq!(cfg.lockout.window, Duration::from_secs(300));
        assert!(cfg.public_paths.contains(&"/users/login".to_string()));
    }

    #[test]
    fn test_validate() {
        assert!(valid_config().validate().is_ok());

        assert_eq!(
            AuthConfig::default().validate(),
            Err(ConfigError::missing("auth.signing_key"))
        );

        let short = AuthConfig {
            signing_key: SigningSecret::new("short"),
            ..AuthConfig::default()
        };
        assert!(matches!(
            short.validate(),
            Err(ConfigError::Invalid { .. })
        ));

        let mut cfg = valid_config();
        cfg.lockout.threshold = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = valid_config();
        cfg.public_paths = vec!["login".to_string()];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_signing_secret_is_redacted() {
        let cfg = valid_config();
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("0123456789abcdef"));
        assert!(debug.contains("SigningSecret(***)"));

        let json = serde_json::to_string(&cfg).unwrap();
        assert!(!json.contains("0123456789abcdef"));
    }

    #[test]
    fn test_humantime_durations() {
        let cfg: AuthConfig = serde_json::from_str(
            r#"{"signing_key":"k","token_lifetime":"1h","lockout":{"window":"10m"}}"#,
        )
        .unwrap();
        assert_eq!(cfg.token_lifetime, Duration::from_secs(3600));
        assert_eq!(cfg.lockout.window, Duration::from_secs(600));
        assert_eq!(cfg.lockout.threshold, 3);
        assert_eq!(cfg.signing_key.as_bytes(), b"k");
    }
}
