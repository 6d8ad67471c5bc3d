//! User accounts and password hashing.
//!
//! Passwords are stored as Argon2id PHC strings. Email addresses are the
//! login principal and are normalised (trimmed, lower-cased) before any
//! lookup, so `Alice@Example.com` and `alice@example.com` share one account
//! and one lockout counter.

use async_trait::async_trait;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Role assigned to self-registered users.
pub const DEFAULT_USER_ROLE: &str = "user";

/// A stored user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
}

/// Registration input.
#[derive(Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    pub password: String,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .finish_non_exhaustive()
    }
}

impl NewUser {
    /// Checks the registration input and returns the normalised email.
    ///
    /// # Errors
    /// Returns `InvalidRequest` for a malformed email or empty password.
    pub fn validate(&self) -> Result<String, AuthError> {
        let email = normalize_email(&self.email);
        let valid_email = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
        if !valid_email {
            return Err(AuthError::invalid_request("A valid email address is required"));
        }
        if self.password.is_empty() {
            return Err(AuthError::invalid_request("Password must not be empty"));
        }
        Ok(email)
    }
}

/// Canonical form of an email address used as the login principal.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Lookup and creation of user accounts.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Finds a user by normalised email.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError>;

    /// Stores a new user.
    ///
    /// # Errors
    /// Returns `EmailTaken` if the email already exists.
    async fn create(&self, user: UserRecord) -> Result<(), AuthError>;
}

/// Process-local user directory.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: DashMap<String, UserRecord>,
}

impl InMemoryUserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        Ok(self.users.get(email).map(|entry| entry.value().clone()))
    }

    async fn create(&self, user: UserRecord) -> Result<(), AuthError> {
        match self.users.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(AuthError::EmailTaken),
            Entry::Vacant(slot) => {
                slot.insert(user);
                Ok(())
            }
        }
    }
}

/// Hashes a password with Argon2id and a random salt.
///
/// # Errors
/// Returns `AuthError::Internal` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::internal(format!("password hashing failed: {e}")))
}

/// Verifies a password against a stored PHC hash.
///
/// An unparseable hash never matches.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        tracing::warn!("Stored password hash is not a valid PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(email: &str) -> UserRecord {
        UserRecord {
            id: "id-1".to_string(),
            email: email.to_string(),
            full_name: "Test User".to_string(),
            password_hash: "hash".to_string(),
            role: DEFAULT_USER_ROLE.to_string(),
        }
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-hash"));
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn test_new_user_validation() {
        let user = NewUser {
            email: " Bob@Example.com".to_string(),
            full_name: String::new(),
            password: "pw".to_string(),
        };
        assert_eq!(user.validate().unwrap(), "bob@example.com");

        let bad_email = NewUser {
            email: "bob".to_string(),
            ..user.clone()
        };
        assert!(matches!(
            bad_email.validate(),
            Err(AuthError::InvalidRequest { .. })
        ));

        let empty_password = NewUser {
            password: String::new(),
            ..user
        };
        assert!(empty_password.validate().is_err());
    }

    #[test]
    fn test_new_user_debug_hides_password() {
        let user = NewUser {
            email: "a@b.c".to_string(),
            full_name: String::new(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{user:?}").contains("hunter2"));
    }

    #[test]
    fn test_record_serialization_skips_hash() {
        let json = serde_json::to_string(&record("a@b.c")).unwrap();
        assert!(!json.contains("password_hash"));
    }

    #[tokio::test]
    async fn test_directory_create_and_find() {
        let directory = InMemoryUserDirectory::new();
        directory.create(record("a@b.c")).await.unwrap();

        let found = directory.find_by_email("a@b.c").await.unwrap().unwrap();
        assert_eq!(found.id, "id-1");
        assert!(directory.find_by_email("x@b.c").await.unwrap().is_none());

        assert!(matches!(
            directory.create(record("a@b.c")).await,
            Err(AuthError::EmailTaken)
        ));
        assert_eq!(directory.len(), 1);
    }
}
