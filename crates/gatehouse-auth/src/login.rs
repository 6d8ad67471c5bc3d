//! Credential verification and registration.
//!
//! ## Login flow
//!
//! 1. A locked principal is rejected before any directory lookup or
//!    password comparison.
//! 2. Unknown email and wrong password both count as a failure and return
//!    the same [`AuthError::InvalidCredentials`].
//! 3. A correct password clears the failure counter and issues a token.
//!
//! There is no email verification step. A registered account can log in
//! immediately, and ownership of the address is never confirmed.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::AuthError;
use crate::lockout::LoginAttemptGuard;
use crate::token::TokenService;
use crate::users::{
    DEFAULT_USER_ROLE, NewUser, UserDirectory, UserRecord, hash_password, normalize_email,
    verify_password,
};

/// Login and registration over a [`UserDirectory`].
pub struct LoginService {
    directory: Arc<dyn UserDirectory>,
    guard: Arc<LoginAttemptGuard>,
    tokens: Arc<TokenService>,
}

impl LoginService {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        guard: Arc<LoginAttemptGuard>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            directory,
            guard,
            tokens,
        }
    }

    #[must_use]
    pub fn guard(&self) -> &LoginAttemptGuard {
        &self.guard
    }

    /// Verifies credentials and returns a session token.
    ///
    /// # Errors
    /// - `Locked` if the principal has too many recent failures
    /// - `InvalidCredentials` for an unknown email or wrong password
    /// - `StoreUnavailable` if the attempt could not be recorded
    pub async fn login(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let principal = normalize_email(email);

        if self.guard.check_locked(&principal).await {
            tracing::info!(principal = %principal, "Login rejected: principal locked");
            return Err(AuthError::Locked);
        }

        let Some(user) = self.directory.find_by_email(&principal).await? else {
            return self.reject(&principal).await;
        };

        let password = password.to_string();
        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::internal(format!("password verification task failed: {e}")))?;
        if !matches {
            return self.reject(&principal).await;
        }

        self.guard.record_success(&principal).await?;
        let token = self.tokens.issue(&user.id, &user.role)?;

        tracing::info!(user_id = %user.id, role = %user.role, "Login succeeded");
        Ok(token)
    }

    async fn reject(&self, principal: &str) -> Result<String, AuthError> {
        let attempts = self.guard.record_failure(principal).await?;
        tracing::info!(principal = %principal, attempts, "Login failed");
        Err(AuthError::InvalidCredentials)
    }

    /// Registers a self-service user with the default role and returns its id.
    ///
    /// # Errors
    /// - `InvalidRequest` for malformed input
    /// - `EmailTaken` if the email already exists
    pub async fn register(&self, new_user: NewUser) -> Result<String, AuthError> {
        self.provision(new_user, DEFAULT_USER_ROLE)
            .await
            .map(|user| user.id)
    }

    /// Creates a user with an explicit role.
    ///
    /// # Errors
    /// Same as [`register`](Self::register).
    pub async fn provision(&self, new_user: NewUser, role: &str) -> Result<UserRecord, AuthError> {
        let email = new_user.validate()?;

        if self.directory.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password = new_user.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AuthError::internal(format!("password hashing task failed: {e}")))??;

        let user = UserRecord {
            id: Uuid::new_v4().to_string(),
            email,
            full_name: new_user.full_name.trim().to_string(),
            password_hash,
            role: role.to_string(),
        };
        self.directory.create(user.clone()).await?;

        tracing::info!(user_id = %user.id, role = %user.role, "User registered");
        Ok(user)
    }

    /// Clears the failure counter for `principal`.
    ///
    /// # Errors
    /// Returns `StoreUnavailable` if the counter could not be deleted.
    pub async fn clear_lockout(&self, principal: &str) -> Result<(), AuthError> {
        let principal = normalize_email(principal);
        self.guard.record_success(&principal).await?;
        tracing::info!(principal = %principal, "Lockout cleared");
        Ok(())
    }
}
