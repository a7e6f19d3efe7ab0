use argon2::{Argon2, PasswordHash, PasswordVerifier};
use thiserror::Error;
use tokio::task;

use crate::db::{AuthStore, User};
use crate::token::TokenCodec;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email and wrong password both map here so the response never
    /// reveals which part of the credentials was wrong.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Issued session: the signed token plus the account it belongs to.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Verifies credentials against the account store and mints session tokens.
pub struct SessionIssuer {
    store: AuthStore,
    codec: TokenCodec,
}

impl SessionIssuer {
    #[must_use]
    pub const fn new(store: AuthStore, codec: TokenCodec) -> Self {
        Self { store, codec }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let Some((user, password_hash)) = self.store.get_user_by_email_with_password(email).await?
        else {
            return Err(AuthError::InvalidCredentials);
        };

        let password = password.to_string();
        let verified = task::spawn_blocking(move || {
            let Ok(parsed) = PasswordHash::new(&password_hash) else {
                return false;
            };
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .await
        .map_err(|e| anyhow::anyhow!("Password verification task panicked: {e}"))?;

        if !verified {
            return Err(AuthError::InvalidCredentials);
        }

        let token = self
            .codec
            .issue(user.id)
            .map_err(|e| anyhow::anyhow!("Failed to sign session token: {e}"))?;

        Ok(Session { token, user })
    }
}
