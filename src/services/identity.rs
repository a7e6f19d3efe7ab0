use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::db::AuthStore;
use crate::entities::users::Role;
use crate::token::{TokenCodec, TokenError};

/// Identity attached to a request after its bearer token has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: i32,
    pub role: Role,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Token has expired")]
    Expired,

    #[error("Could not validate credentials")]
    Malformed,

    /// Covers everything that prevents a definite answer about the account:
    /// unknown user, storage failures, unreachable account service. Requests
    /// are denied rather than guessed at.
    #[error("Could not validate credentials")]
    Unauthorized,
}

impl From<TokenError> for ResolveError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::Expired,
            TokenError::Malformed | TokenError::Signing(_) => Self::Malformed,
        }
    }
}

/// Turns a bearer token into an [`AuthenticatedUser`], or refuses.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<AuthenticatedUser, ResolveError>;
}

/// Resolver used by the account service itself: the user table is local.
pub struct LocalIdentityResolver {
    store: AuthStore,
    codec: TokenCodec,
}

impl LocalIdentityResolver {
    #[must_use]
    pub const fn new(store: AuthStore, codec: TokenCodec) -> Self {
        Self { store, codec }
    }
}

#[async_trait]
impl IdentityResolver for LocalIdentityResolver {
    async fn resolve(&self, token: &str) -> Result<AuthenticatedUser, ResolveError> {
        let claims = self.codec.decode(token)?;

        let user = self
            .store
            .get_user(claims.sub)
            .await
            .map_err(|e| {
                warn!("User lookup failed during token resolution: {e:#}");
                ResolveError::Unauthorized
            })?
            .ok_or(ResolveError::Unauthorized)?;

        Ok(AuthenticatedUser {
            id: user.id,
            role: user.role,
        })
    }
}

#[derive(Deserialize)]
struct RemoteUser {
    id: i32,
    role: Role,
}

#[derive(Deserialize)]
struct RemoteUserEnvelope {
    success: bool,
    data: Option<RemoteUser>,
}

/// Resolver used by the ordering service: the signature and expiry are
/// checked locally, then the account itself is fetched from the account
/// service. Every upstream failure is treated as "not authenticated".
pub struct RemoteIdentityResolver {
    codec: TokenCodec,
    client: reqwest::Client,
    base_url: String,
}

impl RemoteIdentityResolver {
    pub fn new(codec: TokenCodec, base_url: String, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            codec,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl IdentityResolver for RemoteIdentityResolver {
    async fn resolve(&self, token: &str) -> Result<AuthenticatedUser, ResolveError> {
        let claims = self.codec.decode(token)?;

        let url = format!("{}/users/{}", self.base_url, claims.sub);
        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!("Account service unreachable at {url}: {e}");
            ResolveError::Unauthorized
        })?;

        if !response.status().is_success() {
            warn!(
                "Account service returned {} for user {}",
                response.status(),
                claims.sub
            );
            return Err(ResolveError::Unauthorized);
        }

        let envelope: RemoteUserEnvelope = response.json().await.map_err(|e| {
            warn!("Unreadable account service response: {e}");
            ResolveError::Unauthorized
        })?;

        let user = match envelope {
            RemoteUserEnvelope {
                success: true,
                data: Some(user),
            } => user,
            _ => return Err(ResolveError::Unauthorized),
        };

        if user.id != claims.sub {
            return Err(ResolveError::Unauthorized);
        }

        Ok(AuthenticatedUser {
            id: user.id,
            role: user.role,
        })
    }
}
