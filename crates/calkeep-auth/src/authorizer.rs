use std::fmt;
use std::sync::Arc;

use calkeep_core::AuthError;

use crate::google::GoogleOAuth2Provider;
use crate::storage::TokenStore;

/// Opaque credential handed to the remote calendar service.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Produces an auth handle for each remote call.
pub trait Authorizer {
    async fn authorize(&self) -> Result<AccessToken, AuthError>;
}

impl<A: Authorizer> Authorizer for Arc<A> {
    async fn authorize(&self) -> Result<AccessToken, AuthError> {
        (**self).authorize().await
    }
}

/// Always hands out the same token.
#[derive(Debug, Clone)]
pub struct StaticTokenAuthorizer {
    token: AccessToken,
}

impl StaticTokenAuthorizer {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(token),
        }
    }
}

impl Authorizer for StaticTokenAuthorizer {
    async fn authorize(&self) -> Result<AccessToken, AuthError> {
        Ok(self.token.clone())
    }
}

/// Reads the token for `service` from a `TokenStore`, refreshing and
/// re-storing it when it is close to expiry and a provider is configured.
#[derive(Debug, Clone)]
pub struct StoredTokenAuthorizer {
    store: TokenStore,
    service: String,
    provider: Option<GoogleOAuth2Provider>,
}

impl StoredTokenAuthorizer {
    pub fn new(store: TokenStore, service: impl Into<String>) -> Self {
        Self {
            store,
            service: service.into(),
            provider: None,
        }
    }

    /// Enable refreshing through the given OAuth client.
    pub fn with_refresh(mut self, provider: GoogleOAuth2Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    fn storage_error(err: anyhow::Error) -> AuthError {
        AuthError::StorageError(format!("{:#}", err))
    }
}

impl Authorizer for StoredTokenAuthorizer {
    #[tracing::instrument(skip(self), fields(service = %self.service), level = "debug")]
    async fn authorize(&self) -> Result<AccessToken, AuthError> {
        let token_set = self
            .store
            .retrieve_token(&self.service)
            .map_err(Self::storage_error)?
            .ok_or_else(|| AuthError::TokenNotFound(self.service.clone()))?;

        if !token_set.needs_refresh() {
            return Ok(AccessToken::new(token_set.access_token));
        }

        match (&self.provider, token_set.refresh_token.as_deref()) {
            (Some(provider), Some(refresh_token)) => {
                tracing::info!("Refreshing access token for {}", self.service);
                let response = provider.refresh_token(refresh_token).await?;
                let refreshed = response.into_token_set(token_set.refresh_token.clone());
                self.store
                    .store_token(&self.service, &refreshed)
                    .map_err(Self::storage_error)?;
                Ok(AccessToken::new(refreshed.access_token))
            }
            _ if !token_set.is_expired() => {
                tracing::debug!("Token for {} expires soon and cannot be refreshed", self.service);
                Ok(AccessToken::new(token_set.access_token.clone()))
            }
            _ => {
                tracing::warn!("Token for {} expired and cannot be refreshed", self.service);
                Err(AuthError::TokenExpired)
            }
        }
    }
}
