//! Calendar-specific error types.

use calkeep_core::{AuthError, NetworkError, ReqwestErrorExt};
use thiserror::Error;

/// Failure reported by the remote calendar service.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Token expired or revoked")]
    TokenExpired,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: event was modified")]
    Conflict,

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.into_network_error())
    }
}

impl RemoteError {
    /// Whether this error should trigger a token refresh.
    pub fn should_refresh_token(&self) -> bool {
        matches!(self, Self::TokenExpired)
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited(_) | Self::Network(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum CalendarError {
    /// The authorizer could not produce a credential.
    #[error("Authorization failed: {0}")]
    Authorization(#[from] AuthError),

    /// The remote service rejected or failed the call.
    #[error("Remote call failed: {0}")]
    Remote(#[from] RemoteError),

    /// A required argument was missing; raised before any remote work.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A single event could not be rendered.
    #[error("Could not format event: {0}")]
    EventFormatting(String),

    #[error("No calendar id configured")]
    MissingCalendarId,
}

impl CalendarError {
    /// User-friendly error message for terminal display.
    pub fn user_message(&self) -> String {
        match self {
            Self::Authorization(e) => e.user_message().to_string(),
            Self::Remote(RemoteError::TokenExpired) => {
                "Your session has expired. Please sign in again.".to_string()
            }
            Self::Remote(RemoteError::Forbidden(_)) => {
                "You don't have access to this calendar.".to_string()
            }
            Self::Remote(RemoteError::NotFound(_)) => "Event or calendar not found".to_string(),
            Self::Remote(RemoteError::Conflict) => {
                "The event was modified elsewhere. Please refresh.".to_string()
            }
            Self::Remote(RemoteError::RateLimited(secs)) => {
                format!("Too many requests. Please wait {} seconds.", secs)
            }
            Self::Remote(RemoteError::Network(e)) => e.user_message().to_string(),
            Self::Remote(e) => format!("Calendar error: {}", e),
            Self::InvalidArgument(msg) => format!("Invalid request: {}", msg),
            Self::EventFormatting(msg) => format!("Invalid event: {}", msg),
            Self::MissingCalendarId => "No calendar id configured for this calendar.".to_string(),
        }
    }

    /// Whether this error should trigger a token refresh.
    pub fn should_refresh_token(&self) -> bool {
        match self {
            Self::Authorization(AuthError::TokenExpired) => true,
            Self::Remote(e) => e.should_refresh_token(),
            _ => false,
        }
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Remote(e) => e.is_retryable(),
            Self::Authorization(AuthError::Network(_)) => true,
            _ => false,
        }
    }
}
