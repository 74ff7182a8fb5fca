//! Credentials for calkeep: the `Authorizer` seam and its implementations.

pub mod authorizer;
pub mod google;
pub mod storage;

pub use authorizer::{AccessToken, Authorizer, StaticTokenAuthorizer, StoredTokenAuthorizer};
pub use google::{GoogleOAuth2Provider, GoogleTokenResponse};
pub use storage::{TokenSet, TokenStore};
