//! Identity for the KCLoft front end.
//!
//! This crate provides:
//!
//! - **Identity client seam**: `IdentityClient`, the operations the front end
//!   needs from a sign-in library
//! - **OIDC client**: authorization code + PKCE redirect login and
//!   refresh-token renewal against a cloud identity provider
//! - **Token provider**: exactly-once initialization and "current access
//!   token or nothing" for request code
//! - **Cache**: accounts, tokens, and pending logins in a key/value store that
//!   survives the redirect round trip

pub mod account;
pub mod cache;
pub mod claims;
pub mod client;
pub mod config;
pub mod error;
pub mod host;
pub mod oidc;
pub mod provider;
pub mod session;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use account::{Account, AccountId};
pub use cache::{CacheStorage, IdentityCache, MemoryStorage};
pub use client::{IdentityClient, RedirectRequest, SilentRequest};
pub use config::{IdentityConfig, IdentityConfigBuilder};
pub use error::IdentityError;
pub use host::RedirectHost;
pub use oidc::OidcIdentityClient;
pub use provider::TokenProvider;
pub use session::{AccessToken, AuthenticationResult, Session};
