//! The identity client seam.
//!
//! Everything the front end needs from the sign-in library goes through
//! [`IdentityClient`]. The production implementation is
//! [`OidcIdentityClient`](crate::oidc::OidcIdentityClient); tests use
//! in-memory doubles.
//!
//! Futures are not required to be `Send`: the client runs on a single
//! cooperative event loop (the browser's), where network futures are not
//! `Send`. Implementations are still `Send + Sync` so they can be shared
//! through `Arc` handles held by UI state.

use async_trait::async_trait;

use crate::account::Account;
use crate::error::IdentityError;
use crate::session::AuthenticationResult;

/// Parameters for silent token acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SilentRequest {
    /// Scopes the token must carry.
    pub scopes: Vec<String>,
    /// Account to acquire the token for.
    pub account: Account,
}

impl SilentRequest {
    /// Creates a silent request for an account.
    #[must_use]
    pub fn new(scopes: Vec<String>, account: Account) -> Self {
        Self { scopes, account }
    }
}

/// Parameters for an interactive redirect login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectRequest {
    /// Scopes to request consent for.
    pub scopes: Vec<String>,
    /// Optional sign-in name hint passed to the provider.
    pub login_hint: Option<String>,
}

impl RedirectRequest {
    /// Creates a redirect request for the given scopes.
    #[must_use]
    pub fn new(scopes: Vec<String>) -> Self {
        Self {
            scopes,
            login_hint: None,
        }
    }
}

/// A stateful sign-in client.
#[async_trait(?Send)]
pub trait IdentityClient: Send + Sync {
    /// Prepares the client (provider discovery, cache load).
    ///
    /// Must be called before any other operation; repeated calls are no-ops.
    async fn initialize(&self) -> Result<(), IdentityError>;

    /// Returns every cached account.
    fn all_accounts(&self) -> Result<Vec<Account>, IdentityError>;

    /// Returns the active account, if one is set.
    fn active_account(&self) -> Result<Option<Account>, IdentityError>;

    /// Sets (or clears) the active account.
    fn set_active_account(&self, account: Option<&Account>) -> Result<(), IdentityError>;

    /// Returns a token without user interaction, renewing it if needed.
    async fn acquire_token_silent(
        &self,
        request: &SilentRequest,
    ) -> Result<AuthenticationResult, IdentityError>;

    /// Sends the user to the provider's hosted login page.
    ///
    /// On success the host is navigating away; the caller should stop.
    async fn login_redirect(&self, request: &RedirectRequest) -> Result<(), IdentityError>;

    /// Completes a login if the current page is a redirect back from the provider.
    ///
    /// Returns `None` when the page was not loaded from a login redirect.
    async fn handle_redirect_response(&self)
    -> Result<Option<AuthenticationResult>, IdentityError>;

    /// Forgets the active account and its tokens.
    async fn logout(&self) -> Result<(), IdentityError>;
}
