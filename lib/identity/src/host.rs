//! Access to the page the client runs in.

use crate::error::IdentityError;

/// The browsing context seen by the identity client.
///
/// Reading the current address lets the client notice a redirect back from
/// the provider; `redirect` sends the browser to the provider.
pub trait RedirectHost: Send + Sync {
    /// Returns the full current URL, including the query string.
    fn current_url(&self) -> Result<String, IdentityError>;

    /// Navigates the whole page to an external URL.
    fn redirect(&self, url: &str) -> Result<(), IdentityError>;

    /// Replaces the current address without reloading or adding history.
    fn replace_url(&self, url: &str) -> Result<(), IdentityError>;
}
