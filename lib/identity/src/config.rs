//! Identity provider configuration.
//!
//! The front end is a public client: it holds a client ID but no secret and
//! proves possession of the authorization code with PKCE instead.

use serde::{Deserialize, Serialize};

/// Configuration for the OIDC identity provider.
///
/// Scope lists are stored as comma-separated strings so they can be set from
/// a single environment variable. Fields with defaults can be omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// The OAuth2 client ID registered with the provider.
    client_id: String,
    /// The authority (issuer) URL used for discovery,
    /// e.g. "https://login.microsoftonline.com/{tenant}/v2.0".
    authority: String,
    /// Where the provider sends the browser back after login.
    redirect_uri: String,
    /// Scopes requested on interactive login.
    /// Default: "openid,profile,offline_access,User.Read"
    #[serde(default = "default_scopes")]
    scopes: String,
    /// Scopes requested when acquiring tokens for API calls.
    /// Default: "User.Read"
    #[serde(default = "default_api_scopes")]
    api_scopes: String,
}

fn default_scopes() -> String {
    "openid,profile,offline_access,User.Read".to_string()
}

fn default_api_scopes() -> String {
    "User.Read".to_string()
}

fn split_scopes(raw: &str) -> Vec<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|scope| !scope.is_empty())
        .collect()
}

impl IdentityConfig {
    /// Creates a new configuration with default scopes.
    #[must_use]
    pub fn new(client_id: String, authority: String, redirect_uri: String) -> Self {
        Self {
            client_id,
            authority,
            redirect_uri,
            scopes: default_scopes(),
            api_scopes: default_api_scopes(),
        }
    }

    /// Creates a configuration builder for more customization.
    #[must_use]
    pub fn builder(
        client_id: String,
        authority: String,
        redirect_uri: String,
    ) -> IdentityConfigBuilder {
        IdentityConfigBuilder::new(client_id, authority, redirect_uri)
    }

    /// Returns the OAuth2 client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the authority URL.
    #[must_use]
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Returns the redirect URI.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Returns the login scopes.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        split_scopes(&self.scopes)
    }

    /// Returns the API scopes.
    #[must_use]
    pub fn api_scopes(&self) -> Vec<&str> {
        split_scopes(&self.api_scopes)
    }
}

/// Builder for `IdentityConfig`.
#[derive(Debug)]
pub struct IdentityConfigBuilder {
    client_id: String,
    authority: String,
    redirect_uri: String,
    scopes: Vec<String>,
    api_scopes: Vec<String>,
}

impl IdentityConfigBuilder {
    /// Creates a new builder with required fields.
    #[must_use]
    pub fn new(client_id: String, authority: String, redirect_uri: String) -> Self {
        Self {
            client_id,
            authority,
            redirect_uri,
            scopes: split_scopes(&default_scopes())
                .into_iter()
                .map(str::to_string)
                .collect(),
            api_scopes: vec!["User.Read".to_string()],
        }
    }

    /// Sets the login scopes.
    #[must_use]
    pub fn scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Adds a login scope if not already present.
    #[must_use]
    pub fn add_scope(mut self, scope: String) -> Self {
        if !self.scopes.contains(&scope) {
            self.scopes.push(scope);
        }
        self
    }

    /// Sets the API scopes.
    #[must_use]
    pub fn api_scopes(mut self, scopes: Vec<String>) -> Self {
        self.api_scopes = scopes;
        self
    }

    /// Builds the `IdentityConfig`.
    #[must_use]
    pub fn build(self) -> IdentityConfig {
        IdentityConfig {
            client_id: self.client_id,
            authority: self.authority,
            redirect_uri: self.redirect_uri,
            scopes: self.scopes.join(","),
            api_scopes: self.api_scopes.join(","),
        }
    }
}
