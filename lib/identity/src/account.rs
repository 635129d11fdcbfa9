//! Signed-in accounts known to the identity client.
//!
//! An account is created from the ID token claims of a successful login and
//! kept in the cache so it survives page reloads. Several accounts may be
//! cached; one of them is the active account.

use serde::{Deserialize, Serialize};

/// Identifier of a cached account.
///
/// Built from the provider's object and tenant ids (`oid.tid`) when both are
/// present, so the same person signing in again maps to the same account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Creates an account ID from a string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the account ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Stable identifier across logins.
    id: AccountId,
    /// Directory (tenant) the account signed in through.
    tenant_id: Option<String>,
    /// Host of the issuing authority, e.g. "login.microsoftonline.com".
    environment: String,
    /// Sign-in name (from the preferred_username claim).
    username: Option<String>,
    /// Display name (from the name claim).
    name: Option<String>,
}

impl Account {
    /// Creates an account with only the required fields.
    #[must_use]
    pub fn new(id: AccountId, environment: impl Into<String>) -> Self {
        Self {
            id,
            tenant_id: None,
            environment: environment.into(),
            username: None,
            name: None,
        }
    }

    /// Sets the tenant ID.
    #[must_use]
    pub fn with_tenant_id(mut self, tenant_id: Option<String>) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    /// Sets the sign-in name.
    #[must_use]
    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Returns the account ID.
    #[must_use]
    pub fn id(&self) -> &AccountId {
        &self.id
    }

    /// Returns the tenant ID, if known.
    #[must_use]
    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    /// Returns the authority host.
    #[must_use]
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Returns the sign-in name, if known.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Returns the display name, if known.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the best label for showing this account in the UI.
    #[must_use]
    pub fn display_label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or_else(|| self.id.as_str())
    }
}
