//! Sessions and the tokens minted for them.
//!
//! A session is the signed-in context of one account: which account, and
//! which scopes the provider has granted. Sessions are produced by a
//! redirect login or a silent renewal and live for the page load.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::account::Account;

/// An opaque bearer credential.
///
/// The `Debug` output is redacted so tokens never end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps a raw token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }

    /// Returns the value of an `Authorization` header carrying this token.
    #[must_use]
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0)
    }

    /// Returns the token length, for logging without exposing the token.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the token string is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken([redacted; {} bytes])", self.0.len())
    }
}

/// The signed-in context of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    account: Account,
    scopes: Vec<String>,
    established_at: DateTime<Utc>,
}

impl Session {
    /// Creates a session established now.
    #[must_use]
    pub fn new(account: Account, scopes: Vec<String>) -> Self {
        Self {
            account,
            scopes,
            established_at: Utc::now(),
        }
    }

    /// Returns the account.
    #[must_use]
    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Returns the granted scopes.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Returns true if every requested scope has been granted.
    ///
    /// Comparison is case-insensitive, matching how providers echo scopes.
    #[must_use]
    pub fn has_scopes(&self, requested: &[String]) -> bool {
        requested.iter().all(|wanted| {
            self.scopes
                .iter()
                .any(|granted| granted.eq_ignore_ascii_case(wanted))
        })
    }

    /// Returns when the session was established.
    #[must_use]
    pub fn established_at(&self) -> DateTime<Utc> {
        self.established_at
    }
}

/// A successful token acquisition or login.
#[derive(Debug, Clone)]
pub struct AuthenticationResult {
    session: Session,
    access_token: AccessToken,
    expires_at: Option<DateTime<Utc>>,
    from_cache: bool,
}

impl AuthenticationResult {
    /// Creates a result for a freshly minted token.
    #[must_use]
    pub fn new(
        session: Session,
        access_token: AccessToken,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            session,
            access_token,
            expires_at,
            from_cache: false,
        }
    }

    /// Marks the result as served from the token cache.
    #[must_use]
    pub fn from_cache(mut self) -> Self {
        self.from_cache = true;
        self
    }

    /// Returns the session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the account the token was issued for.
    #[must_use]
    pub fn account(&self) -> &Account {
        self.session.account()
    }

    /// Returns the access token.
    #[must_use]
    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    /// Consumes the result, returning the access token.
    #[must_use]
    pub fn into_access_token(self) -> AccessToken {
        self.access_token
    }

    /// Returns when the token expires, if the provider said.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns true if the token came from the cache without a network call.
    #[must_use]
    pub fn is_from_cache(&self) -> bool {
        self.from_cache
    }

    /// Returns the remaining lifetime of the token.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at.map(|expires| expires - Utc::now())
    }
}
