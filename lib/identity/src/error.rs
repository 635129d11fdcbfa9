//! Error types for the identity crate.
//!
//! `IdentityError` is returned directly by the `IdentityClient` seam so
//! callers such as the navigation guard can branch on the variant. Code
//! that only needs to report the failure wraps it in a rootcause `Report`.

use std::fmt;

/// Errors from sign-in, account lookup, and token acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The client was used before `initialize` completed.
    Uninitialized,
    /// Invalid configuration (URLs, scopes).
    Configuration { reason: String },
    /// Provider metadata discovery failed.
    Discovery { reason: String },
    /// The provider needs the user to sign in interactively.
    InteractionRequired,
    /// The provider needs the user to consent to the requested scopes.
    ConsentRequired,
    /// An interactive redirect flow has already been started.
    InteractionInProgress,
    /// No account is available for the operation.
    NoAccount,
    /// The `state` returned by the provider does not match the pending login.
    StateMismatch,
    /// A redirect response arrived but no login was pending.
    MissingAuthorizationState,
    /// The provider returned an error on the redirect.
    Provider {
        code: String,
        description: Option<String>,
    },
    /// Exchanging the authorization code failed.
    TokenExchange { reason: String },
    /// The ID token failed validation.
    TokenValidation { reason: String },
    /// Silent token acquisition failed for a non-interactive reason.
    TokenAcquisition { reason: String },
    /// Reading or writing the cache storage failed.
    Storage { reason: String },
    /// The host environment (location, redirect) failed.
    Host { reason: String },
}

impl IdentityError {
    /// Maps an OAuth2 error code returned by the provider.
    #[must_use]
    pub fn from_provider_code(code: &str, description: Option<String>) -> Self {
        match code {
            "interaction_required" | "login_required" | "invalid_grant" => {
                Self::InteractionRequired
            }
            "consent_required" => Self::ConsentRequired,
            _ => Self::Provider {
                code: code.to_string(),
                description,
            },
        }
    }

    /// Returns true if only an interactive login can resolve this error.
    #[must_use]
    pub fn requires_interaction(&self) -> bool {
        matches!(
            self,
            Self::InteractionRequired | Self::ConsentRequired | Self::NoAccount
        )
    }

    /// Returns the short error code, in the provider's vocabulary where one exists.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Uninitialized => "uninitialized_public_client_application",
            Self::Configuration { .. } => "configuration_error",
            Self::Discovery { .. } => "endpoints_resolution_error",
            Self::InteractionRequired => "interaction_required",
            Self::ConsentRequired => "consent_required",
            Self::InteractionInProgress => "interaction_in_progress",
            Self::NoAccount => "no_account_error",
            Self::StateMismatch => "state_mismatch",
            Self::MissingAuthorizationState => "no_cached_authority_error",
            Self::Provider { code, .. } => code.as_str(),
            Self::TokenExchange { .. } => "token_exchange_error",
            Self::TokenValidation { .. } => "token_validation_error",
            Self::TokenAcquisition { .. } => "token_acquisition_error",
            Self::Storage { .. } => "storage_error",
            Self::Host { .. } => "host_error",
        }
    }
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "identity client used before initialization"),
            Self::Configuration { reason } => write!(f, "identity configuration error: {reason}"),
            Self::Discovery { reason } => write!(f, "OIDC discovery error: {reason}"),
            Self::InteractionRequired => write!(f, "user interaction required"),
            Self::ConsentRequired => write!(f, "user consent required"),
            Self::InteractionInProgress => write!(f, "an interactive login is already in progress"),
            Self::NoAccount => write!(f, "no signed-in account"),
            Self::StateMismatch => write!(f, "login response state does not match"),
            Self::MissingAuthorizationState => {
                write!(f, "login response received without a pending login")
            }
            Self::Provider {
                code,
                description: Some(description),
            } => write!(f, "identity provider error '{code}': {description}"),
            Self::Provider {
                code,
                description: None,
            } => write!(f, "identity provider error '{code}'"),
            Self::TokenExchange { reason } => write!(f, "token exchange failed: {reason}"),
            Self::TokenValidation { reason } => write!(f, "ID token validation failed: {reason}"),
            Self::TokenAcquisition { reason } => write!(f, "token acquisition failed: {reason}"),
            Self::Storage { reason } => write!(f, "cache storage error: {reason}"),
            Self::Host { reason } => write!(f, "host environment error: {reason}"),
        }
    }
}

impl std::error::Error for IdentityError {}
