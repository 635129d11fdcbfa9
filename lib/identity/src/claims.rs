//! Provider-specific claims read from the raw ID token payload.
//!
//! The openidconnect crate exposes the standard claims, but the object and
//! tenant identifiers (`oid`, `tid`) used to key accounts are
//! provider-specific. They are read from the JWT payload after the token has
//! already been verified.

use base64::Engine;
use serde::Deserialize;

use crate::error::IdentityError;

/// Non-standard claims of interest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProviderClaims {
    /// Object ID of the user in the directory.
    pub oid: Option<String>,
    /// Tenant (directory) ID.
    pub tid: Option<String>,
}

impl ProviderClaims {
    /// Decodes the payload segment of a compact JWT.
    ///
    /// Does not verify the signature.
    pub fn from_jwt(token: &str) -> Result<Self, IdentityError> {
        // header.payload.signature
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(IdentityError::TokenValidation {
                reason: "invalid JWT format".to_string(),
            });
        }

        let payload_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(parts[1].trim_end_matches('='))
            .map_err(|e| IdentityError::TokenValidation {
                reason: format!("failed to decode JWT payload: {e}"),
            })?;

        serde_json::from_slice(&payload_bytes).map_err(|e| IdentityError::TokenValidation {
            reason: format!("failed to parse JWT payload: {e}"),
        })
    }

    /// Returns the home account identifier (`oid.tid`) when both claims exist.
    #[must_use]
    pub fn home_account_id(&self) -> Option<String> {
        match (&self.oid, &self.tid) {
            (Some(oid), Some(tid)) => Some(format!("{oid}.{tid}")),
            _ => None,
        }
    }
}
