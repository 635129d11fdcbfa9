//! Front end configuration.
//!
//! Loaded via the `config` crate: built-in defaults for the development
//! tenant, then environment variables prefixed with `KCLOFT_` and using `__`
//! as the nesting separator (e.g. `KCLOFT_IDENTITY__CLIENT_ID`).
//!
//! Browser builds have no process environment, so the API base URL can also
//! be baked in at compile time with `KCLOFT_API_BASE_URL`.

use kcloft_api::ApiConfig;
use kcloft_identity::IdentityConfig;
use serde::Deserialize;

/// Client ID of the development app registration.
pub const DEFAULT_CLIENT_ID: &str = "d4552121-7ccf-4875-8b0a-c71a7f5c8c28";

/// Authority of the development tenant.
pub const DEFAULT_AUTHORITY: &str =
    "https://login.microsoftonline.com/109199d4-f7c0-4027-bcd7-9937e7fb177b/v2.0";

/// Where the development server serves the front end.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:5173/";

/// Front end configuration composed from library configs.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Identity provider configuration.
    pub identity: IdentityConfig,

    /// API configuration.
    #[serde(default)]
    pub api: ApiConfig,

    /// `tracing` filter directives.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Loads configuration from defaults and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is present but invalid.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::from_environment(environment())
    }

    fn from_environment(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .set_default("identity.client_id", DEFAULT_CLIENT_ID)?
            .set_default("identity.authority", DEFAULT_AUTHORITY)?
            .set_default("identity.redirect_uri", DEFAULT_REDIRECT_URI)?
            .set_default(
                "api.base_url",
                option_env!("KCLOFT_API_BASE_URL").unwrap_or(kcloft_api::config::DEFAULT_BASE_URL),
            )?
            .add_source(environment)
            .build()?
            .try_deserialize()
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("KCLOFT")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_with(vars: &[(&str, &str)]) -> AppConfig {
        let mut source = config::Map::new();
        for (key, value) in vars {
            source.insert((*key).to_string(), (*value).to_string());
        }
        AppConfig::from_environment(environment().source(Some(source))).unwrap()
    }

    #[test]
    fn defaults_target_development_tenant() {
        let config = load_with(&[]);

        assert_eq!(config.identity.client_id(), DEFAULT_CLIENT_ID);
        assert_eq!(config.identity.authority(), DEFAULT_AUTHORITY);
        assert_eq!(config.identity.redirect_uri(), DEFAULT_REDIRECT_URI);
        assert_eq!(config.identity.api_scopes(), vec!["User.Read"]);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = load_with(&[
            ("KCLOFT_IDENTITY__CLIENT_ID", "other-client"),
            ("KCLOFT_IDENTITY__API_SCOPES", "api://kcloft/Questions.Read"),
            ("KCLOFT_API__BASE_URL", "https://api.kcloft.example"),
            ("KCLOFT_LOG_FILTER", "debug"),
        ]);

        assert_eq!(config.identity.client_id(), "other-client");
        assert_eq!(
            config.identity.api_scopes(),
            vec!["api://kcloft/Questions.Read"]
        );
        assert_eq!(config.api.base_url, "https://api.kcloft.example");
        assert_eq!(config.log_filter, "debug");
    }
}
