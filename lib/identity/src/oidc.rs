//! OIDC identity client using the openidconnect and oauth2 crates.
//!
//! Implements the authorization code flow with PKCE for a public client:
//! discovery on `initialize`, a full-page redirect to the provider for
//! login, code exchange when the provider redirects back, and refresh-token
//! renewal for silent acquisition.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use oauth2::basic::{BasicClient, BasicErrorResponse, BasicErrorResponseType};
use oauth2::url::Url;
use oauth2::RequestTokenError;
use openidconnect::core::{CoreAuthenticationFlow, CoreClient, CoreProviderMetadata};
use openidconnect::{
    AuthorizationCode, ClientId, CsrfToken, IssuerUrl, Nonce, OAuth2TokenResponse,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope, TokenResponse,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, instrument, warn};

use crate::account::{Account, AccountId};
use crate::cache::{
    CacheStorage, CachedTokens, DEFAULT_REFRESH_BUFFER_MINUTES, IdentityCache,
    PendingAuthorization,
};
use crate::claims::ProviderClaims;
use crate::client::{IdentityClient, RedirectRequest, SilentRequest};
use crate::config::IdentityConfig;
use crate::error::IdentityError;
use crate::host::RedirectHost;
use crate::session::{AccessToken, AuthenticationResult, Session};

/// Identity client backed by an OIDC provider.
pub struct OidcIdentityClient {
    config: IdentityConfig,
    issuer_url: IssuerUrl,
    redirect_url: RedirectUrl,
    client_id: ClientId,
    http_client: reqwest::Client,
    cache: IdentityCache,
    host: Arc<dyn RedirectHost>,
    provider_metadata: Mutex<Option<CoreProviderMetadata>>,
    refresh_buffer: Duration,
}

impl OidcIdentityClient {
    /// Creates a client. No network calls are made until `initialize`.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the authority or redirect URI is invalid.
    pub fn new(
        config: IdentityConfig,
        storage: Arc<dyn CacheStorage>,
        host: Arc<dyn RedirectHost>,
    ) -> Result<Self, IdentityError> {
        let issuer_url = IssuerUrl::new(config.authority().to_string()).map_err(|e| {
            IdentityError::Configuration {
                reason: format!("invalid authority URL: {e}"),
            }
        })?;

        let redirect_url = RedirectUrl::new(config.redirect_uri().to_string()).map_err(|e| {
            IdentityError::Configuration {
                reason: format!("invalid redirect URI: {e}"),
            }
        })?;

        let client_id = ClientId::new(config.client_id().to_string());
        let cache = IdentityCache::new(storage, config.client_id());

        Ok(Self {
            config,
            issuer_url,
            redirect_url,
            client_id,
            http_client: build_http_client()?,
            cache,
            host,
            provider_metadata: Mutex::new(None),
            refresh_buffer: Duration::minutes(DEFAULT_REFRESH_BUFFER_MINUTES),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    fn metadata(&self) -> Result<CoreProviderMetadata, IdentityError> {
        self.provider_metadata
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(IdentityError::Uninitialized)
    }

    fn ensure_initialized(&self) -> Result<(), IdentityError> {
        self.metadata().map(|_| ())
    }

    fn find_account(&self, id: &AccountId) -> Result<Option<Account>, IdentityError> {
        Ok(self.cache.accounts()?.into_iter().find(|a| a.id() == id))
    }

    /// Renews the access token for an account with its refresh token.
    async fn refresh(
        &self,
        metadata: &CoreProviderMetadata,
        request: &SilentRequest,
        cached: Option<CachedTokens>,
    ) -> Result<AuthenticationResult, IdentityError> {
        let Some(refresh_token) = cached.as_ref().and_then(|t| t.refresh_token.clone()) else {
            debug!("no refresh token cached, interaction required");
            return Err(IdentityError::InteractionRequired);
        };

        let token_endpoint = metadata
            .token_endpoint()
            .ok_or_else(|| IdentityError::Configuration {
                reason: "provider metadata has no token endpoint".to_string(),
            })?;
        let token_url = oauth2::TokenUrl::new(token_endpoint.url().to_string()).map_err(|e| {
            IdentityError::Configuration {
                reason: format!("invalid token endpoint: {e}"),
            }
        })?;

        let client = BasicClient::new(oauth2::ClientId::new(self.config.client_id().to_string()))
            .set_token_uri(token_url);

        let token_result = client
            .exchange_refresh_token(&oauth2::RefreshToken::new(refresh_token.clone()))
            .add_scopes(request.scopes.iter().cloned().map(oauth2::Scope::new))
            .request_async(&self.http_client)
            .await
            .map_err(refresh_error)?;

        let expires_at = expiry_from(token_result.expires_in());
        let scopes = token_result
            .scopes()
            .map(|scopes| scopes.iter().map(|s| s.to_string()).collect())
            .unwrap_or_else(|| request.scopes.clone());

        let tokens = CachedTokens {
            access_token: token_result.access_token().secret().clone(),
            // Providers that do not rotate refresh tokens omit them from the response.
            refresh_token: token_result
                .refresh_token()
                .map(|t| t.secret().clone())
                .or(Some(refresh_token)),
            scopes: scopes.clone(),
            expires_at,
        };
        self.cache.store_tokens(request.account.id(), &tokens)?;

        info!(account = %request.account.id(), "access token renewed");

        Ok(AuthenticationResult::new(
            Session::new(request.account.clone(), scopes),
            AccessToken::new(tokens.access_token),
            expires_at,
        ))
    }

    /// Exchanges an authorization code for tokens and records the account.
    async fn exchange_code(
        &self,
        metadata: CoreProviderMetadata,
        code: &str,
        pending: &PendingAuthorization,
    ) -> Result<AuthenticationResult, IdentityError> {
        let client = CoreClient::from_provider_metadata(metadata, self.client_id.clone(), None)
            .set_redirect_uri(self.redirect_url.clone());

        let token_request = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .map_err(|e| IdentityError::TokenExchange {
                reason: format!("token endpoint error: {e}"),
            })?;

        let token_response = token_request
            .set_pkce_verifier(PkceCodeVerifier::new(pending.pkce_verifier.clone()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| IdentityError::TokenExchange {
                reason: format!("token exchange failed: {e}"),
            })?;

        let id_token = token_response
            .id_token()
            .ok_or_else(|| IdentityError::TokenExchange {
                reason: "no ID token in response".to_string(),
            })?;

        let nonce = Nonce::new(pending.nonce.clone());
        let claims = id_token
            .claims(&client.id_token_verifier(), &nonce)
            .map_err(|e| IdentityError::TokenValidation {
                reason: e.to_string(),
            })?;

        // The ID token is verified above; the raw payload is only read for
        // provider-specific claims the typed API does not expose.
        let provider_claims = ProviderClaims::from_jwt(&raw_id_token(&token_response)?)?;

        let account_id = provider_claims
            .home_account_id()
            .unwrap_or_else(|| claims.subject().to_string());
        let environment = claims
            .issuer()
            .url()
            .host_str()
            .unwrap_or_default()
            .to_string();

        let account = Account::new(AccountId::new(account_id), environment)
            .with_tenant_id(provider_claims.tid.clone())
            .with_username(claims.preferred_username().map(|u| u.as_str().to_string()))
            .with_name(
                claims
                    .name()
                    .and_then(|n| n.get(None))
                    .map(|n| n.as_str().to_string()),
            );

        let expires_at = expiry_from(token_response.expires_in());
        let scopes: Vec<String> = token_response
            .scopes()
            .map(|scopes| scopes.iter().map(|s| s.to_string()).collect())
            .unwrap_or_else(|| pending.scopes.clone());

        let tokens = CachedTokens {
            access_token: token_response.access_token().secret().clone(),
            refresh_token: token_response.refresh_token().map(|t| t.secret().clone()),
            scopes: scopes.clone(),
            expires_at,
        };

        self.cache.upsert_account(&account)?;
        self.cache.store_tokens(account.id(), &tokens)?;
        self.cache.set_active_account_id(Some(account.id()))?;

        info!(account = %account.id(), "login completed");

        Ok(AuthenticationResult::new(
            Session::new(account, scopes),
            AccessToken::new(tokens.access_token),
            expires_at,
        ))
    }
}

#[async_trait(?Send)]
impl IdentityClient for OidcIdentityClient {
    #[instrument(skip(self), fields(authority = %self.config.authority()))]
    async fn initialize(&self) -> Result<(), IdentityError> {
        if self.ensure_initialized().is_ok() {
            return Ok(());
        }

        debug!("discovering OIDC provider");
        let metadata =
            CoreProviderMetadata::discover_async(self.issuer_url.clone(), &self.http_client)
                .await
                .map_err(|e| IdentityError::Discovery {
                    reason: format!("failed to discover provider: {e}"),
                })?;

        *self
            .provider_metadata
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(metadata);
        info!("identity client initialized");
        Ok(())
    }

    fn all_accounts(&self) -> Result<Vec<Account>, IdentityError> {
        self.ensure_initialized()?;
        self.cache.accounts()
    }

    fn active_account(&self) -> Result<Option<Account>, IdentityError> {
        self.ensure_initialized()?;
        match self.cache.active_account_id()? {
            Some(id) => self.find_account(&id),
            None => Ok(None),
        }
    }

    fn set_active_account(&self, account: Option<&Account>) -> Result<(), IdentityError> {
        self.ensure_initialized()?;
        self.cache.set_active_account_id(account.map(Account::id))
    }

    #[instrument(skip(self, request), fields(account = %request.account.id()))]
    async fn acquire_token_silent(
        &self,
        request: &SilentRequest,
    ) -> Result<AuthenticationResult, IdentityError> {
        let metadata = self.metadata()?;

        if self.find_account(request.account.id())?.is_none() {
            return Err(IdentityError::NoAccount);
        }

        let cached = self.cache.tokens(request.account.id())?;
        if let Some(tokens) = &cached {
            if !tokens.is_expiring(Utc::now(), self.refresh_buffer)
                && tokens.covers(&request.scopes)
            {
                debug!("serving access token from cache");
                return Ok(AuthenticationResult::new(
                    Session::new(request.account.clone(), tokens.scopes.clone()),
                    AccessToken::new(tokens.access_token.clone()),
                    tokens.expires_at,
                )
                .from_cache());
            }
        }

        self.refresh(&metadata, request, cached).await
    }

    #[instrument(skip(self, request))]
    async fn login_redirect(&self, request: &RedirectRequest) -> Result<(), IdentityError> {
        let metadata = self.metadata()?;

        if self.cache.pending_authorization()?.is_some() {
            return Err(IdentityError::InteractionInProgress);
        }

        let client = CoreClient::from_provider_metadata(metadata, self.client_id.clone(), None)
            .set_redirect_uri(self.redirect_url.clone());

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut auth_request = client
            .authorize_url(
                CoreAuthenticationFlow::AuthorizationCode,
                CsrfToken::new_random,
                Nonce::new_random,
            )
            .set_pkce_challenge(pkce_challenge);

        let scopes: Vec<String> = if request.scopes.is_empty() {
            self.config.scopes().iter().map(|s| s.to_string()).collect()
        } else {
            request.scopes.clone()
        };
        // "openid" is always sent by the authorization request itself.
        for scope in scopes.iter().filter(|s| s.as_str() != "openid") {
            auth_request = auth_request.add_scope(Scope::new(scope.clone()));
        }
        if let Some(hint) = &request.login_hint {
            auth_request = auth_request.add_extra_param("login_hint", hint.clone());
        }

        let (auth_url, csrf_token, nonce) = auth_request.url();

        self.cache
            .set_pending_authorization(&PendingAuthorization {
                csrf_token: csrf_token.secret().clone(),
                pkce_verifier: pkce_verifier.secret().clone(),
                nonce: nonce.secret().clone(),
                scopes,
                started_at: Utc::now(),
            })?;

        info!("redirecting to identity provider");
        if let Err(e) = self.host.redirect(auth_url.as_str()) {
            self.cache.take_pending_authorization()?;
            return Err(e);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn handle_redirect_response(
        &self,
    ) -> Result<Option<AuthenticationResult>, IdentityError> {
        let metadata = self.metadata()?;

        let current = self.host.current_url()?;
        let url = Url::parse(&current).map_err(|e| IdentityError::Host {
            reason: format!("invalid current URL '{current}': {e}"),
        })?;
        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

        if !params.contains_key("code") && !params.contains_key("error") {
            // A login that never came back (user closed the provider tab,
            // pressed back) must not block the next attempt.
            if self.cache.take_pending_authorization()?.is_some() {
                warn!("discarding abandoned login");
            }
            return Ok(None);
        }

        let pending = self.cache.take_pending_authorization()?;
        self.host.replace_url(self.config.redirect_uri())?;

        if let Some(code) = params.get("error") {
            let err =
                IdentityError::from_provider_code(code, params.get("error_description").cloned());
            warn!(error = %err, "identity provider returned an error");
            return Err(err);
        }

        let pending = pending.ok_or(IdentityError::MissingAuthorizationState)?;
        if params.get("state") != Some(&pending.csrf_token) {
            return Err(IdentityError::StateMismatch);
        }

        let code = params
            .get("code")
            .ok_or(IdentityError::MissingAuthorizationState)?;
        self.exchange_code(metadata, code, &pending).await.map(Some)
    }

    #[instrument(skip(self))]
    async fn logout(&self) -> Result<(), IdentityError> {
        self.ensure_initialized()?;
        if let Some(account) = self.active_account()? {
            self.cache.remove_account(account.id())?;
            info!(account = %account.id(), "signed out");
        }
        self.cache.set_active_account_id(None)
    }
}

fn build_http_client() -> Result<reqwest::Client, IdentityError> {
    let builder = reqwest::Client::builder();
    // openidconnect requires redirects to be disabled.
    #[cfg(not(target_arch = "wasm32"))]
    let builder = builder.redirect(reqwest::redirect::Policy::none());
    builder.build().map_err(|e| IdentityError::Configuration {
        reason: format!("failed to create HTTP client: {e}"),
    })
}

/// Turns a provider's `expires_in` into an instant.
///
/// Lifetimes past the representable range are treated as no expiry.
fn expiry_from(expires_in: Option<std::time::Duration>) -> Option<DateTime<Utc>> {
    let lifetime = Duration::from_std(expires_in?).ok()?;
    Utc::now().checked_add_signed(lifetime)
}

fn refresh_error<RE>(err: RequestTokenError<RE, BasicErrorResponse>) -> IdentityError
where
    RE: std::error::Error + 'static,
{
    match err {
        RequestTokenError::ServerResponse(response) => match response.error() {
            BasicErrorResponseType::InvalidGrant => IdentityError::InteractionRequired,
            BasicErrorResponseType::Extension(code) => {
                IdentityError::from_provider_code(code, response.error_description().cloned())
            }
            _ => IdentityError::TokenAcquisition {
                reason: response.to_string(),
            },
        },
        other => IdentityError::TokenAcquisition {
            reason: other.to_string(),
        },
    }
}

/// Reads the compact ID token string out of a token response.
fn raw_id_token<TR>(token_response: &TR) -> Result<String, IdentityError>
where
    TR: serde::Serialize,
{
    let response_json =
        serde_json::to_value(token_response).map_err(|e| IdentityError::TokenValidation {
            reason: format!("failed to serialize token response: {e}"),
        })?;

    response_json
        .get("id_token")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| IdentityError::TokenValidation {
            reason: "no id_token in response".to_string(),
        })
}
