//! Token provider: the single entry point for "give me the current access token".

use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use crate::account::Account;
use crate::client::{IdentityClient, RedirectRequest, SilentRequest};
use crate::config::IdentityConfig;
use crate::error::IdentityError;
use crate::session::{AccessToken, AuthenticationResult};

/// Wraps an [`IdentityClient`] with exactly-once initialization and
/// silent-then-absent token semantics.
///
/// Cloning is cheap; clones share the client and the initialization state.
#[derive(Clone)]
pub struct TokenProvider {
    inner: Arc<Inner>,
}

struct Inner {
    client: Arc<dyn IdentityClient>,
    login_scopes: Vec<String>,
    api_scopes: Vec<String>,
    initialized: OnceCell<()>,
}

impl TokenProvider {
    /// Creates a provider. Scopes are taken from the configuration.
    #[must_use]
    pub fn new(client: Arc<dyn IdentityClient>, config: &IdentityConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                login_scopes: config.scopes().iter().map(|s| s.to_string()).collect(),
                api_scopes: config.api_scopes().iter().map(|s| s.to_string()).collect(),
                initialized: OnceCell::new(),
            }),
        }
    }

    /// Returns the underlying client.
    #[must_use]
    pub fn client(&self) -> &Arc<dyn IdentityClient> {
        &self.inner.client
    }

    /// Returns the scopes requested for API access tokens.
    #[must_use]
    pub fn api_scopes(&self) -> &[String] {
        &self.inner.api_scopes
    }

    /// Initializes the identity client.
    ///
    /// The client is initialized at most once. Concurrent callers wait on the
    /// same in-flight initialization. A failed attempt is not remembered, so
    /// the next caller tries again.
    pub async fn initialize(&self) -> Result<(), IdentityError> {
        self.inner
            .initialized
            .get_or_try_init(|| async {
                debug!("initializing identity client");
                self.inner.client.initialize().await
            })
            .await
            .map(|_| ())
    }

    /// Returns true once initialization has succeeded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.initialized()
    }

    /// Returns an access token for the API scopes, or `None`.
    ///
    /// Never fails: any error, including one that needs user interaction, is
    /// logged and reported as an absent token. May set the active account.
    #[instrument(skip(self))]
    pub async fn access_token(&self) -> Option<AccessToken> {
        match self.try_access_token().await {
            Ok(token) => token,
            Err(err) if err.requires_interaction() => {
                info!(code = err.code(), "interactive login required, no token");
                None
            }
            Err(err) => {
                warn!(error = %err, "silent token acquisition failed");
                None
            }
        }
    }

    async fn try_access_token(&self) -> Result<Option<AccessToken>, IdentityError> {
        self.initialize().await?;

        let client = &self.inner.client;
        let account = match client.active_account()? {
            Some(account) => account,
            None => {
                let Some(first) = client.all_accounts()?.into_iter().next() else {
                    debug!("no signed-in account");
                    return Ok(None);
                };
                client.set_active_account(Some(&first))?;
                debug!(account = %first.id(), "selected first known account");
                first
            }
        };

        let request = SilentRequest::new(self.inner.api_scopes.clone(), account);
        let result = client.acquire_token_silent(&request).await?;
        debug!(from_cache = result.is_from_cache(), "access token acquired");
        Ok(Some(result.into_access_token()))
    }

    /// Starts an interactive redirect login with the login scopes.
    pub async fn login_redirect(&self) -> Result<(), IdentityError> {
        self.initialize().await?;
        self.inner
            .client
            .login_redirect(&RedirectRequest::new(self.inner.login_scopes.clone()))
            .await
    }

    /// Completes a redirect login if the page was loaded from one.
    pub async fn handle_redirect_response(
        &self,
    ) -> Result<Option<AuthenticationResult>, IdentityError> {
        self.initialize().await?;
        self.inner.client.handle_redirect_response().await
    }

    /// Returns every known account.
    pub async fn known_accounts(&self) -> Result<Vec<Account>, IdentityError> {
        self.initialize().await?;
        self.inner.client.all_accounts()
    }

    /// Returns the active account.
    pub async fn active_account(&self) -> Result<Option<Account>, IdentityError> {
        self.initialize().await?;
        self.inner.client.active_account()
    }

    /// Sets the active account.
    pub async fn set_active_account(&self, account: &Account) -> Result<(), IdentityError> {
        self.initialize().await?;
        self.inner.client.set_active_account(Some(account))
    }

    /// Signs the active account out locally.
    pub async fn logout(&self) -> Result<(), IdentityError> {
        self.initialize().await?;
        self.inner.client.logout().await
    }
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenProvider")
            .field("login_scopes", &self.inner.login_scopes)
            .field("api_scopes", &self.inner.api_scopes)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountId;
    use crate::test_utils::FakeIdentityClient;

    fn config() -> IdentityConfig {
        IdentityConfig::builder(
            "client".to_string(),
            "https://login.example.com/tenant/v2.0".to_string(),
            "http://localhost:5173/".to_string(),
        )
        .api_scopes(vec!["api://questions/Read".to_string()])
        .build()
    }

    fn account(id: &str) -> Account {
        Account::new(AccountId::new(id), "login.example.com")
    }

    fn provider(client: &Arc<FakeIdentityClient>) -> TokenProvider {
        TokenProvider::new(client.clone(), &config())
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_initialization() {
        let client = Arc::new(FakeIdentityClient::new());
        let provider = provider(&client);

        let results = futures::future::join_all((0..5).map(|_| provider.initialize())).await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(client.initialize_calls(), 1);
        assert!(provider.is_initialized());

        provider.initialize().await.unwrap();
        assert_eq!(client.initialize_calls(), 1);
    }

    #[tokio::test]
    async fn failed_initialization_is_retried() {
        let client = Arc::new(FakeIdentityClient::new().failing_initializations(1));
        let provider = provider(&client);

        assert!(provider.initialize().await.is_err());
        assert!(!provider.is_initialized());
        assert!(provider.initialize().await.is_ok());
        assert_eq!(client.initialize_calls(), 2);
    }

    #[tokio::test]
    async fn no_accounts_means_no_token() {
        let client = Arc::new(FakeIdentityClient::new().with_silent_token("token"));
        let provider = provider(&client);

        assert!(provider.access_token().await.is_none());
        assert!(client.silent_requests().is_empty());
    }

    #[tokio::test]
    async fn selects_first_account_when_none_active() {
        let client = Arc::new(
            FakeIdentityClient::new()
                .with_accounts(vec![account("first"), account("second")])
                .with_silent_token("token"),
        );
        let provider = provider(&client);

        let token = provider.access_token().await.expect("token");

        assert_eq!(token.secret(), "token");
        assert_eq!(
            provider.active_account().await.unwrap().map(|a| a.id().clone()),
            Some(AccountId::new("first"))
        );
        let requests = client.silent_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].account.id().as_str(), "first");
        assert_eq!(requests[0].scopes, vec!["api://questions/Read".to_string()]);
    }

    #[tokio::test]
    async fn keeps_existing_active_account() {
        let client = Arc::new(
            FakeIdentityClient::new()
                .with_accounts(vec![account("first"), account("second")])
                .with_silent_token("token"),
        );
        let provider = provider(&client);
        provider.set_active_account(&account("second")).await.unwrap();

        provider.access_token().await.expect("token");

        assert_eq!(client.silent_requests()[0].account.id().as_str(), "second");
    }

    #[tokio::test]
    async fn interaction_required_yields_none() {
        let client = Arc::new(
            FakeIdentityClient::new()
                .with_accounts(vec![account("a")])
                .with_silent_error(IdentityError::InteractionRequired),
        );
        assert!(provider(&client).access_token().await.is_none());
    }

    #[tokio::test]
    async fn any_failure_yields_none() {
        let client = Arc::new(
            FakeIdentityClient::new()
                .with_accounts(vec![account("a")])
                .with_silent_error(IdentityError::TokenAcquisition {
                    reason: "network down".to_string(),
                }),
        );
        assert!(provider(&client).access_token().await.is_none());

        let failing_init = Arc::new(FakeIdentityClient::new().failing_initializations(1));
        assert!(provider(&failing_init).access_token().await.is_none());
    }

    #[tokio::test]
    async fn login_redirect_uses_login_scopes() {
        let client = Arc::new(FakeIdentityClient::new());
        let provider = provider(&client);

        provider.login_redirect().await.unwrap();

        let redirects = client.login_requests();
        assert_eq!(redirects.len(), 1);
        assert!(redirects[0].scopes.contains(&"offline_access".to_string()));
    }

    #[tokio::test]
    async fn logout_forgets_active_account() {
        let client = Arc::new(FakeIdentityClient::new().with_accounts(vec![account("a")]));
        let provider = provider(&client);
        provider.set_active_account(&account("a")).await.unwrap();

        provider.logout().await.unwrap();

        assert!(provider.active_account().await.unwrap().is_none());
        assert!(provider.known_accounts().await.unwrap().is_empty());
    }
}
