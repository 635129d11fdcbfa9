//! In-memory doubles for the identity seams.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};

use crate::account::{Account, AccountId};
use crate::client::{IdentityClient, RedirectRequest, SilentRequest};
use crate::error::IdentityError;
use crate::host::RedirectHost;
use crate::session::{AccessToken, AuthenticationResult, Session};

/// A shared, ordered log of calls made across several doubles.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.into());
    }

    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns the position of the first entry equal to `entry`.
    #[must_use]
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }
}

#[derive(Default)]
struct FakeState {
    initialized: bool,
    init_calls: usize,
    init_failures_remaining: usize,
    accounts: Vec<Account>,
    active: Option<AccountId>,
    silent_outcome: Option<Result<String, IdentityError>>,
    silent_requests: Vec<SilentRequest>,
    login_requests: Vec<RedirectRequest>,
    login_error: Option<IdentityError>,
    redirect_account: Option<Account>,
    redirect_error: Option<IdentityError>,
}

/// Scriptable [`IdentityClient`].
///
/// Behaves like a real client where it matters to callers: every operation
/// fails with `Uninitialized` before `initialize`, and a redirect result adds
/// its account to the known accounts.
#[derive(Default)]
pub struct FakeIdentityClient {
    state: Mutex<FakeState>,
    log: CallLog,
}

impl FakeIdentityClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records calls into a shared log.
    #[must_use]
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    #[must_use]
    pub fn with_accounts(self, accounts: Vec<Account>) -> Self {
        self.state().accounts = accounts;
        self
    }

    /// Silent acquisition succeeds with this token.
    #[must_use]
    pub fn with_silent_token(self, token: &str) -> Self {
        self.state().silent_outcome = Some(Ok(token.to_string()));
        self
    }

    /// Silent acquisition fails with this error.
    #[must_use]
    pub fn with_silent_error(self, err: IdentityError) -> Self {
        self.state().silent_outcome = Some(Err(err));
        self
    }

    /// The page was loaded from a successful login for `account`.
    #[must_use]
    pub fn with_redirect_result(self, account: Account) -> Self {
        self.state().redirect_account = Some(account);
        self
    }

    /// Completing the redirect fails with this error.
    #[must_use]
    pub fn with_redirect_error(self, err: IdentityError) -> Self {
        self.state().redirect_error = Some(err);
        self
    }

    /// Starting a login fails with this error.
    #[must_use]
    pub fn with_login_error(self, err: IdentityError) -> Self {
        self.state().login_error = Some(err);
        self
    }

    /// The first `count` initializations fail.
    #[must_use]
    pub fn failing_initializations(self, count: usize) -> Self {
        self.state().init_failures_remaining = count;
        self
    }

    /// Changes the silent acquisition token after construction.
    pub fn set_silent_token(&self, token: &str) {
        self.state().silent_outcome = Some(Ok(token.to_string()));
    }

    #[must_use]
    pub fn initialize_calls(&self) -> usize {
        self.state().init_calls
    }

    #[must_use]
    pub fn silent_requests(&self) -> Vec<SilentRequest> {
        self.state().silent_requests.clone()
    }

    #[must_use]
    pub fn login_requests(&self) -> Vec<RedirectRequest> {
        self.state().login_requests.clone()
    }

    #[must_use]
    pub fn log(&self) -> &CallLog {
        &self.log
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_initialized(&self) -> Result<(), IdentityError> {
        if self.state().initialized {
            Ok(())
        } else {
            Err(IdentityError::Uninitialized)
        }
    }
}

#[async_trait(?Send)]
impl IdentityClient for FakeIdentityClient {
    async fn initialize(&self) -> Result<(), IdentityError> {
        self.log.push("identity.initialize");
        {
            let mut state = self.state();
            state.init_calls += 1;
        }
        // Suspend once so concurrent callers overlap with the in-flight call.
        tokio::task::yield_now().await;

        let mut state = self.state();
        if state.init_failures_remaining > 0 {
            state.init_failures_remaining -= 1;
            return Err(IdentityError::Discovery {
                reason: "provider unreachable".to_string(),
            });
        }
        state.initialized = true;
        Ok(())
    }

    fn all_accounts(&self) -> Result<Vec<Account>, IdentityError> {
        self.check_initialized()?;
        Ok(self.state().accounts.clone())
    }

    fn active_account(&self) -> Result<Option<Account>, IdentityError> {
        self.check_initialized()?;
        let state = self.state();
        Ok(state
            .active
            .as_ref()
            .and_then(|id| state.accounts.iter().find(|a| a.id() == id))
            .cloned())
    }

    fn set_active_account(&self, account: Option<&Account>) -> Result<(), IdentityError> {
        self.check_initialized()?;
        self.log.push(match account {
            Some(account) => format!("identity.set_active_account:{}", account.id()),
            None => "identity.set_active_account:none".to_string(),
        });
        self.state().active = account.map(|a| a.id().clone());
        Ok(())
    }

    async fn acquire_token_silent(
        &self,
        request: &SilentRequest,
    ) -> Result<AuthenticationResult, IdentityError> {
        self.check_initialized()?;
        self.log.push("identity.acquire_token_silent");
        let mut state = self.state();
        state.silent_requests.push(request.clone());
        match state.silent_outcome.clone() {
            Some(Ok(token)) => Ok(AuthenticationResult::new(
                Session::new(request.account.clone(), request.scopes.clone()),
                AccessToken::new(token),
                None,
            )),
            Some(Err(err)) => Err(err),
            None => Err(IdentityError::InteractionRequired),
        }
    }

    async fn login_redirect(&self, request: &RedirectRequest) -> Result<(), IdentityError> {
        self.check_initialized()?;
        self.log.push("identity.login_redirect");
        let mut state = self.state();
        state.login_requests.push(request.clone());
        match state.login_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn handle_redirect_response(
        &self,
    ) -> Result<Option<AuthenticationResult>, IdentityError> {
        self.check_initialized()?;
        self.log.push("identity.handle_redirect_response");
        let mut state = self.state();
        if let Some(err) = state.redirect_error.clone() {
            return Err(err);
        }
        let Some(account) = state.redirect_account.take() else {
            return Ok(None);
        };
        if !state.accounts.iter().any(|a| a.id() == account.id()) {
            state.accounts.push(account.clone());
        }
        Ok(Some(AuthenticationResult::new(
            Session::new(account, Vec::new()),
            AccessToken::new("redirect-token"),
            None,
        )))
    }

    async fn logout(&self) -> Result<(), IdentityError> {
        self.check_initialized()?;
        self.log.push("identity.logout");
        let mut state = self.state();
        if let Some(active) = state.active.take() {
            state.accounts.retain(|a| a.id() != &active);
        }
        Ok(())
    }
}

/// [`RedirectHost`] that records navigation instead of performing it.
#[derive(Debug, Default)]
pub struct RecordingHost {
    current: Mutex<String>,
    redirects: Mutex<Vec<String>>,
}

impl RecordingHost {
    #[must_use]
    pub fn new(current_url: &str) -> Self {
        Self {
            current: Mutex::new(current_url.to_string()),
            redirects: Mutex::new(Vec::new()),
        }
    }

    pub fn set_current_url(&self, url: &str) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = url.to_string();
    }

    #[must_use]
    pub fn redirects(&self) -> Vec<String> {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RedirectHost for RecordingHost {
    fn current_url(&self) -> Result<String, IdentityError> {
        Ok(self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn redirect(&self, url: &str) -> Result<(), IdentityError> {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
        Ok(())
    }

    fn replace_url(&self, url: &str) -> Result<(), IdentityError> {
        self.set_current_url(url);
        Ok(())
    }
}
