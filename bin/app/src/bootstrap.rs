//! Startup sequence.
//!
//! Runs once per page load, strictly in order:
//!
//! 1. Initialize the identity client. Failure stops startup.
//! 2. Complete a pending login redirect, if the page was loaded from one.
//! 3. Make the account from that login active, or else the first known one.
//! 4. Mount the UI, then run the router's initial navigation. If the
//!    provider sent back an error, that navigation goes to the login page
//!    instead, so a failing login is not restarted on every page load.
//! 5. After a fresh login, navigate to the home page.

use kcloft_api::QuestionsApi;
use kcloft_core::Result;
use kcloft_identity::{AccountId, IdentityError, TokenProvider};
use tracing::{info, instrument, warn};

use crate::error::StartupError;
use crate::navigation::{GuardDecision, Route, Router};

/// Handles shared by every component.
#[derive(Clone)]
pub struct AppContext {
    /// Access tokens and the signed-in account.
    pub tokens: TokenProvider,
    /// Guarded client-side router.
    pub router: Router,
    /// Authenticated questions API.
    pub questions: QuestionsApi,
    /// Why the login redirect that loaded this page failed, if it did.
    pub redirect_error: Option<IdentityError>,
}

/// Where the UI is mounted.
pub trait Shell {
    /// Mounts the UI. Called once, after the active account is settled.
    fn mount(&self, context: AppContext);
}

/// What startup did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapOutcome {
    /// True if this page load completed a login redirect.
    pub fresh_login: bool,
    /// The active account after startup.
    pub active_account: Option<AccountId>,
    /// The guard's decision on the initial navigation.
    pub initial_navigation: GuardDecision,
    /// The error the login redirect completed with, if any.
    pub redirect_error: Option<IdentityError>,
}

/// The startup sequence. Consumed by [`Bootstrap::run`].
pub struct Bootstrap {
    context: AppContext,
}

impl Bootstrap {
    /// Prepares startup over the shared handles.
    #[must_use]
    pub fn new(context: AppContext) -> Self {
        Self { context }
    }

    /// Runs the startup sequence.
    ///
    /// # Errors
    ///
    /// Returns `Initialization` if the identity client cannot be initialized;
    /// the UI is not mounted in that case.
    #[instrument(skip_all)]
    pub async fn run(mut self, shell: &dyn Shell) -> Result<BootstrapOutcome, StartupError> {
        let tokens = &self.context.tokens;

        tokens
            .initialize()
            .await
            .map_err(|e| StartupError::Initialization {
                details: e.to_string(),
            })?;
        info!("identity client ready");

        let mut redirect_error = None;
        let redirect = match tokens.handle_redirect_response().await {
            Ok(redirect) => redirect,
            Err(err) => {
                warn!(error = %err, "could not complete login redirect");
                redirect_error = Some(err);
                None
            }
        };
        let fresh_login = redirect.is_some();

        let candidate = match &redirect {
            Some(result) => Some(result.account().clone()),
            None => first_account(tokens).await,
        };
        let mut active_account = None;
        if let Some(account) = candidate {
            match tokens.set_active_account(&account).await {
                Ok(()) => {
                    info!(account = %account.id(), fresh_login, "active account set");
                    active_account = Some(account.id().clone());
                }
                Err(err) => warn!(error = %err, "could not set active account"),
            }
        }

        self.context.redirect_error.clone_from(&redirect_error);
        shell.mount(self.context.clone());
        let initial_navigation = if redirect_error.is_some() {
            self.context.router.start_at(Route::Login).await
        } else {
            self.context.router.start().await
        };
        info!(?initial_navigation, "UI mounted");

        if fresh_login {
            self.context.router.push_route(Route::Home).await;
        }

        Ok(BootstrapOutcome {
            fresh_login,
            active_account,
            initial_navigation,
            redirect_error,
        })
    }
}

async fn first_account(tokens: &TokenProvider) -> Option<kcloft_identity::Account> {
    match tokens.known_accounts().await {
        Ok(accounts) => accounts.into_iter().next(),
        Err(err) => {
            warn!(error = %err, "could not list accounts");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::{History, MemoryHistory, NavigationGuard};
    use kcloft_api::{ApiConfig, RequestGateway, ReqwestTransport};
    use kcloft_identity::test_utils::{CallLog, FakeIdentityClient};
    use kcloft_identity::{Account, IdentityConfig};
    use std::sync::{Arc, Mutex};

    struct RecordingShell {
        log: CallLog,
        route_at_mount: Mutex<Option<Option<Route>>>,
        redirect_error_at_mount: Mutex<Option<IdentityError>>,
    }

    impl RecordingShell {
        fn new(log: CallLog) -> Self {
            Self {
                log,
                route_at_mount: Mutex::new(None),
                redirect_error_at_mount: Mutex::new(None),
            }
        }

        fn mounted(&self) -> bool {
            self.route_at_mount.lock().unwrap().is_some()
        }
    }

    impl Shell for RecordingShell {
        fn mount(&self, context: AppContext) {
            self.log.push("shell.mount");
            *self.route_at_mount.lock().unwrap() = Some(context.router.current_route());
            *self.redirect_error_at_mount.lock().unwrap() = context.redirect_error;
        }
    }

    fn account(id: &str) -> Account {
        Account::new(AccountId::new(id), "login.example.com")
    }

    fn context(client: &Arc<FakeIdentityClient>, history: &Arc<MemoryHistory>) -> AppContext {
        let config = IdentityConfig::new(
            "client".to_string(),
            "https://login.example.com/tenant/v2.0".to_string(),
            "http://localhost:5173/".to_string(),
        );
        let tokens = TokenProvider::new(client.clone(), &config);
        let router = Router::new(NavigationGuard::new(tokens.clone()), history.clone());
        let transport = ReqwestTransport::new(&ApiConfig::default()).unwrap();
        let gateway = RequestGateway::new(Arc::new(transport), Arc::new(tokens.clone()));
        AppContext {
            tokens,
            router,
            questions: QuestionsApi::new(gateway),
            redirect_error: None,
        }
    }

    #[tokio::test]
    async fn redirect_login_sets_account_then_mounts_then_goes_home() {
        let log = CallLog::new();
        let client = Arc::new(
            FakeIdentityClient::new()
                .with_log(log.clone())
                .with_redirect_result(account("fresh")),
        );
        let history = Arc::new(MemoryHistory::new("/login"));
        let ctx = context(&client, &history);
        let router = ctx.router.clone();
        let shell = RecordingShell::new(log.clone());

        let outcome = Bootstrap::new(ctx).run(&shell).await.unwrap();

        assert!(outcome.fresh_login);
        assert_eq!(outcome.active_account, Some(AccountId::new("fresh")));

        let init = log.position("identity.initialize").unwrap();
        let redirect = log.position("identity.handle_redirect_response").unwrap();
        let activate = log.position("identity.set_active_account:fresh").unwrap();
        let mount = log.position("shell.mount").unwrap();
        assert!(init < redirect && redirect < activate && activate < mount);

        // Mounted before any route was committed; home afterwards.
        assert_eq!(*shell.route_at_mount.lock().unwrap(), Some(None));
        assert_eq!(router.current_route(), Some(Route::Home));
        assert_eq!(history.current_path(), "/");
        assert_eq!(client.initialize_calls(), 1);
    }

    #[tokio::test]
    async fn without_redirect_first_account_becomes_active() {
        let client = Arc::new(
            FakeIdentityClient::new().with_accounts(vec![account("first"), account("second")]),
        );
        let history = Arc::new(MemoryHistory::new("/"));
        let ctx = context(&client, &history);
        let router = ctx.router.clone();

        let outcome = Bootstrap::new(ctx)
            .run(&RecordingShell::new(CallLog::new()))
            .await
            .unwrap();

        assert!(!outcome.fresh_login);
        assert_eq!(outcome.active_account, Some(AccountId::new("first")));
        assert_eq!(outcome.initial_navigation, GuardDecision::Proceed);
        assert_eq!(router.current_route(), Some(Route::Home));
    }

    #[tokio::test]
    async fn no_accounts_mounts_and_starts_login_for_home() {
        let client = Arc::new(FakeIdentityClient::new());
        let history = Arc::new(MemoryHistory::new("/"));
        let ctx = context(&client, &history);
        let router = ctx.router.clone();
        let shell = RecordingShell::new(CallLog::new());

        let outcome = Bootstrap::new(ctx).run(&shell).await.unwrap();

        assert!(shell.mounted());
        assert_eq!(outcome.active_account, None);
        assert_eq!(outcome.initial_navigation, GuardDecision::Redirected);
        assert_eq!(router.current_route(), None);
        assert_eq!(client.login_requests().len(), 1);
    }

    #[tokio::test]
    async fn initialization_failure_stops_before_mount() {
        let client = Arc::new(FakeIdentityClient::new().failing_initializations(1));
        let history = Arc::new(MemoryHistory::new("/"));
        let shell = RecordingShell::new(CallLog::new());

        let result = Bootstrap::new(context(&client, &history)).run(&shell).await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("identity initialization failed"));
        assert!(!shell.mounted());
    }

    #[tokio::test]
    async fn failed_redirect_mounts_login_page_with_cached_account() {
        let client = Arc::new(
            FakeIdentityClient::new()
                .with_accounts(vec![account("cached")])
                .with_redirect_error(IdentityError::StateMismatch),
        );
        let history = Arc::new(MemoryHistory::new("/login"));
        let shell = RecordingShell::new(CallLog::new());

        let outcome = Bootstrap::new(context(&client, &history))
            .run(&shell)
            .await
            .unwrap();

        assert!(shell.mounted());
        assert!(!outcome.fresh_login);
        assert_eq!(outcome.active_account, Some(AccountId::new("cached")));
        assert_eq!(outcome.redirect_error, Some(IdentityError::StateMismatch));
        assert_eq!(history.current_path(), "/login");
    }

    #[tokio::test]
    async fn provider_error_shows_login_page_without_starting_another_login() {
        let error = IdentityError::Provider {
            code: "invalid_scope".to_string(),
            description: None,
        };
        let client = Arc::new(FakeIdentityClient::new().with_redirect_error(error.clone()));
        let history = Arc::new(MemoryHistory::new("/"));
        let ctx = context(&client, &history);
        let router = ctx.router.clone();
        let shell = RecordingShell::new(CallLog::new());

        let outcome = Bootstrap::new(ctx).run(&shell).await.unwrap();

        assert!(shell.mounted());
        assert_eq!(*shell.redirect_error_at_mount.lock().unwrap(), Some(error.clone()));
        assert_eq!(outcome.initial_navigation, GuardDecision::Proceed);
        assert_eq!(outcome.redirect_error, Some(error));
        assert_eq!(router.current_route(), Some(Route::Login));
        assert_eq!(history.entries(), vec!["/login".to_string()]);
        assert!(client.login_requests().is_empty());
    }
}
