//! Authentication guard run before every route transition.

use kcloft_core::NavigationId;
use kcloft_identity::{IdentityError, TokenProvider};
use tracing::{debug, error, info, instrument};

use super::route::Route;

/// What the guard decided about a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// The transition may complete.
    Proceed,
    /// An interactive login was started; the page is navigating away.
    Redirected,
    /// A login redirect is already under way; the transition is dropped.
    Aborted,
    /// The guard failed; the user stays on the previous route.
    Cancelled,
    /// A newer navigation started before this one finished.
    Superseded,
}

impl GuardDecision {
    /// Returns true if the transition completes.
    #[must_use]
    pub fn proceeds(&self) -> bool {
        matches!(self, Self::Proceed)
    }
}

/// A requested transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigation {
    /// Correlates log events for this transition.
    pub id: NavigationId,
    /// The committed route, or `None` before the first navigation.
    pub from: Option<Route>,
    /// The requested route.
    pub to: Route,
}

impl Navigation {
    /// Creates a transition with a fresh ID.
    #[must_use]
    pub fn new(from: Option<Route>, to: Route) -> Self {
        Self {
            id: NavigationId::new(),
            from,
            to,
        }
    }
}

/// Sends users without an account to the identity provider.
#[derive(Debug, Clone)]
pub struct NavigationGuard {
    tokens: TokenProvider,
}

impl NavigationGuard {
    /// Creates a guard that checks accounts through `tokens`.
    #[must_use]
    pub fn new(tokens: TokenProvider) -> Self {
        Self { tokens }
    }

    /// Decides whether a transition may complete.
    #[instrument(skip(self), fields(navigation = %navigation.id, to = %navigation.to))]
    pub async fn check(&self, navigation: &Navigation) -> GuardDecision {
        match self.evaluate(navigation.to).await {
            Ok(decision) => {
                debug!(?decision, "guard decided");
                decision
            }
            Err(IdentityError::InteractionInProgress) => {
                info!("login redirect already in progress");
                GuardDecision::Aborted
            }
            Err(err) => {
                error!(error = %err, "navigation guard failed");
                GuardDecision::Cancelled
            }
        }
    }

    async fn evaluate(&self, to: Route) -> Result<GuardDecision, IdentityError> {
        self.tokens.initialize().await?;
        let accounts = self.tokens.known_accounts().await?;

        if to.requires_auth() && accounts.is_empty() && to != Route::Login {
            info!("no signed-in account, starting login");
            self.tokens.login_redirect().await?;
            return Ok(GuardDecision::Redirected);
        }
        Ok(GuardDecision::Proceed)
    }
}
