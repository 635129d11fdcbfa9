//! Client-side router.
//!
//! Owns the current location and runs the [`NavigationGuard`] before every
//! transition: programmatic pushes, the initial navigation on startup, and
//! history pops (back/forward). Subscribers observe committed locations
//! through a watch channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use kcloft_core::NavigationId;

use super::guard::{GuardDecision, Navigation, NavigationGuard};
use super::route::Route;

/// The address bar and session history.
pub trait History: Send + Sync {
    /// Returns the current path, including any query string.
    fn current_path(&self) -> String;

    /// Adds a history entry.
    fn push(&self, path: &str);

    /// Replaces the current history entry.
    fn replace(&self, path: &str);
}

/// In-memory [`History`].
#[derive(Debug)]
pub struct MemoryHistory {
    state: Mutex<MemoryHistoryState>,
}

#[derive(Debug)]
struct MemoryHistoryState {
    entries: Vec<String>,
    index: usize,
}

impl MemoryHistory {
    /// Creates a history with a single entry.
    #[must_use]
    pub fn new(initial: &str) -> Self {
        Self {
            state: Mutex::new(MemoryHistoryState {
                entries: vec![initial.to_string()],
                index: 0,
            }),
        }
    }

    /// Moves one entry back, like the browser's back button.
    ///
    /// Returns false if already at the first entry.
    pub fn back(&self) -> bool {
        let mut state = self.lock();
        if state.index == 0 {
            return false;
        }
        state.index -= 1;
        true
    }

    /// Moves one entry forward.
    pub fn forward(&self) -> bool {
        let mut state = self.lock();
        if state.index + 1 >= state.entries.len() {
            return false;
        }
        state.index += 1;
        true
    }

    /// Returns all entries.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.lock().entries.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryHistoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl History for MemoryHistory {
    fn current_path(&self) -> String {
        let state = self.lock();
        state.entries[state.index].clone()
    }

    fn push(&self, path: &str) {
        let mut state = self.lock();
        let next = state.index + 1;
        state.entries.truncate(next);
        state.entries.push(path.to_string());
        state.index = next;
    }

    fn replace(&self, path: &str) {
        let mut state = self.lock();
        let index = state.index;
        state.entries[index] = path.to_string();
    }
}

/// A committed location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub route: Route,
    pub path: String,
    pub navigation: NavigationId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Initial,
    Push,
    Pop,
}

/// Guarded client-side router.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

struct RouterInner {
    guard: NavigationGuard,
    history: Arc<dyn History>,
    current: watch::Sender<Option<Location>>,
    latest: AtomicU64,
}

impl Router {
    #[must_use]
    pub fn new(guard: NavigationGuard, history: Arc<dyn History>) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                guard,
                history,
                current: watch::Sender::new(None),
                latest: AtomicU64::new(0),
            }),
        }
    }

    /// Returns the committed location, if any navigation has completed.
    #[must_use]
    pub fn current(&self) -> Option<Location> {
        self.inner.current.borrow().clone()
    }

    /// Returns the committed route.
    #[must_use]
    pub fn current_route(&self) -> Option<Route> {
        self.inner.current.borrow().as_ref().map(|l| l.route)
    }

    /// Subscribes to committed locations.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Location>> {
        self.inner.current.subscribe()
    }

    /// Navigates to the location currently in the address bar.
    pub async fn start(&self) -> GuardDecision {
        let path = self.inner.history.current_path();
        self.navigate(path, Trigger::Initial).await
    }

    /// Navigates to `route` in place of the address bar's current entry.
    pub async fn start_at(&self, route: Route) -> GuardDecision {
        self.inner.history.replace(route.path());
        self.navigate(route.path().to_string(), Trigger::Initial).await
    }

    /// Navigates to `path`, adding a history entry if it completes.
    pub async fn push(&self, path: &str) -> GuardDecision {
        self.navigate(path.to_string(), Trigger::Push).await
    }

    /// Navigates to a route's canonical path.
    pub async fn push_route(&self, route: Route) -> GuardDecision {
        self.push(route.path()).await
    }

    /// Handles a back/forward move that already changed the address bar.
    ///
    /// If the guard rejects the move the previous path is put back.
    pub async fn handle_pop(&self) -> GuardDecision {
        let path = self.inner.history.current_path();
        self.navigate(path, Trigger::Pop).await
    }

    #[instrument(skip(self))]
    async fn navigate(&self, path: String, trigger: Trigger) -> GuardDecision {
        let sequence = self.inner.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let previous = self.current();
        let navigation = Navigation::new(
            previous.as_ref().map(|l| l.route),
            Route::from_path(&path),
        );
        debug!(navigation = %navigation.id, to = %navigation.to, "navigation started");

        let decision = self.inner.guard.check(&navigation).await;

        if self.inner.latest.load(Ordering::SeqCst) != sequence {
            debug!(navigation = %navigation.id, "navigation superseded");
            return GuardDecision::Superseded;
        }

        if decision.proceeds() {
            if trigger == Trigger::Push && self.inner.history.current_path() != path {
                self.inner.history.push(&path);
            }
            self.inner.current.send_replace(Some(Location {
                route: navigation.to,
                path,
                navigation: navigation.id,
            }));
        } else if trigger == Trigger::Pop
            && matches!(decision, GuardDecision::Cancelled | GuardDecision::Aborted)
        {
            if let Some(previous) = previous {
                warn!(path = %previous.path, "navigation rejected, restoring previous location");
                self.inner.history.replace(&previous.path);
            }
        }

        decision
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("current", &self.current())
            .finish_non_exhaustive()
    }
}
