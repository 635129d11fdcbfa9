//! Application routes.

use std::fmt;

/// A page of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Question bank. Requires a signed-in user.
    Home,
    /// Sign-in landing page.
    Login,
    /// Anything else.
    NotFound,
}

impl Route {
    /// Resolves a path. Query strings and fragments are ignored.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        match path.trim_end_matches('/') {
            "" => Self::Home,
            "/login" => Self::Login,
            _ => Self::NotFound,
        }
    }

    /// Returns the canonical path.
    #[must_use]
    pub fn path(&self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Login => "/login",
            Self::NotFound => "/404",
        }
    }

    /// Returns the route name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Login => "login",
            Self::NotFound => "not-found",
        }
    }

    /// Returns true if the route needs a signed-in user.
    #[must_use]
    pub fn requires_auth(&self) -> bool {
        matches!(self, Self::Home)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_paths() {
        assert_eq!(Route::from_path("/"), Route::Home);
        assert_eq!(Route::from_path(""), Route::Home);
        assert_eq!(Route::from_path("/?code=abc&state=xyz"), Route::Home);
        assert_eq!(Route::from_path("/login"), Route::Login);
        assert_eq!(Route::from_path("/login/"), Route::Login);
        assert_eq!(Route::from_path("/login#top"), Route::Login);
        assert_eq!(Route::from_path("/settings"), Route::NotFound);
    }

    #[test]
    fn only_home_requires_auth() {
        assert!(Route::Home.requires_auth());
        assert!(!Route::Login.requires_auth());
        assert!(!Route::NotFound.requires_auth());
    }

    #[test]
    fn canonical_paths_round_trip() {
        for route in [Route::Home, Route::Login] {
            assert_eq!(Route::from_path(route.path()), route);
        }
    }
}
