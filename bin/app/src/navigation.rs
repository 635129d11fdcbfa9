//! Routes, the authentication guard, and the client-side router.

pub mod guard;
pub mod route;
pub mod router;

pub use guard::{GuardDecision, Navigation, NavigationGuard};
pub use route::Route;
pub use router::{History, Location, MemoryHistory, Router};
