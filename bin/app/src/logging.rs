//! Tracing subscriber setup.

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when the configured directives do not parse.
pub const FALLBACK_FILTER: &str = "info";

/// Parses filter directives, falling back to [`FALLBACK_FILTER`].
#[must_use]
pub fn env_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER))
}

/// Installs the global subscriber writing formatted events to `writer`.
///
/// Does nothing if a subscriber is already installed.
pub fn init<W>(directives: &str, writer: W)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let installed = tracing_subscriber::registry()
        .with(env_filter(directives))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .without_time()
                .with_writer(writer),
        )
        .try_init();

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
