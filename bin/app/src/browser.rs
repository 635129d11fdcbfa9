//! Browser adapters and the wasm entry point.
//!
//! Browser handles (`Window`, `Storage`) are not `Send`, so the adapters
//! look them up on every call instead of holding them.

use kcloft_api::{QuestionsApi, RequestGateway, ReqwestTransport};
use kcloft_core::Result;
use kcloft_identity::{
    CacheStorage, IdentityError, OidcIdentityClient, RedirectHost, TokenProvider,
};
use leptos::prelude::*;
use leptos::task::spawn_local;
use std::io;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::fmt::MakeWriter;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::app::App;
use crate::bootstrap::{AppContext, Bootstrap, Shell};
use crate::config::AppConfig;
use crate::error::StartupError;
use crate::navigation::{History, NavigationGuard, Router};

fn window() -> std::result::Result<web_sys::Window, IdentityError> {
    web_sys::window().ok_or_else(|| IdentityError::Host {
        reason: "no window".to_string(),
    })
}

fn host_error(context: &str, err: JsValue) -> IdentityError {
    IdentityError::Host {
        reason: format!("{context}: {err:?}"),
    }
}

fn storage_error(context: &str, err: JsValue) -> IdentityError {
    IdentityError::Storage {
        reason: format!("{context}: {err:?}"),
    }
}

/// `window.sessionStorage`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionStorage;

impl SessionStorage {
    fn storage(&self) -> std::result::Result<web_sys::Storage, IdentityError> {
        window()?
            .session_storage()
            .map_err(|e| storage_error("sessionStorage unavailable", e))?
            .ok_or_else(|| IdentityError::Storage {
                reason: "sessionStorage unavailable".to_string(),
            })
    }
}

impl CacheStorage for SessionStorage {
    fn get(&self, key: &str) -> std::result::Result<Option<String>, IdentityError> {
        self.storage()?
            .get_item(key)
            .map_err(|e| storage_error("read failed", e))
    }

    fn set(&self, key: &str, value: &str) -> std::result::Result<(), IdentityError> {
        self.storage()?
            .set_item(key, value)
            .map_err(|e| storage_error("write failed", e))
    }

    fn remove(&self, key: &str) -> std::result::Result<(), IdentityError> {
        self.storage()?
            .remove_item(key)
            .map_err(|e| storage_error("remove failed", e))
    }
}

/// `window.location` as seen by the identity client.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserHost;

impl RedirectHost for BrowserHost {
    fn current_url(&self) -> std::result::Result<String, IdentityError> {
        window()?
            .location()
            .href()
            .map_err(|e| host_error("location unavailable", e))
    }

    fn redirect(&self, url: &str) -> std::result::Result<(), IdentityError> {
        window()?
            .location()
            .assign(url)
            .map_err(|e| host_error("redirect failed", e))
    }

    fn replace_url(&self, url: &str) -> std::result::Result<(), IdentityError> {
        window()?
            .history()
            .map_err(|e| host_error("history unavailable", e))?
            .replace_state_with_url(&JsValue::NULL, "", Some(url))
            .map_err(|e| host_error("replaceState failed", e))
    }
}

/// `window.history`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserHistory;

impl History for BrowserHistory {
    fn current_path(&self) -> String {
        let Ok(location) = window().map(|w| w.location()) else {
            return "/".to_string();
        };
        let path = location.pathname().unwrap_or_else(|_| "/".to_string());
        let search = location.search().unwrap_or_default();
        format!("{path}{search}")
    }

    fn push(&self, path: &str) {
        let pushed = window().and_then(|w| {
            w.history()
                .and_then(|h| h.push_state_with_url(&JsValue::NULL, "", Some(path)))
                .map_err(|e| host_error("pushState failed", e))
        });
        if let Err(err) = pushed {
            error!(error = %err, "could not add history entry");
        }
    }

    fn replace(&self, path: &str) {
        if let Err(err) = BrowserHost.replace_url(path) {
            error!(error = %err, "could not replace history entry");
        }
    }
}

/// Writes one formatted event to the developer console at its level.
pub struct ConsoleWriter {
    level: tracing::Level,
    buffer: Vec<u8>,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        let text = String::from_utf8_lossy(&self.buffer);
        let message = JsValue::from_str(text.trim_end());
        match self.level {
            tracing::Level::ERROR => web_sys::console::error_1(&message),
            tracing::Level::WARN => web_sys::console::warn_1(&message),
            tracing::Level::INFO => web_sys::console::info_1(&message),
            _ => web_sys::console::debug_1(&message),
        }
    }
}

/// [`MakeWriter`] for [`ConsoleWriter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleMakeWriter;

impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter {
            level: tracing::Level::INFO,
            buffer: Vec::new(),
        }
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        ConsoleWriter {
            level: *meta.level(),
            buffer: Vec::new(),
        }
    }
}

/// Mounts [`App`] to `<body>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeptosShell;

impl Shell for LeptosShell {
    fn mount(&self, context: AppContext) {
        leptos::mount::mount_to_body(move || view! { <App context=context/> });
    }
}

fn build_context(config: &AppConfig) -> Result<AppContext, StartupError> {
    let client = OidcIdentityClient::new(
        config.identity.clone(),
        Arc::new(SessionStorage),
        Arc::new(BrowserHost),
    )
    .map_err(|e| StartupError::Configuration {
        details: e.to_string(),
    })?;
    let tokens = TokenProvider::new(Arc::new(client), &config.identity);

    let router = Router::new(NavigationGuard::new(tokens.clone()), Arc::new(BrowserHistory));

    let transport = ReqwestTransport::new(&config.api).map_err(|e| StartupError::Configuration {
        details: e.to_string(),
    })?;
    let gateway = RequestGateway::new(Arc::new(transport), Arc::new(tokens.clone()));

    Ok(AppContext {
        tokens,
        router,
        questions: QuestionsApi::new(gateway),
        redirect_error: None,
    })
}

fn listen_for_pops(router: Router) -> Result<(), StartupError> {
    let on_pop = Closure::<dyn FnMut(web_sys::Event)>::new(move |_: web_sys::Event| {
        let router = router.clone();
        spawn_local(async move {
            router.handle_pop().await;
        });
    });

    window()
        .map_err(|e| StartupError::Browser {
            details: e.to_string(),
        })?
        .add_event_listener_with_callback("popstate", on_pop.as_ref().unchecked_ref())
        .map_err(|e| StartupError::Browser {
            details: format!("popstate listener: {e:?}"),
        })?;

    // Lives as long as the page.
    on_pop.forget();
    Ok(())
}

/// Entry point: configures logging and runs the startup sequence.
pub fn start() {
    console_error_panic_hook::set_once();
    let _ = leptos::task::Executor::init_wasm_bindgen();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            web_sys::console::error_1(&JsValue::from_str(&format!(
                "invalid configuration: {err}"
            )));
            return;
        }
    };
    crate::logging::init(&config.log_filter, ConsoleMakeWriter);

    let context = match build_context(&config) {
        Ok(context) => context,
        Err(err) => {
            error!(error = %err, "startup failed");
            return;
        }
    };

    if let Err(err) = listen_for_pops(context.router.clone()) {
        error!(error = %err, "back/forward navigation will not be guarded");
    }

    spawn_local(async move {
        match Bootstrap::new(context).run(&LeptosShell).await {
            Ok(outcome) => info!(
                fresh_login = outcome.fresh_login,
                initial_navigation = ?outcome.initial_navigation,
                "started"
            ),
            Err(err) => error!(error = %err, "startup failed"),
        }
    });
}
