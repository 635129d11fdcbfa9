//! Main Leptos application component.

use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_meta::{Title, provide_meta_context};

use crate::bootstrap::AppContext;
use crate::navigation::Route;
use crate::pages::{HomePage, LoginPage};

/// The main application component.
///
/// Renders nothing until the router commits a route, so a protected page
/// never flashes before the guard has run.
#[component]
pub fn App(context: AppContext) -> impl IntoView {
    provide_meta_context();
    provide_context(context.clone());

    let route = RwSignal::new(context.router.current_route());
    let mut changes = context.router.subscribe();
    spawn_local(async move {
        while changes.changed().await.is_ok() {
            let current = changes.borrow_and_update().as_ref().map(|l| l.route);
            if route.try_set(current).is_some() {
                // Component disposed.
                break;
            }
        }
    });

    view! {
        <Title text="KCLoft"/>
        <Header/>
        <main class="container">
            {move || match route.get() {
                Some(Route::Home) => view! { <HomePage/> }.into_any(),
                Some(Route::Login) => view! { <LoginPage/> }.into_any(),
                Some(Route::NotFound) => view! { <p>"Page not found."</p> }.into_any(),
                None => view! { <p class="loading">"Loading..."</p> }.into_any(),
            }}
        </main>
    }
}

/// Header with navigation and the signed-in account.
#[component]
fn Header() -> impl IntoView {
    let context = expect_context::<AppContext>();
    let account = LocalResource::new({
        let tokens = context.tokens.clone();
        move || {
            let tokens = tokens.clone();
            async move {
                tokens
                    .active_account()
                    .await
                    .ok()
                    .flatten()
                    .map(|a| a.display_label().to_string())
            }
        }
    });

    let router = context.router.clone();
    let go_home = move |ev: leptos::ev::MouseEvent| {
        ev.prevent_default();
        let router = router.clone();
        spawn_local(async move {
            router.push_route(Route::Home).await;
        });
    };

    let tokens = context.tokens.clone();
    let router = context.router.clone();
    let sign_out = move |_| {
        let tokens = tokens.clone();
        let router = router.clone();
        spawn_local(async move {
            if let Err(err) = tokens.logout().await {
                tracing::warn!(error = %err, "sign out failed");
            }
            account.refetch();
            router.push_route(Route::Login).await;
        });
    };

    view! {
        <header class="header">
            <div class="header-left">
                <a href="/" class="logo" on:click=go_home>"KCLoft"</a>
            </div>
            <div class="header-right">
                <Suspense fallback=move || view! { <span>"Loading..."</span> }>
                    {move || {
                        account.get().map(|label| match label {
                            Some(label) => view! {
                                <span class="user-name">{label}</span>
                                <button class="logout-button" on:click=sign_out.clone()>"Sign out"</button>
                            }.into_any(),
                            None => view! { <span class="user-name">"Not signed in"</span> }.into_any(),
                        })
                    }}
                </Suspense>
            </div>
        </header>
    }
}
