//! Login page component.

use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::bootstrap::AppContext;

/// Login page. Starts the redirect to the identity provider.
#[component]
pub fn LoginPage() -> impl IntoView {
    let context = expect_context::<AppContext>();
    let error = RwSignal::new(
        context
            .redirect_error
            .as_ref()
            .map(|err| format!("Sign-in failed: {err}")),
    );

    let sign_in = move |_| {
        let tokens = context.tokens.clone();
        spawn_local(async move {
            if let Err(err) = tokens.login_redirect().await {
                tracing::warn!(error = %err, "could not start login");
                error.set(Some(err.to_string()));
            }
        });
    };

    view! {
        <div class="login-page">
            <div class="login-box">
                <h1>"Log in to KCLoft"</h1>
                <p>"Sign in with your organization account to practice questions."</p>
                <button class="login-button" on:click=sign_in>"Log in with Microsoft"</button>
                {move || error.get().map(|message| view! { <p class="error">{message}</p> })}
            </div>
        </div>
    }
}
