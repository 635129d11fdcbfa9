//! Home page: a paged list of questions.

use kcloft_api::Question;
use kcloft_api::questions::DEFAULT_PAGE_SIZE;
use leptos::prelude::*;

use crate::bootstrap::AppContext;

/// The home page component.
#[component]
pub fn HomePage() -> impl IntoView {
    let context = expect_context::<AppContext>();
    let skip = RwSignal::new(0u32);

    let questions = LocalResource::new(move || {
        let api = context.questions.clone();
        let skip = skip.get();
        async move {
            api.list(skip, None).await.map_err(|err| {
                tracing::warn!(error = %err, "failed to load questions");
                "the question service did not answer".to_string()
            })
        }
    });

    let previous = move |_| skip.update(|s| *s = s.saturating_sub(DEFAULT_PAGE_SIZE));
    let next = move |_| skip.update(|s| *s += DEFAULT_PAGE_SIZE);

    view! {
        <div class="home-page">
            <h1>"Question bank"</h1>
            <Suspense fallback=move || view! { <p>"Loading..."</p> }>
                {move || {
                    questions.get().map(|result| match result {
                        Ok(questions) if questions.is_empty() => view! {
                            <p>"No questions yet."</p>
                        }.into_any(),
                        Ok(questions) => view! {
                            <ol class="questions">
                                {questions.into_iter().map(|q| view! { <QuestionCard question=q/> }).collect_view()}
                            </ol>
                        }.into_any(),
                        Err(message) => view! {
                            <p class="error">"Could not load questions: " {message}</p>
                        }.into_any(),
                    })
                }}
            </Suspense>
            <nav class="pager">
                <button on:click=previous disabled=move || skip.get() == 0>"Previous"</button>
                <button on:click=next>"Next"</button>
            </nav>
        </div>
    }
}

/// One question with its choices.
#[component]
fn QuestionCard(question: Question) -> impl IntoView {
    let tags = question.tags().join(", ");
    let choices = question
        .choices()
        .into_iter()
        .map(|(label, text)| view! { <li>{format!("{label}. {text}")}</li> })
        .collect_view();

    view! {
        <li class="question">
            <p class="question-text">{question.content.question_text.clone()}</p>
            <ul class="choices">{choices}</ul>
            {(!tags.is_empty()).then(|| view! { <p class="tags">{tags.clone()}</p> })}
        </li>
    }
}
