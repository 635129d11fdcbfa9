//! Typed client for the questions API.

use kcloft_core::Result;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::ApiError;
use crate::gateway::RequestGateway;
use crate::transport::ApiRequest;

/// Page size used when the caller does not pick one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

const QUESTIONS_PATH: &str = "/questions/";

/// Fields shared by stored and new questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuestion {
    pub question_text: String,
    pub choice_a: String,
    pub choice_b: String,
    pub choice_c: Option<String>,
    pub choice_d: Option<String>,
    /// Letter of the correct choice.
    pub correct_answer: String,
    pub explanation: Option<String>,
    /// Comma-separated tags.
    pub tags: Option<String>,
}

/// A stored multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Server-assigned ID.
    pub id: i64,
    #[serde(flatten)]
    pub content: NewQuestion,
}

impl Question {
    /// Returns the non-empty choices in order, labelled `A` to `D`.
    #[must_use]
    pub fn choices(&self) -> Vec<(char, &str)> {
        let c = &self.content;
        [
            ('A', Some(c.choice_a.as_str())),
            ('B', Some(c.choice_b.as_str())),
            ('C', c.choice_c.as_deref()),
            ('D', c.choice_d.as_deref()),
        ]
        .into_iter()
        .filter_map(|(label, text)| text.filter(|t| !t.is_empty()).map(|t| (label, t)))
        .collect()
    }

    /// Returns the tags as a list.
    #[must_use]
    pub fn tags(&self) -> Vec<&str> {
        self.content
            .tags
            .as_deref()
            .map(|tags| {
                tags.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Questions endpoints.
#[derive(Clone)]
pub struct QuestionsApi {
    gateway: RequestGateway,
}

impl QuestionsApi {
    /// Creates the API over an authenticated gateway.
    #[must_use]
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    /// Lists questions, `limit` at a time starting after `skip`.
    #[instrument(skip(self))]
    pub async fn list(&self, skip: u32, limit: Option<u32>) -> Result<Vec<Question>, ApiError> {
        let request = ApiRequest::get(QUESTIONS_PATH)
            .with_query("skip", skip)
            .with_query("limit", limit.unwrap_or(DEFAULT_PAGE_SIZE));
        self.gateway.get_json(request).await
    }

    /// Creates a question and returns it with its assigned ID.
    #[instrument(skip(self, question))]
    pub async fn create(&self, question: &NewQuestion) -> Result<Question, ApiError> {
        self.gateway
            .post_json(ApiRequest::post(QUESTIONS_PATH), question)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::tests::{ScriptedTransport, SequenceTokens};
    use crate::transport::{ApiResponse, Method};

    fn sample() -> NewQuestion {
        NewQuestion {
            question_text: "Which service stores objects?".to_string(),
            choice_a: "Blob Storage".to_string(),
            choice_b: "Functions".to_string(),
            choice_c: Some("Event Grid".to_string()),
            choice_d: None,
            correct_answer: "A".to_string(),
            explanation: None,
            tags: Some("storage, basics".to_string()),
        }
    }

    #[tokio::test]
    async fn list_uses_default_page_size() {
        let body = serde_json::json!([{
            "id": 1,
            "question_text": "Which service stores objects?",
            "choice_a": "Blob Storage",
            "choice_b": "Functions",
            "choice_c": null,
            "choice_d": null,
            "correct_answer": "A",
            "explanation": null,
            "tags": null,
        }]);
        let transport = ScriptedTransport::new([Ok(ApiResponse::new(200, body.to_string()))]);
        let api = QuestionsApi::new(RequestGateway::new(
            transport.clone(),
            SequenceTokens::new([Some("t")]),
        ));

        let questions = api.list(0, None).await.unwrap();

        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].id, 1);
        assert_eq!(questions[0].choices().len(), 2);

        let sent = transport.sent();
        assert_eq!(sent[0].method(), Method::Get);
        assert_eq!(sent[0].path(), "/questions/");
        assert_eq!(
            sent[0].query(),
            &[
                ("skip".to_string(), "0".to_string()),
                ("limit".to_string(), "10".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn create_posts_question_body() {
        let mut created = serde_json::to_value(sample()).unwrap();
        created["id"] = serde_json::json!(42);
        let transport = ScriptedTransport::new([Ok(ApiResponse::new(200, created.to_string()))]);
        let api = QuestionsApi::new(RequestGateway::new(
            transport.clone(),
            SequenceTokens::new([Some("t")]),
        ));

        let question = api.create(&sample()).await.unwrap();

        assert_eq!(question.id, 42);
        assert_eq!(question.content, sample());
        assert_eq!(question.tags(), vec!["storage", "basics"]);

        let sent = transport.sent();
        assert_eq!(sent[0].method(), Method::Post);
        let body: NewQuestion = serde_json::from_str(sent[0].body().unwrap()).unwrap();
        assert_eq!(body, sample());
    }
}
