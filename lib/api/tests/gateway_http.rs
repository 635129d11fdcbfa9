//! Gateway tests over real HTTP against a wiremock API server.

use std::sync::Arc;

use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use kcloft_api::{ApiConfig, ApiRequest, QuestionsApi, RequestGateway, ReqwestTransport};
use kcloft_identity::test_utils::FakeIdentityClient;
use kcloft_identity::{Account, AccountId, IdentityConfig, TokenProvider};

fn identity_config() -> IdentityConfig {
    IdentityConfig::new(
        "client-id".to_string(),
        "https://login.example.com/tenant/v2.0".to_string(),
        "http://localhost:5173/".to_string(),
    )
}

fn signed_in_client(token: &str) -> Arc<FakeIdentityClient> {
    Arc::new(
        FakeIdentityClient::new()
            .with_accounts(vec![Account::new(
                AccountId::new("oid.tid"),
                "login.example.com",
            )])
            .with_silent_token(token),
    )
}

fn gateway(server: &MockServer, provider: TokenProvider) -> RequestGateway {
    let transport = ReqwestTransport::new(&ApiConfig::new(server.uri())).unwrap();
    RequestGateway::new(Arc::new(transport), Arc::new(provider))
}

fn question_json(id: i64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "question_text": "What does PKCE protect?",
        "choice_a": "The authorization code",
        "choice_b": "The refresh token",
        "choice_c": null,
        "choice_d": null,
        "correct_answer": "A",
        "explanation": null,
        "tags": "oauth",
    })
}

#[tokio::test]
async fn list_sends_bearer_token_and_pagination() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/questions/"))
        .and(query_param("skip", "20"))
        .and(query_param("limit", "5"))
        .and(header("authorization", "Bearer token-1"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([question_json(21)])))
        .expect(1)
        .mount(&server)
        .await;

    let provider = TokenProvider::new(signed_in_client("token-1"), &identity_config());
    let api = QuestionsApi::new(gateway(&server, provider));

    let questions = api.list(20, Some(5)).await.unwrap();

    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].id, 21);
}

#[tokio::test]
async fn unauthenticated_request_still_reaches_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/questions/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    // No accounts: the provider has no token, so neither attempt is authenticated.
    let provider = TokenProvider::new(Arc::new(FakeIdentityClient::new()), &identity_config());
    let api = QuestionsApi::new(gateway(&server, provider));

    let err = api.list(0, None).await.unwrap_err();
    assert!(err.to_string().contains("401"));

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(!received[0].headers.contains_key("authorization"));
}

/// Answers 401 to the first request and 200 afterwards.
struct RejectFirst {
    seen: std::sync::atomic::AtomicUsize,
}

impl Respond for RejectFirst {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        if self.seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
            ResponseTemplate::new(401)
        } else {
            ResponseTemplate::new(200).set_body_json(question_json(7))
        }
    }
}

#[tokio::test]
async fn unauthorized_create_is_resubmitted_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/questions/"))
        .and(header_exists("authorization"))
        .respond_with(RejectFirst {
            seen: std::sync::atomic::AtomicUsize::new(0),
        })
        .expect(2)
        .mount(&server)
        .await;

    let client = signed_in_client("token-1");
    let provider = TokenProvider::new(client.clone(), &identity_config());
    let api = QuestionsApi::new(gateway(&server, provider));

    let new_question: kcloft_api::NewQuestion =
        serde_json::from_value(question_json(0)).unwrap();
    let created = api.create(&new_question).await.unwrap();

    assert_eq!(created.id, 7);
    // Token acquired once for the first attempt and again for the retry.
    assert_eq!(client.silent_requests().len(), 2);

    let received = server.received_requests().await.unwrap();
    assert_eq!(received[0].body, received[1].body);
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    // Nothing listens on a port once its listener is dropped.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let uri = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let transport = ReqwestTransport::new(&ApiConfig::new(uri)).unwrap();
    let provider = TokenProvider::new(signed_in_client("t"), &identity_config());
    let gateway = RequestGateway::new(Arc::new(transport), Arc::new(provider));

    let err = gateway
        .send(ApiRequest::get("/questions/"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("request failed"));
}
