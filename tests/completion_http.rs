//! OpenAiClient against a local mock endpoint.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};

use docwizard::clients::{CompletionClient, OpenAiClient};
use docwizard::credentials::{Credential, MemoryCredentialStore};
use docwizard::error::{GENERIC_SERVICE_ERROR, WizardError};
use docwizard::{Step, Transition, WizardSession};

#[derive(Clone, Default)]
struct Captured {
    requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

#[derive(Clone)]
struct Reply {
    captured: Captured,
    status: StatusCode,
    body: &'static str,
}

async fn chat_completions(
    State(reply): State<Reply>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], &'static str) {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    reply.captured.requests.lock().unwrap().push((auth, request));
    (
        reply.status,
        [(header::CONTENT_TYPE, "application/json")],
        reply.body,
    )
}

/// Serve one canned reply on an ephemeral port; returns the endpoint URL.
async fn spawn_endpoint(status: StatusCode, body: &'static str) -> (String, Captured) {
    let captured = Captured::default();
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(Reply {
            captured: captured.clone(),
            status,
            body,
        });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/v1/chat/completions", addr), captured)
}

fn credential() -> Credential {
    Credential::new("sk-test").unwrap()
}

#[tokio::test]
async fn test_success_returns_raw_content() {
    let (endpoint, captured) = spawn_endpoint(
        StatusCode::OK,
        r#"{"choices":[{"message":{"role":"assistant","content":"```json\n[]\n```"}}]}"#,
    )
    .await;
    let client = OpenAiClient::new(endpoint, "gpt-4o").unwrap();

    let content = client.complete(&credential(), "list the fields").await.unwrap();
    assert_eq!(content, "```json\n[]\n```");

    let requests = captured.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let (auth, body) = &requests[0];
    assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
    assert_eq!(
        body,
        &json!({
            "model": "gpt-4o",
            "messages": [{"role": "user", "content": "list the fields"}]
        })
    );
}

#[tokio::test]
async fn test_error_status_surfaces_service_message() {
    let (endpoint, _) = spawn_endpoint(
        StatusCode::UNAUTHORIZED,
        r#"{"error":{"message":"invalid_api_key","type":"invalid_request_error"}}"#,
    )
    .await;
    let client = OpenAiClient::new(endpoint, "gpt-4o").unwrap();

    let err = client.complete(&credential(), "x").await.unwrap_err();
    assert_eq!(err, WizardError::service("invalid_api_key"));
    assert_eq!(err.to_string(), "invalid_api_key");
}

#[tokio::test]
async fn test_error_status_without_detail_is_generic() {
    let (endpoint, _) = spawn_endpoint(StatusCode::INTERNAL_SERVER_ERROR, "").await;
    let client = OpenAiClient::new(endpoint, "gpt-4o").unwrap();

    let err = client.complete(&credential(), "x").await.unwrap_err();
    assert_eq!(err, WizardError::service(GENERIC_SERVICE_ERROR));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_generic_service_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = OpenAiClient::new(format!("http://{}/v1/chat/completions", addr), "gpt-4o").unwrap();

    let err = client.complete(&credential(), "x").await.unwrap_err();
    assert_eq!(err, WizardError::service(GENERIC_SERVICE_ERROR));
}

#[tokio::test]
async fn test_missing_choices_is_format_error() {
    let (endpoint, _) = spawn_endpoint(StatusCode::OK, r#"{"id":"cmpl-1","choices":[]}"#).await;
    let client = OpenAiClient::new(endpoint, "gpt-4o").unwrap();

    let err = client.complete(&credential(), "x").await.unwrap_err();
    assert!(matches!(err, WizardError::Format { .. }));
}

#[tokio::test]
async fn test_rejected_key_keeps_wizard_on_description() {
    let (endpoint, captured) = spawn_endpoint(
        StatusCode::UNAUTHORIZED,
        r#"{"error":{"message":"invalid_api_key"}}"#,
    )
    .await;
    let client = OpenAiClient::new(endpoint, "gpt-4o").unwrap();
    let store = MemoryCredentialStore::with_credential(credential());
    let mut session = WizardSession::new(Arc::new(client), Arc::new(store));

    session.set_document_prompt("Invoice for client X");
    let outcome = session.submit_description().await;

    assert_eq!(
        outcome,
        Transition::Failed {
            step: Step::Description,
            message: "invalid_api_key".to_string()
        }
    );
    assert_eq!(session.state().error_message(), Some("invalid_api_key"));
    assert!(!session.state().is_busy());
    assert_eq!(captured.requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_fenced_html_reaches_result_step() {
    let (endpoint, _) = spawn_endpoint(
        StatusCode::OK,
        r#"{"choices":[{"message":{"content":"```json\n[{\"name\":\"Client\",\"type\":\"text\"}]\n```"}}]}"#,
    )
    .await;
    let (doc_endpoint, _) = spawn_endpoint(
        StatusCode::OK,
        r#"{"choices":[{"message":{"content":"```html\n<h1>Invoice</h1>\n```"}}]}"#,
    )
    .await;
    let store = Arc::new(MemoryCredentialStore::with_credential(credential()));

    let mut session = WizardSession::new(
        Arc::new(OpenAiClient::new(endpoint, "gpt-4o").unwrap()),
        store.clone(),
    );
    session.set_document_prompt("Invoice for client X");
    assert_eq!(
        session.submit_description().await,
        Transition::Advanced(Step::FormEntry)
    );

    let markup = docwizard::generators::generate_document(
        &OpenAiClient::new(doc_endpoint, "gpt-4o").unwrap(),
        session.credential(),
        session.state().document_prompt(),
        session.state().form_data(),
    )
    .await
    .unwrap();
    assert_eq!(markup, "<h1>Invoice</h1>");
}
