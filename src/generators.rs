//! Field-schema and document generation against a completion service.
//!
//! Both are checked sequences: preconditions, instruction, one completion
//! call, normalization. The first failing step's error is returned as-is.

use crate::clients::CompletionClient;
use crate::credentials::Credential;
use crate::error::{Result, WizardError};
use crate::normalize::{FenceKind, parse_field_schema, strip_fence};
use crate::prompts::{DOCUMENT_PROMPT, FIELD_SCHEMA_PROMPT, document_instruction, field_schema_instruction};
use crate::schemas::{FieldSchema, FormData};

/// Ask the completion service which fields `document_prompt` needs.
///
/// Fails without a network call when the credential is missing or the
/// prompt is blank.
pub async fn generate_fields(
    client: &dyn CompletionClient,
    credential: Option<&Credential>,
    document_prompt: &str,
) -> Result<FieldSchema> {
    let credential = credential.ok_or(WizardError::MissingCredential)?;
    if document_prompt.trim().is_empty() {
        return Err(WizardError::empty_input("document description"));
    }

    let instruction = field_schema_instruction(document_prompt);
    tracing::debug!(
        prompt_id = FIELD_SCHEMA_PROMPT.id,
        prompt = FIELD_SCHEMA_PROMPT.one_liner,
        chars = instruction.len(),
        "requesting field schema"
    );

    let raw = client.complete(credential, &instruction).await?;
    let schema = parse_field_schema(&strip_fence(&raw, FenceKind::Json))?;

    tracing::info!(fields = schema.len(), "field schema generated");
    Ok(schema)
}

/// Ask the completion service for the finished document markup.
///
/// A blank `document_prompt` is passed through; only the credential is
/// checked up front.
pub async fn generate_document(
    client: &dyn CompletionClient,
    credential: Option<&Credential>,
    document_prompt: &str,
    form_data: &FormData,
) -> Result<String> {
    let credential = credential.ok_or(WizardError::MissingCredential)?;

    let instruction = document_instruction(document_prompt, form_data);
    tracing::debug!(
        prompt_id = DOCUMENT_PROMPT.id,
        prompt = DOCUMENT_PROMPT.one_liner,
        chars = instruction.len(),
        "requesting document"
    );

    let raw = client.complete(credential, &instruction).await?;
    let markup = strip_fence(&raw, FenceKind::Html);

    tracing::info!(chars = markup.len(), "document generated");
    Ok(markup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with a fixed result and records every instruction it sees
    struct CannedClient {
        reply: Result<String>,
        seen: Mutex<Vec<String>>,
    }

    impl CannedClient {
        fn new(reply: Result<String>) -> Self {
            Self {
                reply,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionClient for CannedClient {
        async fn complete(&self, _credential: &Credential, instruction: &str) -> Result<String> {
            self.seen.lock().unwrap().push(instruction.to_string());
            self.reply.clone()
        }
    }

    fn cred() -> Credential {
        Credential::new("sk-test").unwrap()
    }

    #[tokio::test]
    async fn fields_without_credential_never_call_service() {
        let client = CannedClient::new(Ok("[]".into()));
        let err = generate_fields(&client, None, "Invoice").await.unwrap_err();
        assert_eq!(err, WizardError::MissingCredential);
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn blank_prompt_never_calls_service() {
        let client = CannedClient::new(Ok("[]".into()));
        let err = generate_fields(&client, Some(&cred()), " \t\n").await.unwrap_err();
        assert!(matches!(err, WizardError::EmptyInput { .. }));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn service_error_passes_through_unchanged() {
        let client = CannedClient::new(Err(WizardError::service("invalid_api_key")));
        let err = generate_fields(&client, Some(&cred()), "Invoice").await.unwrap_err();
        assert_eq!(err, WizardError::service("invalid_api_key"));
    }

    #[tokio::test]
    async fn non_array_reply_is_format_error() {
        let client = CannedClient::new(Ok("```json\n{\"name\":\"Client\"}\n```".into()));
        let err = generate_fields(&client, Some(&cred()), "Invoice").await.unwrap_err();
        assert!(matches!(err, WizardError::Format { .. }));
    }

    #[tokio::test]
    async fn document_accepts_blank_prompt() {
        let client = CannedClient::new(Ok("<p>ok</p>".into()));
        let markup = generate_document(&client, Some(&cred()), "", &FormData::new())
            .await
            .unwrap();
        assert_eq!(markup, "<p>ok</p>");
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn document_without_credential_never_calls_service() {
        let client = CannedClient::new(Ok("<p>ok</p>".into()));
        let err = generate_document(&client, None, "Invoice", &FormData::new())
            .await
            .unwrap_err();
        assert_eq!(err, WizardError::MissingCredential);
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn document_instruction_carries_form_values() {
        let client = CannedClient::new(Ok("```html\n<h1>Invoice</h1>\n```".into()));
        let data: FormData = [("Client", "Acme")].into_iter().collect();
        let markup = generate_document(&client, Some(&cred()), "Invoice for client X", &data)
            .await
            .unwrap();
        assert_eq!(markup, "<h1>Invoice</h1>");
        let seen = client.seen.lock().unwrap();
        assert!(seen[0].contains("\"Client\": \"Acme\""));
    }
}
