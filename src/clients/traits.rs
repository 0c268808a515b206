use async_trait::async_trait;

use crate::credentials::Credential;
use crate::error::Result;

/// A text-completion service reachable with a single instruction.
///
/// Implementations perform exactly one request per call and never retry;
/// failures surface as `WizardError::Service` (transport or non-success
/// status) or `WizardError::Format` (success body without completion text).
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, credential: &Credential, instruction: &str) -> Result<String>;
}
