//! Language-model completion capability.

mod json;
mod openai;

use async_trait::async_trait;

use crate::error::ExtractError;

pub use json::first_json_object;
pub use openai::OpenAiClient;

/// A single structured-output completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
}

/// A chat-style completion API that returns the assistant's text.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ExtractError`] for transport failures and non-success statuses.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ExtractError>;
}
