use async_trait::async_trait;

use crate::error::AiError;

// =============================================================================
// PromptBuilder Trait
// =============================================================================

/// Single-shot completion request. `send` returns the first choice's text.
#[async_trait]
pub trait PromptBuilder: Send + Sized {
    fn preamble(self, preamble: impl Into<String>) -> Self;
    fn temperature(self, temperature: f32) -> Self;
    fn max_tokens(self, max_tokens: u32) -> Self;
    fn top_p(self, top_p: f32) -> Self;
    /// Ask the provider to constrain output to a single JSON object.
    fn json_object(self) -> Self;
    async fn send(self) -> Result<String, AiError>;
}
