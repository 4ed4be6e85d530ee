mod client;
pub mod prompt_builder;
pub(crate) mod types;

pub use prompt_builder::OpenAiPromptBuilder;

use client::OpenAiClient;

pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";
pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1";

// =============================================================================
// OpenAi Agent
// =============================================================================

/// Agent for any OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    pub(crate) model: String,
    base_url: String,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: OPENAI_API_URL.to_string(),
        }
    }

    /// Agent preconfigured for Groq's OpenAI-compatible endpoint.
    pub fn groq(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(api_key, model).with_base_url(GROQ_API_URL)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn client(&self) -> OpenAiClient {
        OpenAiClient::new(&self.api_key, &self.base_url)
    }

    /// Start a single-shot prompt with `input` as the user message.
    pub fn prompt(&self, input: impl Into<String>) -> OpenAiPromptBuilder {
        OpenAiPromptBuilder::new(self.clone(), input.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_new() {
        let ai = OpenAi::new("sk-test", "gpt-4o");
        assert_eq!(ai.model, "gpt-4o");
        assert_eq!(ai.api_key, "sk-test");
        assert_eq!(ai.base_url(), OPENAI_API_URL);
    }

    #[test]
    fn test_groq_uses_groq_endpoint() {
        let ai = OpenAi::groq("gsk-test", "llama-3.1-8b-instant");
        assert_eq!(ai.base_url(), GROQ_API_URL);
        assert_eq!(ai.model(), "llama-3.1-8b-instant");
    }

    #[test]
    fn test_openai_with_base_url() {
        let ai = OpenAi::new("sk-test", "gpt-4o").with_base_url("https://custom.api.com");
        assert_eq!(ai.base_url, "https://custom.api.com");
    }
}
