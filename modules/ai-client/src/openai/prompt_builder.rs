use async_trait::async_trait;

use crate::error::AiError;
use crate::traits::PromptBuilder;

use super::types::*;
use super::OpenAi;

pub struct OpenAiPromptBuilder {
    agent: OpenAi,
    input: String,
    preamble: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    top_p: Option<f32>,
    json_object: bool,
}

impl OpenAiPromptBuilder {
    pub(crate) fn new(agent: OpenAi, input: String) -> Self {
        Self {
            agent,
            input,
            preamble: None,
            temperature: None,
            max_tokens: None,
            top_p: None,
            json_object: false,
        }
    }

    pub(crate) fn build_request(&self) -> ChatRequest {
        let mut messages = Vec::new();

        if let Some(ref preamble) = self.preamble {
            messages.push(WireMessage::system(preamble));
        }

        if !self.input.is_empty() {
            messages.push(WireMessage::user(&self.input));
        }

        let mut request = ChatRequest::new(&self.agent.model).messages(messages);

        if let Some(temp) = self.temperature {
            request = request.temperature(temp);
        }
        if let Some(max) = self.max_tokens {
            request = request.max_tokens(max);
        }
        if let Some(top_p) = self.top_p {
            request = request.top_p(top_p);
        }
        if self.json_object {
            request = request.json_object();
        }

        request
    }
}

#[async_trait]
impl PromptBuilder for OpenAiPromptBuilder {
    fn preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }

    fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    fn json_object(mut self) -> Self {
        self.json_object = true;
        self
    }

    async fn send(self) -> Result<String, AiError> {
        let request = self.build_request();
        self.agent.client().chat(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_sampling_parameters() {
        let agent = OpenAi::groq("gsk-test", "llama-3.1-8b-instant");
        let request = agent
            .prompt("classify this")
            .temperature(0.1)
            .max_tokens(400)
            .top_p(1.0)
            .build_request();

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama-3.1-8b-instant");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "classify this");
        assert_eq!(json["max_tokens"], 400);
        assert_eq!(json["stream"], false);
        assert!(json["stop"].is_null());
        assert!(json.get("response_format").is_none());
    }

    #[test]
    fn json_object_sets_response_format() {
        let agent = OpenAi::groq("gsk-test", "llama-3.1-8b-instant");
        let request = agent.prompt("x").json_object().build_request();
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
    }

    #[test]
    fn preamble_precedes_user_input() {
        let agent = OpenAi::new("sk-test", "gpt-4o");
        let request = agent.prompt("hi").preamble("be terse").build_request();
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[1].role, Role::User);
    }
}
