use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, warn};

use super::types::*;
use crate::error::AiError;

pub(crate) struct OpenAiClient {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: &str, base_url: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn headers(&self) -> Result<HeaderMap, AiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| AiError::Config(format!("invalid API key header: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// POST a chat request and return the first choice's content.
    pub async fn chat(&self, request: &ChatRequest) -> Result<String, AiError> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(model = %request.model, "Chat completion request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        let result = content_from_envelope(status, &body);
        if let Err(ref e) = result {
            warn!(status, error = %e, "Chat completion failed");
        }
        result
    }
}

/// Apply the envelope contract: non-OK status, an `error` member, or an
/// empty/absent `choices` array are all failures.
pub(crate) fn content_from_envelope(status: u16, body: &str) -> Result<String, AiError> {
    if !(200..300).contains(&status) {
        return Err(AiError::Api {
            status,
            message: body.to_string(),
        });
    }

    let envelope: ChatResponse = serde_json::from_str(body)
        .map_err(|e| AiError::Parse(format!("response body is not JSON: {e}")))?;

    if let Some(error) = envelope.error {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(AiError::Provider(message));
    }

    envelope
        .choices
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| AiError::EmptyResponse("no choices in response".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_envelope_yields_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"hello"}},{"message":{"role":"assistant","content":"second"}}]}"#;
        assert_eq!(content_from_envelope(200, body).unwrap(), "hello");
    }

    #[test]
    fn non_ok_status_is_api_error() {
        let err = content_from_envelope(429, "rate limited").unwrap_err();
        assert!(matches!(err, AiError::Api { status: 429, .. }));
    }

    #[test]
    fn error_member_fails_even_with_200() {
        let body = r#"{"error":{"message":"invalid model"}}"#;
        let err = content_from_envelope(200, body).unwrap_err();
        match err {
            AiError::Provider(msg) => assert_eq!(msg, "invalid model"),
            other => panic!("expected Provider error, got {other:?}"),
        }
    }

    #[test]
    fn empty_choices_is_failure() {
        let err = content_from_envelope(200, r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, AiError::EmptyResponse(_)));
    }

    #[test]
    fn missing_choices_is_failure() {
        let err = content_from_envelope(200, r#"{"id":"x"}"#).unwrap_err();
        assert!(matches!(err, AiError::EmptyResponse(_)));
    }

    #[test]
    fn non_json_body_is_parse_error() {
        let err = content_from_envelope(200, "<html>oops</html>").unwrap_err();
        assert!(matches!(err, AiError::Parse(_)));
    }
}
