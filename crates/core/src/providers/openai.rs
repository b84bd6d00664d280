use super::{http_client, parse_endpoint, send_json, DEFAULT_REQUEST_TIMEOUT};
use crate::error::{PipelineError, ProviderError};
use crate::traits::{CompletionContext, CompletionProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4-turbo";

/// Adapter for any server exposing an OpenAI-style `/chat/completions`
/// route with bearer authentication.
pub struct OpenAiCompatibleProvider {
    request_url: Url,
    api_key: String,
    model: String,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, PipelineError> {
        Self::with_endpoint(OPENAI_ENDPOINT, api_key, model, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_endpoint(
        endpoint: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PipelineError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(PipelineError::InvalidArgument(
                "openai api key is empty".to_string(),
            ));
        }

        let base = parse_endpoint(endpoint)?;
        let request_url = Url::parse(&format!(
            "{}/chat/completions",
            base.as_str().trim_end_matches('/')
        ))
        .map_err(|error| PipelineError::InvalidArgument(error.to_string()))?;

        Ok(Self {
            request_url,
            api_key,
            model: model.into(),
            client: http_client(timeout)?,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, prompt: &str, context: &CompletionContext) -> Value {
        let mut messages = Vec::new();
        if let Some(system) = &context.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": prompt }));

        json!({
            "model": self.model,
            "messages": messages,
            "temperature": context.temperature,
            "max_tokens": context.max_output_tokens,
        })
    }
}

fn parse_response(body: &Value) -> Result<String, ProviderError> {
    let content = body
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ProviderError::MalformedResponse(
                "response has no choices[0].message.content".to_string(),
            )
        })?;
    if content.trim().is_empty() {
        return Err(ProviderError::MalformedResponse(
            "completion content is empty".to_string(),
        ));
    }
    Ok(content.to_string())
}

#[async_trait]
impl CompletionProvider for OpenAiCompatibleProvider {
    async fn complete(
        &self,
        prompt: &str,
        context: &CompletionContext,
    ) -> Result<String, ProviderError> {
        let request = self
            .client
            .post(self.request_url.clone())
            .bearer_auth(&self.api_key);

        let body = send_json(self.name(), request, &self.request_body(prompt, context)).await?;
        parse_response(&body)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::test_server::serve_once;

    fn provider(endpoint: &str) -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::with_endpoint(
            endpoint,
            "sk-test",
            "gpt-test",
            Duration::from_secs(5),
        )
        .expect("provider should build")
    }

    #[test]
    fn system_message_precedes_prompt() {
        let context = CompletionContext::default().with_system("Be concise.");
        let body = provider(OPENAI_ENDPOINT).request_body("Rewrite this", &context);

        assert_eq!(body["model"], "gpt-test");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Rewrite this");
    }

    #[test]
    fn choice_content_is_extracted() {
        let body = json!({"choices": [{"message": {"role": "assistant", "content": "done"}}]});
        assert_eq!(parse_response(&body), Ok("done".to_string()));
        assert!(matches!(
            parse_response(&json!({"choices": []})),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn bearer_token_is_sent() -> Result<(), Box<dyn std::error::Error>> {
        let body = r#"{"choices":[{"message":{"content":"Rewritten: x"}}]}"#;
        let (endpoint, server) = serve_once("200 OK", body).await;

        let text = provider(&endpoint)
            .complete("hello", &CompletionContext::default())
            .await?;
        let request = server.await?.to_ascii_lowercase();

        assert_eq!(text, "Rewritten: x");
        assert!(request.starts_with("post /chat/completions "));
        assert!(request.contains("authorization: bearer sk-test"));
        Ok(())
    }

    #[tokio::test]
    async fn auth_and_body_failures_are_mapped() -> Result<(), Box<dyn std::error::Error>> {
        let (endpoint, server) = serve_once("401 Unauthorized", "{}").await;
        let result = provider(&endpoint)
            .complete("hello", &CompletionContext::default())
            .await;
        server.await?;
        assert_eq!(result, Err(ProviderError::AuthFailed));

        let (endpoint, server) = serve_once("200 OK", "not json").await;
        let result = provider(&endpoint)
            .complete("hello", &CompletionContext::default())
            .await;
        server.await?;
        assert!(matches!(result, Err(ProviderError::MalformedResponse(_))));
        Ok(())
    }
}
