use super::{http_client, join_text_parts, parse_endpoint, send_json, DEFAULT_REQUEST_TIMEOUT};
use crate::error::{PipelineError, ProviderError};
use crate::traits::{CompletionContext, CompletionProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

pub const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Google Gemini `generateContent` adapter. The API key travels as the
/// `key` query parameter.
pub struct GeminiProvider {
    request_url: Url,
    api_key: String,
    model: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, PipelineError> {
        Self::with_endpoint(GEMINI_ENDPOINT, api_key, model, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_endpoint(
        endpoint: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PipelineError> {
        let api_key = api_key.into();
        let model = model.into();
        if api_key.trim().is_empty() {
            return Err(PipelineError::InvalidArgument(
                "gemini api key is empty".to_string(),
            ));
        }

        let base = parse_endpoint(endpoint)?;
        let request_url = Url::parse(&format!(
            "{}/models/{}:generateContent",
            base.as_str().trim_end_matches('/'),
            model
        ))
        .map_err(|error| {
            PipelineError::InvalidArgument(format!("invalid gemini model {model:?}: {error}"))
        })?;

        Ok(Self {
            request_url,
            api_key,
            model,
            client: http_client(timeout)?,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

fn request_body(prompt: &str, context: &CompletionContext) -> Value {
    let mut body = json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": prompt }],
        }],
        "generationConfig": {
            "temperature": context.temperature,
            "maxOutputTokens": context.max_output_tokens,
        },
    });
    if let Some(system) = &context.system {
        body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
    }
    body
}

fn parse_response(body: &Value) -> Result<String, ProviderError> {
    if let Some(reason) = body
        .pointer("/promptFeedback/blockReason")
        .and_then(Value::as_str)
    {
        return Err(ProviderError::MalformedResponse(format!(
            "gemini blocked the prompt: {reason}"
        )));
    }

    let text = join_text_parts(body, "/candidates/0/content/parts").ok_or_else(|| {
        ProviderError::MalformedResponse("gemini response has no candidate content".to_string())
    })?;
    if text.trim().is_empty() {
        return Err(ProviderError::MalformedResponse(
            "gemini returned an empty candidate".to_string(),
        ));
    }
    Ok(text)
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    async fn complete(
        &self,
        prompt: &str,
        context: &CompletionContext,
    ) -> Result<String, ProviderError> {
        let mut url = self.request_url.clone();
        url.query_pairs_mut().append_pair("key", &self.api_key);

        let body = send_json(
            self.name(),
            self.client.post(url),
            &request_body(prompt, context),
        )
        .await?;
        parse_response(&body)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
