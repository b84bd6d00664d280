pub mod gemini;
pub mod openai;

pub use gemini::GeminiProvider;
pub use openai::OpenAiCompatibleProvider;

use crate::error::{PipelineError, ProviderError};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Parses `endpoint` as an http(s) base URL without a trailing slash.
pub(crate) fn parse_endpoint(endpoint: &str) -> Result<Url, PipelineError> {
    let trimmed = endpoint.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed).map_err(|error| {
        PipelineError::InvalidArgument(format!("invalid endpoint {endpoint:?}: {error}"))
    })?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.cannot_be_a_base() {
        return Err(PipelineError::InvalidArgument(format!(
            "endpoint {endpoint:?} must be an http(s) URL"
        )));
    }
    Ok(parsed)
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client, PipelineError> {
    Client::builder().timeout(timeout).build().map_err(|error| {
        PipelineError::InvalidArgument(format!("failed to build http client: {error}"))
    })
}

/// Sends a JSON request and decodes the JSON body of a successful response.
pub(crate) async fn send_json(
    provider: &str,
    request: RequestBuilder,
    body: &Value,
) -> Result<Value, ProviderError> {
    let response = request.json(body).send().await?;
    let status = response.status();

    if !status.is_success() {
        let details = response.text().await.unwrap_or_default();
        debug!(provider, %status, details = %details, "completion request rejected");
        return Err(ProviderError::from_status(status));
    }

    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|error| {
        ProviderError::MalformedResponse(format!("{provider} returned invalid json: {error}"))
    })
}

/// Joins the `text` fields found under `pointer` (an array of objects).
pub(crate) fn join_text_parts(body: &Value, pointer: &str) -> Option<String> {
    let parts = body.pointer(pointer)?.as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    Some(text)
}

#[cfg(test)]
pub(crate) mod test_server {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves one canned HTTP response on a loopback port and hands back
    /// the raw request it received.
    pub async fn serve_once(status_line: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("loopback listener should bind");
        let address = listener.local_addr().expect("listener has an address");
        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("client should connect");
            let request = read_request(&mut socket).await;
            socket
                .write_all(response.as_bytes())
                .await
                .expect("response should be written");
            socket.shutdown().await.ok();
            request
        });

        (format!("http://{address}"), handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let read = socket.read(&mut chunk).await.expect("request should be readable");
            if read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..read]);
            if request_complete(&buffer) {
                break;
            }
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }

    fn request_complete(buffer: &[u8]) -> bool {
        let text = String::from_utf8_lossy(buffer);
        let Some((head, body)) = text.split_once("\r\n\r\n") else {
            return false;
        };
        let length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        body.len() >= length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoint_must_be_http() {
        assert!(parse_endpoint("https://api.example.com/v1/").is_ok());
        assert!(matches!(
            parse_endpoint("ftp://api.example.com"),
            Err(PipelineError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_endpoint("not a url"),
            Err(PipelineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn trailing_slash_is_dropped() {
        let url = parse_endpoint("https://api.example.com/v1/").expect("valid url");
        assert_eq!(url.as_str(), "https://api.example.com/v1");
    }

    #[test]
    fn text_parts_are_joined() {
        let body = json!({"parts": [{"text": "Rewritten: a"}, {"text": "\nImprovements: b"}]});
        assert_eq!(
            join_text_parts(&body, "/parts").as_deref(),
            Some("Rewritten: a\nImprovements: b")
        );
        assert_eq!(join_text_parts(&body, "/missing"), None);
    }
}
