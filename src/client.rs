use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response, header};
use url::Url;

use crate::client_logger::ClientLogger;
use crate::completion::{BufferedReply, Completion, CompletionService, Fragment, FragmentStream};
use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::sse::process_sse;
use crate::types::{ChatCompletion, ChatCompletionParams, ErrorResponse, Message};

/// Default service root.
pub const DEFAULT_BASE_URL: &str = "https://api.airefinery.accenture.com/";
/// Default model.
pub const DEFAULT_MODEL: &str = "meta-llama/Llama-4-Maverick-17B-128E-Instruct";
/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "AIR_API_KEY";

const CHAT_COMPLETIONS_PATH: &str = "inference/chat/completions";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for an OpenAI-compatible chat completions service.
#[derive(Clone)]
pub struct Refinery {
    api_key: String,
    client: ReqwestClient,
    endpoint: Url,
    model: String,
    timeout: Duration,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl std::fmt::Debug for Refinery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Refinery")
            .field("endpoint", &self.endpoint.as_str())
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Refinery {
    /// Create a new client against the default service.
    ///
    /// The API key can be provided directly or read from the AIR_API_KEY
    /// environment variable.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_options(api_key, None, None, None)
    }

    /// Create a new client with custom settings.
    ///
    /// `base_url` is the service root; the chat completions path is appended
    /// to it.  A missing trailing slash is tolerated.
    pub fn with_options(
        api_key: Option<String>,
        base_url: Option<String>,
        model: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = match api_key {
            Some(key) if !key.trim().is_empty() => key,
            _ => std::env::var(API_KEY_ENV)
                .ok()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| {
                    Error::configuration(
                        "API key not provided and AIR_API_KEY environment variable not set",
                    )
                })?,
        };
        // Reject keys that cannot travel in a header now, not on first use.
        HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| Error::configuration("API key contains invalid header characters"))?;

        let mut base = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !base.ends_with('/') {
            base.push('/');
        }
        let endpoint = Url::parse(&base)?.join(CHAT_COMPLETIONS_PATH)?;

        let client = ReqwestClient::builder().build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {e}"),
                Some(Box::new(e)),
            )
        })?;

        Ok(Self {
            api_key,
            client,
            endpoint,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout: timeout.unwrap_or(DEFAULT_TIMEOUT),
            logger: None,
        })
    }

    /// Attach a logger that sees every response and streamed chunk.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The model requested on every call.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The full chat completions URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The default timeout used by [`Refinery::send`] and [`Refinery::stream`].
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| Error::configuration("API key contains invalid header characters"))?;
        headers.insert(header::AUTHORIZATION, bearer);
        Ok(headers)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };

        let parsed = serde_json::from_str::<ErrorResponse>(&error_body).ok();
        let error_type = parsed.as_ref().and_then(|e| e.error.error_type.clone());
        let error_message = parsed
            .and_then(|e| e.error.message)
            .unwrap_or(error_body);

        match status_code {
            400 | 422 => Error::bad_request(error_message),
            401 => Error::authentication(error_message),
            403 => Error::permission(error_message),
            404 => Error::not_found(error_message),
            408 => Error::timeout(error_message, None),
            429 => Error::rate_limit(error_message, retry_after),
            500..=599 => Error::server(status_code, error_message),
            _ => Error::api(status_code, error_type, error_message),
        }
    }

    async fn execute(&self, request: RequestBuilder, timeout: Duration) -> Result<Response> {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let response = request.send().await.map_err(|e| {
            CLIENT_REQUEST_ERRORS.click();
            if e.is_timeout() {
                Error::timeout(
                    format!("Request timed out: {e}"),
                    Some(timeout.as_secs_f64()),
                )
            } else if e.is_connect() {
                Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
            } else {
                Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
            }
        })?;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }
        Ok(response)
    }

    /// Send the conversation and wait for the whole reply.
    pub async fn send(&self, messages: &[Message], timeout: Duration) -> Result<ChatCompletion> {
        let params = ChatCompletionParams::new(self.model.clone(), messages.to_vec());
        let request = self
            .client
            .post(self.endpoint.clone())
            .headers(self.default_headers()?)
            .timeout(timeout)
            .json(&params);
        let response = self.execute(request, timeout).await?;

        let completion = response.json::<ChatCompletion>().await.map_err(|e| {
            if e.is_timeout() {
                Error::timeout(
                    format!("Timed out reading response: {e}"),
                    Some(timeout.as_secs_f64()),
                )
            } else {
                Error::serialization(format!("Failed to parse response: {e}"), Some(Box::new(e)))
            }
        })?;
        if let Some(logger) = &self.logger {
            logger.log_response(&completion);
        }
        Ok(completion)
    }

    /// Send the conversation and stream the reply as fragments.
    ///
    /// `timeout` bounds connection setup and the arrival of response headers;
    /// waits between fragments are bounded by the caller.
    pub async fn stream(
        &self,
        messages: &[Message],
        timeout: Duration,
    ) -> Result<FragmentStream> {
        let params = ChatCompletionParams::new(self.model.clone(), messages.to_vec())
            .with_stream(true);

        let mut headers = self.default_headers()?;
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );

        let request = self
            .client
            .post(self.endpoint.clone())
            .headers(headers)
            .json(&params);
        let response = tokio::time::timeout(timeout, self.execute(request, timeout))
            .await
            .map_err(|_| {
                CLIENT_REQUEST_ERRORS.click();
                Error::timeout(
                    "No response headers before the timeout",
                    Some(timeout.as_secs_f64()),
                )
            })??;

        let logger = self.logger.clone();
        let fragments = process_sse(response.bytes_stream()).map(move |chunk| -> Result<Fragment> {
            let chunk = chunk?;
            if let Some(logger) = &logger {
                logger.log_stream_chunk(&chunk);
            }
            Ok(Fragment {
                content: chunk.content().map(str::to_string),
            })
        });
        Ok(Box::pin(fragments))
    }
}

#[async_trait::async_trait]
impl CompletionService for Refinery {
    async fn complete(
        &self,
        history: &[Message],
        streaming: bool,
        timeout: Duration,
    ) -> Result<Completion> {
        if streaming {
            Ok(Completion::Streamed(self.stream(history, timeout).await?))
        } else {
            let completion = self.send(history, timeout).await?;
            Ok(Completion::Buffered(BufferedReply::new(
                completion.text().map(str::to_string),
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client = Refinery::new(Some("test-key".to_string())).unwrap();
        assert_eq!(client.api_key, "test-key");
        assert_eq!(
            client.endpoint.as_str(),
            "https://api.airefinery.accenture.com/inference/chat/completions"
        );
        assert_eq!(client.model(), DEFAULT_MODEL);
        assert_eq!(client.timeout(), DEFAULT_TIMEOUT);

        let client = Refinery::with_options(
            Some("test-key".to_string()),
            Some("http://localhost:8080/v1".to_string()),
            Some("tiny".to_string()),
            Some(Duration::from_secs(30)),
        )
        .unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "http://localhost:8080/v1/inference/chat/completions"
        );
        assert_eq!(client.model(), "tiny");
        assert_eq!(client.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn invalid_base_url_is_a_configuration_fault() {
        let err = Refinery::with_options(
            Some("test-key".to_string()),
            Some("not a url".to_string()),
            None,
            None,
        )
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn invalid_key_is_rejected() {
        let err = Refinery::new(Some("bad\nkey".to_string())).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn debug_hides_key() {
        let client = Refinery::new(Some("secret-key".to_string())).unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("inference/chat/completions"));
    }
}
