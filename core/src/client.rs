use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::config::TripAgentConfig;
use crate::errors::{TripAgentError, TripAgentResult};
use crate::types::*;

/// Operations offered by the Trip Agent backend.
///
/// The session lifecycle only talks to this trait, so tests and alternative
/// transports can stand in for [`TripAgentClient`].
#[async_trait]
pub trait TripApi: Send + Sync {
    /// `GET /health`
    async fn check_health(&self) -> TripAgentResult<HealthResponse>;

    /// `GET /`
    async fn get_api_info(&self) -> TripAgentResult<ApiInfo>;

    /// `POST /v1/final-response`
    async fn generate_final_response(
        &self,
        request: FinalResponseRequest,
    ) -> TripAgentResult<FinalResponseResponse>;

    /// `POST /v1/additional-info`
    async fn gather_additional_info(
        &self,
        request: AdditionalInfoRequest,
    ) -> TripAgentResult<AdditionalInfoResponse>;
}

/// HTTP client for the Trip Agent API
#[derive(Debug, Clone)]
pub struct TripAgentClient {
    client: Client,
    base_url: String,
}

impl TripAgentClient {
    /// Create a client for the base URL resolved from `config`.
    pub fn new(config: &TripAgentConfig) -> TripAgentResult<Self> {
        Self::with_base_url(config.resolved_base_url())
    }

    /// Create a client for an explicit base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> TripAgentResult<Self> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(TripAgentError::Config(
                "A base URL is required to initialize the Trip Agent client".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        // No timeout: an unresponsive server keeps the caller waiting.
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| TripAgentError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    /// Sends one request and decodes a 2xx body as `T`.
    ///
    /// A body of JSON `null` decodes as `T::default()`, leaving it to the
    /// caller to judge whether the content is usable.
    async fn send_json<T>(&self, path: &str, request: RequestBuilder) -> TripAgentResult<T>
    where
        T: DeserializeOwned + Default,
    {
        let response = request.send().await.map_err(|e| {
            warn!("Request to {} failed before a status was received: {}", path, e);
            TripAgentError::Network(describe_transport_error(&e))
        })?;

        let status = response.status();
        debug!("{} responded with {}", path, status);

        let body = response
            .bytes()
            .await
            .map_err(|e| TripAgentError::Network(describe_transport_error(&e)))?;

        if !status.is_success() {
            let detail = serde_json::from_slice::<ServerErrorBody>(&body)
                .ok()
                .and_then(|b| b.detail_text());
            return Err(TripAgentError::Request {
                status: status.as_u16(),
                detail,
            });
        }

        let decoded: Option<T> = serde_json::from_slice(&body).map_err(|e| {
            TripAgentError::Validation(format!("Failed to parse response: {}", e))
        })?;

        Ok(decoded.unwrap_or_default())
    }
}

#[async_trait]
impl TripApi for TripAgentClient {
    #[instrument(skip(self))]
    async fn check_health(&self) -> TripAgentResult<HealthResponse> {
        self.send_json("/health", self.request(Method::GET, "/health"))
            .await
    }

    #[instrument(skip(self))]
    async fn get_api_info(&self) -> TripAgentResult<ApiInfo> {
        self.send_json("/", self.request(Method::GET, "/")).await
    }

    #[instrument(skip(self, request))]
    async fn generate_final_response(
        &self,
        request: FinalResponseRequest,
    ) -> TripAgentResult<FinalResponseResponse> {
        const PATH: &str = "/v1/final-response";
        debug!(
            "Requesting final response (content: {} bytes, user_query: {} bytes)",
            request.content.as_deref().map_or(0, str::len),
            request.user_query.as_deref().map_or(0, str::len)
        );
        self.send_json(PATH, self.request(Method::POST, PATH).json(&request))
            .await
    }

    #[instrument(skip(self, request))]
    async fn gather_additional_info(
        &self,
        request: AdditionalInfoRequest,
    ) -> TripAgentResult<AdditionalInfoResponse> {
        const PATH: &str = "/v1/additional-info";
        debug!("Requesting additional info for: {}", request.query);
        self.send_json(PATH, self.request(Method::POST, PATH).json(&request))
            .await
    }
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "timeout".to_string()
    } else if e.is_connect() {
        format!("Could not connect to the Trip Agent API: {}", e)
    } else {
        format!("Network error: {}", e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let client = TripAgentClient::with_base_url(" http://localhost:8000/api/ ").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000/api");
        assert_eq!(
            client.url("/v1/final-response"),
            "http://localhost:8000/api/v1/final-response"
        );
    }

    #[test]
    fn empty_base_url_is_a_config_error() {
        let err = TripAgentClient::with_base_url("  ").unwrap_err();
        assert!(matches!(err, TripAgentError::Config(_)));
    }
}
