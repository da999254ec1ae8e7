//! HTTP client for the statement ingestion API.
//!
//! Every request carries the `x-api-key` and `x-organization-id` headers. Generic
//! GET/multipart helpers live here; domain methods (project list, statement upload)
//! live in [`api`]. The upload worker, the batch uploader and the CLI all use this
//! client.

pub mod api;

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

use stmtdrop_core::DropConfig;

pub use api::ProjectProvider;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const ORGANIZATION_ID_HEADER: &str = "x-organization-id";

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Failures talking to the ingestion API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status; `body` is the raw response text.
    #[error("{status} - {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("failed to parse response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("failed to read {name}: {source}")]
    ReadFile {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid multipart part for {name}: {source}")]
    InvalidPart {
        name: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server-provided detail for a rejected request: JSON `detail`, then `message`,
    /// falling back to `None` when the body is not such an object.
    pub fn server_detail(&self) -> Option<String> {
        let ApiError::Status { body, .. } = self else {
            return None;
        };
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        value
            .get("detail")
            .and_then(|d| d.as_str())
            .or_else(|| value.get("message").and_then(|m| m.as_str()))
            .map(str::to_string)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// HTTP client bound to one organization and API key.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    prefix: String,
    api_key: String,
    organization_id: String,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        organization_id: impl Into<String>,
    ) -> ApiResult<Self> {
        Self::with_timeout(
            base_url,
            api_key,
            organization_id,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        organization_id: impl Into<String>,
        timeout: Duration,
    ) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Build)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            prefix: "/py-api".to_string(),
            api_key: api_key.into(),
            organization_id: organization_id.into(),
        })
    }

    pub fn from_config(config: &DropConfig) -> ApiResult<Self> {
        Ok(Self::with_timeout(
            config.api_url.clone(),
            config.api_key.clone(),
            config.organization_id.clone(),
            config.http_timeout,
        )?
        .with_prefix(config.api_prefix.clone()))
    }

    /// Path prefix placed before every API path (e.g. `/py-api`). Empty for none.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.prefix, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header(API_KEY_HEADER, self.api_key.as_str())
            .header(ORGANIZATION_ID_HEADER, self.organization_id.as_str())
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(ApiError::Decode)
    }

    /// GET request. Deserializes the JSON response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = self.build_url(path);
        let request = self.apply_auth(self.client.get(&url));

        let response = request.send().await.map_err(ApiError::Transport)?;
        Self::read_json(response).await
    }

    /// POST multipart form and deserialize response.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> ApiResult<T> {
        let url = self.build_url(path);
        let request = self.apply_auth(self.client.post(&url).multipart(form));

        let response = request.send().await.map_err(ApiError::Transport)?;
        Self::read_json(response).await
    }
}
