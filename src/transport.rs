//! HTTP transport shared by every operation of a session.
//!
//! One `reqwest::Client` per session, built with the configured TLS
//! verification setting. There is no retry, no cookie store and no timeout
//! override; each exchange stands alone.

use reqwest::header::HeaderMap;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::{ProviderError, Result};

/// Maximum length of response body echoed into error messages.
const MAX_ERROR_BODY_LENGTH: usize = 200;

/// A completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Raw response body.
    pub body: String,
}

impl ApiResponse {
    /// Decode the body, reporting shape mismatches as [`ProviderError::Schema`].
    pub fn json<T: DeserializeOwned>(&self, context: &str) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            ProviderError::Schema(format!(
                "{}: {} (body: {})",
                context,
                e,
                truncate(&self.body)
            ))
        })
    }
}

/// HTTP client bound to one JumpServer base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    path_prefix: String,
}

impl HttpTransport {
    /// Build a transport for `base_url`.
    pub fn new(base_url: &str, skip_tls_verify: bool) -> Result<Self> {
        let parsed = Url::parse(base_url).map_err(|e| {
            ProviderError::Configuration(format!("invalid base URL '{}': {}", base_url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ProviderError::Configuration(format!(
                "base URL must be http or https, got '{}'",
                parsed.scheme()
            )));
        }

        if skip_tls_verify {
            warn!("TLS certificate verification is disabled");
        }

        let client = Client::builder()
            .user_agent(concat!("jumpserver-provider/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(skip_tls_verify)
            .build()
            .map_err(|e| ProviderError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            path_prefix: parsed.path().trim_end_matches('/').to_string(),
        })
    }

    /// The base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// The request target as the server sees it, including any base URL path prefix.
    pub fn request_target(&self, path: &str) -> String {
        format!("{}{}", self.path_prefix, path)
    }

    /// Start a request for an API path.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    /// Send a request and read the whole response.
    pub async fn execute(
        &self,
        method: &Method,
        path: &str,
        request: RequestBuilder,
    ) -> Result<ApiResponse> {
        let response = request.send().await.map_err(|e| {
            debug!(%method, path, error = %e, "request failed");
            ProviderError::from(e)
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        debug!(%method, path, status = status.as_u16(), "JumpServer response");

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
}
