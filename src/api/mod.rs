//! # Control API client
//!
//! One-shot request/response calls against the Clash control API.
//!
//! Every call is a `GET {base}/{path}?{query}`. When a secret is configured
//! it is sent as `Authorization: Bearer <secret>`.
//!
//! ## Response decoding
//!
//! Paths listed in the static shape registry (currently `version`) are
//! decoded into their typed shape and a malformed body is an error. Any
//! other path is decoded as generic JSON, falling back to the raw bytes, so
//! an unrecognized but well-formed response never fails.
//!
//! ## Example
//!
//! ```no_run
//! use clashmon::api::ApiClient;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ApiClient::new("http://127.0.0.1:9090", None, Duration::from_secs(10))?;
//! let version = client.version().await?;
//! println!("{} (meta: {})", version.version, version.meta);
//! # Ok(())
//! # }
//! ```

mod error;
pub mod types;

pub use error::{ApiError, DecodeError};
pub use types::*;

use crate::endpoint::{self, EndpointError};
use bytes::Bytes;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// Response shapes the client knows how to decode strictly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    Version,
}

/// Path → shape registry.
const KNOWN_SHAPES: &[(&str, ResponseShape)] = &[("version", ResponseShape::Version)];

impl ResponseShape {
    /// Looks up the registered shape for a path (leading/trailing `/` ignored).
    pub fn for_path(path: &str) -> Option<Self> {
        let key = path.trim_matches('/');
        KNOWN_SHAPES
            .iter()
            .find(|(p, _)| *p == key)
            .map(|(_, shape)| *shape)
    }

    fn decode(self, path: &str, body: &[u8]) -> Result<ApiResponse, DecodeError> {
        let decode_error = |source| DecodeError {
            path: path.to_string(),
            source,
        };
        match self {
            ResponseShape::Version => serde_json::from_slice(body)
                .map(ApiResponse::Version)
                .map_err(decode_error),
        }
    }
}

/// Decoded result of a control API call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    Version(Version),
    /// Well-formed JSON on a path without a registered shape.
    Json(serde_json::Value),
    /// Body that is not JSON.
    Raw(Bytes),
}

impl ApiResponse {
    /// Converts the response into a JSON value. Raw bodies become a string.
    pub fn into_json(self) -> serde_json::Value {
        match self {
            ApiResponse::Version(v) => serde_json::to_value(v).unwrap_or(serde_json::Value::Null),
            ApiResponse::Json(value) => value,
            ApiResponse::Raw(bytes) => {
                serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
            }
        }
    }
}

/// HTTP client for the Clash control API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    secret: Option<String>,
    timeout: Duration,
    client: Client,
}

impl ApiClient {
    /// Create a client for `base_url` with a fixed per-request timeout.
    pub fn new(
        base_url: &str,
        secret: Option<String>,
        timeout: Duration,
    ) -> Result<Self, EndpointError> {
        let base_url = endpoint::parse_base_url(base_url)?;
        Ok(Self::with_client(base_url, secret, timeout, Client::new()))
    }

    /// Create a client with a custom HTTP client (for testing).
    pub fn with_client(
        base_url: Url,
        secret: Option<String>,
        timeout: Duration,
        client: Client,
    ) -> Self {
        Self {
            base_url,
            secret: secret.filter(|s| !s.is_empty()),
            timeout,
            client,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `GET /version`.
    pub async fn version(&self) -> Result<Version, ApiError> {
        match self.call("version", &[] as &[(&str, &str)]).await? {
            ApiResponse::Version(version) => Ok(version),
            // the registry maps "version" to ResponseShape::Version
            other => Err(ApiError::Decode(DecodeError {
                path: "version".to_string(),
                source: serde::de::Error::custom(format!("unexpected response {:?}", other)),
            })),
        }
    }

    /// Calls `path` and decodes the body as `T`, regardless of the registry.
    pub async fn call_as<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let body = self.fetch(path, query).await?;
        serde_json::from_slice(&body).map_err(|source| {
            ApiError::Decode(DecodeError {
                path: path.to_string(),
                source,
            })
        })
    }

    /// Calls `path` with `query` and decodes the body per the shape registry.
    pub async fn call<Q>(&self, path: &str, query: &Q) -> Result<ApiResponse, ApiError>
    where
        Q: Serialize + ?Sized,
    {
        let body = self.fetch(path, query).await?;

        if let Some(shape) = ResponseShape::for_path(path) {
            return Ok(shape.decode(path, &body)?);
        }

        match serde_json::from_slice::<serde_json::Value>(&body) {
            Ok(value) => Ok(ApiResponse::Json(value)),
            Err(_) => Ok(ApiResponse::Raw(body)),
        }
    }

    /// Performs the request and returns the non-empty body of a 2xx response.
    async fn fetch<Q>(&self, path: &str, query: &Q) -> Result<Bytes, ApiError>
    where
        Q: Serialize + ?Sized,
    {
        let url = endpoint::http_endpoint(&self.base_url, path);
        tracing::debug!(path = path, url = %url, "Calling controller API");

        let mut request = self.client.get(url).query(query).timeout(self.timeout);
        if let Some(secret) = &self.secret {
            request = request.header(AUTHORIZATION, format!("Bearer {}", secret));
        }

        let response = request.send().await.map_err(|e| self.classify_error(e))?;
        let status = response.status();

        metrics::counter!("clashmon_api_requests_total",
            "path" => path.trim_matches('/').to_string(),
            "status" => status.as_u16().to_string()
        )
        .increment(1);

        let body = response.bytes().await.map_err(|e| self.classify_error(e))?;

        if !status.is_success() {
            tracing::warn!(
                path = path,
                status = status.as_u16(),
                "Controller API returned error status"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        if body.is_empty() {
            return Err(ApiError::EmptyResponse);
        }

        Ok(body)
    }

    fn classify_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout(self.timeout.as_millis() as u64)
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_registry_lookup() {
        assert_eq!(ResponseShape::for_path("version"), Some(ResponseShape::Version));
        assert_eq!(ResponseShape::for_path("/version/"), Some(ResponseShape::Version));
        assert_eq!(ResponseShape::for_path("proxies"), None);
    }

    #[test]
    fn test_shape_decode_rejects_malformed() {
        let result = ResponseShape::Version.decode("version", br#"{"ver": 1}"#);
        let err = result.unwrap_err();
        assert_eq!(err.path, "version");
    }

    #[test]
    fn test_empty_secret_is_ignored() {
        let client = ApiClient::new("127.0.0.1:9090", Some(String::new()), Duration::from_secs(1))
            .unwrap();
        assert!(client.secret.is_none());
        assert_eq!(client.base_url().as_str(), "http://127.0.0.1:9090/");
    }

    #[test]
    fn test_into_json_raw_becomes_string() {
        let raw = ApiResponse::Raw(Bytes::from_static(b"pong"));
        assert_eq!(raw.into_json(), serde_json::json!("pong"));
    }
}
