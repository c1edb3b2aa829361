//! Endpoint URL construction for the control API and streaming endpoints.

use thiserror::Error;
use url::Url;

/// Query parameter carrying the secret on streaming endpoints.
pub const TOKEN_PARAM: &str = "token";

const REDACTED: &str = "***";

/// Errors produced while building endpoint URLs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("invalid controller URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Parses a controller base URL.
///
/// A bare `host:port` gets an `http://` scheme; `ws`/`wss` are mapped back
/// to `http`/`https`. Any other scheme is rejected.
pub fn parse_base_url(raw: &str) -> Result<Url, EndpointError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EndpointError::InvalidUrl {
            url: raw.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    let mut url = Url::parse(&candidate).map_err(|e| EndpointError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    let scheme = match url.scheme() {
        "http" | "ws" => "http",
        "https" | "wss" => "https",
        other => {
            return Err(EndpointError::InvalidUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{}'", other),
            })
        }
    };
    if url.scheme() != scheme && url.set_scheme(scheme).is_err() {
        return Err(EndpointError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("cannot switch scheme to '{}'", scheme),
        });
    }
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}

/// Appends `path` (which may contain `/`) to the base URL's path.
pub fn http_endpoint(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty();
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
    }
    url
}

/// Builds the WebSocket URL for a streaming endpoint.
///
/// Endpoint parameters come first, the secret is appended as `token`.
pub fn ws_endpoint(base: &Url, path: &str, params: &[(String, String)], secret: Option<&str>) -> Url {
    let mut url = http_endpoint(base, path);
    let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
    // http -> ws and https -> wss are both special schemes, the switch cannot fail
    let _ = url.set_scheme(scheme);

    if !params.is_empty() || secret.is_some() {
        let mut query = url.query_pairs_mut();
        for (key, value) in params {
            query.append_pair(key, value);
        }
        if let Some(secret) = secret {
            query.append_pair(TOKEN_PARAM, secret);
        }
    }
    url
}

/// Renders a URL for logging with the `token` query value masked.
pub fn redact(url: &Url) -> String {
    if !url.query_pairs().any(|(k, _)| k == TOKEN_PARAM) {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if k == TOKEN_PARAM {
                REDACTED.to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), value)
        })
        .collect();

    let mut masked = url.clone();
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}
