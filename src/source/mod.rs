//! Portal access: the records endpoint seen as `url -> JSON + field manifest`.

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;

/// Response header carrying the comma separated field manifest.
/// Header lookup through `reqwest::header::HeaderMap` is case-insensitive.
pub const FIELDS_HEADER: &str = "x-soda2-fields";

/// One decoded response from the portal.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub body: Value,
    pub fields_header: Option<String>,
}

impl FetchedPage {
    pub fn new(body: Value, fields_header: Option<String>) -> Self {
        Self {
            body,
            fields_header,
        }
    }
}

/// A request that produced no usable response. `url` is reported as the problem resource.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct TransportError {
    pub url: String,
    pub reason: String,
}

impl TransportError {
    pub fn unreachable(url: &str, reason: impl std::fmt::Display) -> Self {
        Self {
            url: url.to_string(),
            reason: format!("Failed to reach a server. Reason: {reason}"),
        }
    }

    pub fn status(url: &str, code: u16) -> Self {
        Self {
            url: url.to_string(),
            reason: format!("The server couldn't fulfill the request. Error Code: {code}"),
        }
    }

    pub fn malformed(url: &str, reason: impl std::fmt::Display) -> Self {
        Self {
            url: url.to_string(),
            reason: format!("response body was not valid JSON: {reason}"),
        }
    }
}

/// Anything that can answer a GET against the portal. Shared across dataset workers.
pub trait PortalClient: Send + Sync {
    fn fetch(&self, url: &str) -> Result<FetchedPage, TransportError>;
}

/// Blocking reqwest client with a per-request timeout; expiry surfaces as a transport error.
#[derive(Debug, Clone)]
pub struct HttpPortalClient {
    client: Client,
}

impl HttpPortalClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("nullwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl PortalClient for HttpPortalClient {
    fn fetch(&self, url: &str) -> Result<FetchedPage, TransportError> {
        tracing::debug!(%url, "requesting page");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| TransportError::unreachable(url, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::status(url, status.as_u16()));
        }

        let fields_header = response
            .headers()
            .get(FIELDS_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let text = response
            .text()
            .map_err(|err| TransportError::unreachable(url, err))?;
        let body: Value =
            serde_json::from_str(&text).map_err(|err| TransportError::malformed(url, err))?;

        Ok(FetchedPage::new(body, fields_header))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_messages_match_problem_report_wording() {
        let err = TransportError::status("http://x/a.json", 404);
        assert_eq!(
            err.to_string(),
            "The server couldn't fulfill the request. Error Code: 404"
        );
        assert_eq!(err.url, "http://x/a.json");

        let err = TransportError::unreachable("http://x/a.json", "connection refused");
        assert!(err.to_string().starts_with("Failed to reach a server."));
    }
}
