//! HTTP signal provider
//!
//! `GET <base>/<identifier>` returning a flat JSON object; 404 means
//! the provider knows nothing about the identifier. The identifier is
//! percent-encoded as a single path segment.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};

use crate::error::SignalError;

use super::types::{values_from_json, SignalKind, SignalProvider, SignalValues};

pub struct HttpSignalProvider {
    name: String,
    kind: SignalKind,
    base_url: Url,
    http_client: reqwest::Client,
}

impl HttpSignalProvider {
    pub fn new(
        name: &str,
        kind: SignalKind,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, SignalError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| SignalError::Transport(format!("invalid base URL {}: {}", base_url, e)))?;
        if parsed.cannot_be_a_base() {
            return Err(SignalError::Transport(format!("base URL {} cannot take a path", base_url)));
        }
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            name: name.to_string(),
            kind,
            base_url: parsed,
            http_client,
        })
    }

    /// None for identifiers that cannot name a single path segment
    fn url_for(&self, identifier: &str) -> Option<Url> {
        if matches!(identifier, "" | "." | "..") {
            return None;
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut().ok()?.pop_if_empty().push(identifier);
        Some(url)
    }
}

#[async_trait]
impl SignalProvider for HttpSignalProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SignalKind {
        self.kind
    }

    async fn lookup(&self, identifier: &str) -> Result<Option<SignalValues>, SignalError> {
        let Some(url) = self.url_for(identifier) else {
            return Ok(None);
        };
        let response = self.http_client.get(url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: serde_json::Value = response
                    .json()
                    .await
                    .map_err(|e| SignalError::Malformed(e.to_string()))?;
                values_from_json(&body).map(Some)
            }
            status => Err(SignalError::Transport(format!("HTTP {}", status.as_u16()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(base: &str) -> HttpSignalProvider {
        HttpSignalProvider::new("devrep", SignalKind::Device, base, Duration::from_millis(10)).unwrap()
    }

    #[test]
    fn test_url_for_encodes_identifier_as_one_segment() {
        let provider = provider("http://localhost:9000/device/");

        assert_eq!(provider.url_for("abc-123").unwrap().as_str(), "http://localhost:9000/device/abc-123");
        assert_eq!(provider.url_for("a/b").unwrap().as_str(), "http://localhost:9000/device/a%2Fb");
        assert_eq!(provider.url_for("a/../b").unwrap().as_str(), "http://localhost:9000/device/a%2F..%2Fb");
    }

    #[test]
    fn test_distinct_identifiers_get_distinct_urls() {
        let provider = provider("http://localhost:9000/identity");

        assert_ne!(provider.url_for("a/b"), provider.url_for("a_b"));
        assert_ne!(provider.url_for("john+1@x.com"), provider.url_for("john_1@x.com"));
        assert_ne!(provider.url_for("50%"), provider.url_for("50%25"));
    }

    #[test]
    fn test_dot_segments_are_not_looked_up() {
        let provider = provider("http://localhost:9000/identity");

        assert!(provider.url_for("..").is_none());
        assert!(provider.url_for(".").is_none());
        assert!(provider.url_for("").is_none());
        assert!(provider.url_for("..x").is_some());
    }

    #[test]
    fn test_rejects_base_without_path() {
        let result = HttpSignalProvider::new("x", SignalKind::Device, "mailto:risk@example.com", Duration::from_millis(10));
        assert!(result.is_err());
    }
}
