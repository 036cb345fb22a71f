//! Capability descriptor discovery.

use std::time::Duration;

use agent_relay_core::{
    CapabilityDescriptor, CustomHeaders, DiscoveryError, protocol::DEFAULT_DESCRIPTOR_PATH,
};
use reqwest::Client;
use url::Url;

use crate::headers::header_map;

/// A discovery URL split into origin and descriptor path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorLocation {
    /// `scheme://host[:port]`, no trailing slash.
    pub base: String,
    /// Path and query relative to `base`; `None` means the well-known default.
    pub path: Option<String>,
}

impl DescriptorLocation {
    /// Split a discovery URL.
    ///
    /// # Errors
    /// Returns error if the URL does not parse or is not http(s).
    pub fn parse(url: &str) -> Result<Self, DiscoveryError> {
        let parsed =
            Url::parse(url).map_err(|e| DiscoveryError::InvalidUrl(format!("{url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DiscoveryError::InvalidUrl(format!(
                "{url}: unsupported scheme {}",
                parsed.scheme()
            )));
        }

        let base = parsed.origin().ascii_serialization();

        let mut candidate = parsed.path().trim_start_matches('/').to_owned();
        if let Some(query) = parsed.query() {
            candidate.push('?');
            candidate.push_str(query);
        }
        let path = if candidate.trim_matches('/').is_empty() {
            None
        } else {
            Some(candidate)
        };

        Ok(Self { base, path })
    }

    /// Absolute URL the descriptor is fetched from.
    #[must_use]
    pub fn descriptor_url(&self) -> String {
        format!(
            "{}/{}",
            self.base,
            self.path.as_deref().unwrap_or(DEFAULT_DESCRIPTOR_PATH)
        )
    }
}

/// Fetch and parse the capability descriptor behind `url`.
///
/// Single attempt; retry policy belongs to the caller.
///
/// # Errors
/// Returns error on network failure, non-2xx status, or a document that does
/// not match the descriptor schema.
pub async fn resolve_descriptor(
    client: &Client,
    location: &DescriptorLocation,
) -> Result<CapabilityDescriptor, DiscoveryError> {
    let target = location.descriptor_url();
    tracing::debug!(url = %target, "Fetching capability descriptor");

    let response = client
        .get(&target)
        .send()
        .await
        .map_err(|e| DiscoveryError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(DiscoveryError::Status {
            status: status.as_u16(),
            url: target,
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| DiscoveryError::Network(e.to_string()))?;

    serde_json::from_slice(&body).map_err(|e| DiscoveryError::InvalidDescriptor(e.to_string()))
}

/// HTTP client sending `headers` with every request.
///
/// # Errors
/// Returns error if a header is invalid or the client cannot be built.
pub fn discovery_client(
    headers: &CustomHeaders,
    timeout: Duration,
) -> Result<Client, DiscoveryError> {
    Client::builder()
        .timeout(timeout)
        .default_headers(header_map(headers)?)
        .build()
        .map_err(|e| DiscoveryError::Client(e.to_string()))
}

/// One-shot discovery with a throwaway client.
///
/// # Errors
/// Returns error if the URL or headers are invalid, or resolution fails.
pub async fn fetch_descriptor(
    url: &str,
    headers: &CustomHeaders,
    timeout: Duration,
) -> Result<CapabilityDescriptor, DiscoveryError> {
    let location = DescriptorLocation::parse(url)?;
    let client = discovery_client(headers, timeout)?;
    resolve_descriptor(&client, &location).await
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    use super::*;

    fn card(url: &str) -> serde_json::Value {
        json!({
            "name": "host_agent",
            "description": "Routes requests",
            "url": url,
            "version": "1.0.0",
            "defaultInputModes": ["text"],
            "defaultOutputModes": ["text"],
            "capabilities": {"streaming": true},
            "skills": []
        })
    }

    #[test]
    fn test_parse_root_uses_default_path() {
        let location = DescriptorLocation::parse("http://localhost:10001/").unwrap();
        assert_eq!(location.base, "http://localhost:10001");
        assert_eq!(location.path, None);
        assert_eq!(
            location.descriptor_url(),
            "http://localhost:10001/.well-known/agent-card.json"
        );
    }

    #[test]
    fn test_parse_keeps_path_and_query() {
        let location =
            DescriptorLocation::parse("https://agents.example.com/cards/web.json?v=2").unwrap();
        assert_eq!(location.base, "https://agents.example.com");
        assert_eq!(location.path.as_deref(), Some("cards/web.json?v=2"));
    }

    #[test]
    fn test_parse_separator_only_path_is_default() {
        let location = DescriptorLocation::parse("http://localhost:10001//").unwrap();
        assert_eq!(location.path, None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            DescriptorLocation::parse("not a url"),
            Err(DiscoveryError::InvalidUrl(_))
        ));
        assert!(matches!(
            DescriptorLocation::parse("ftp://host/card"),
            Err(DiscoveryError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_default_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/agent-card.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(card(&server.uri())))
            .expect(1)
            .mount(&server)
            .await;

        let location = DescriptorLocation::parse(&server.uri()).unwrap();
        let descriptor = resolve_descriptor(&Client::new(), &location).await;
        let descriptor = tokio_test::assert_ok!(descriptor);
        assert_eq!(descriptor.name, "host_agent");
        assert!(descriptor.supports_streaming());
    }

    #[tokio::test]
    async fn test_resolve_explicit_path_with_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/custom/card.json"))
            .and(header("x-api-key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(card(&server.uri())))
            .expect(1)
            .mount(&server)
            .await;

        let headers = [("x-api-key".to_owned(), "secret".to_owned())].into();
        let client = Client::builder()
            .default_headers(header_map(&headers).unwrap())
            .build()
            .unwrap();
        let location =
            DescriptorLocation::parse(&format!("{}/custom/card.json", server.uri())).unwrap();

        assert!(resolve_descriptor(&client, &location).await.is_ok());
    }

    #[tokio::test]
    async fn test_resolve_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let location = DescriptorLocation::parse(&server.uri()).unwrap();
        let err = resolve_descriptor(&Client::new(), &location)
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::Status { status: 404, .. }));
        assert!(!err.is_gateway());
    }

    #[tokio::test]
    async fn test_resolve_schema_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "half"})))
            .mount(&server)
            .await;

        let location = DescriptorLocation::parse(&server.uri()).unwrap();
        let err = resolve_descriptor(&Client::new(), &location)
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidDescriptor(_)));
    }

    #[tokio::test]
    async fn test_fetch_descriptor_forwards_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/agent-card.json"))
            .and(header("authorization", "Bearer t"))
            .respond_with(ResponseTemplate::new(200).set_body_json(card(&server.uri())))
            .expect(1)
            .mount(&server)
            .await;

        let headers = [("authorization".to_owned(), "Bearer t".to_owned())].into();
        let descriptor = fetch_descriptor(&server.uri(), &headers, Duration::from_secs(5)).await;
        assert_eq!(descriptor.unwrap().name, "host_agent");
    }

    #[tokio::test]
    async fn test_resolve_unreachable_is_gateway() {
        let location = DescriptorLocation::parse("http://127.0.0.1:1/").unwrap();
        let err = resolve_descriptor(&Client::new(), &location)
            .await
            .unwrap_err();
        assert!(err.is_gateway(), "unexpected error: {err}");
    }
}
