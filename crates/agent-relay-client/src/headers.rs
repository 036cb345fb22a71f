//! Custom header handling.

use agent_relay_core::{CustomHeaders, DiscoveryError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// Headers every browser request carries; never forwarded to an agent.
pub const STANDARD_HEADERS: &[&str] = &[
    "host",
    "user-agent",
    "accept",
    "content-type",
    "content-length",
    "connection",
    "accept-encoding",
];

/// Convert custom headers into a header map for the HTTP client.
///
/// # Errors
/// Returns error if a name or value is not a valid HTTP header.
pub fn header_map(headers: &CustomHeaders) -> Result<HeaderMap, DiscoveryError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| DiscoveryError::InvalidHeader(format!("{name}: {e}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| DiscoveryError::InvalidHeader(format!("{name}: {e}")))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

/// Collect the non-standard headers of an inbound request.
///
/// Values that are not visible ASCII are skipped.
#[must_use]
pub fn forwardable_headers(headers: &HeaderMap) -> CustomHeaders {
    headers
        .iter()
        .filter(|(name, _)| !STANDARD_HEADERS.contains(&name.as_str()))
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_owned(), v.to_owned()))
        })
        .collect()
}
