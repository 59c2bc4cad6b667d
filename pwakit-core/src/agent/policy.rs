//! Network-first fetch policy.
//!
//! The live network is tried first; on rejection the cache is consulted for the exact
//! request, then for the offline fallback document. The steps are evaluated strictly in
//! that order and the result says which one produced the response.

use reqwest::Url;

use super::platform::{CacheStorage, Network, RequestInfo};

/// HTTP status eligible for capture.
const CACHEABLE_STATUS: u16 = 200;

/// Which cache lookup answered a request the network could not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// The request itself was cached.
    Exact,
    /// The offline fallback document was served instead.
    OfflineFallback,
}

/// Result of resolving one intercepted request.
#[derive(Debug)]
pub enum FetchOutcome<R> {
    /// The network answered.
    Network(R),
    /// The network failed and a cached response was found.
    Cache(CacheOutcome, R),
    /// The network failed and neither lookup found anything.
    Unrecoverable {
        /// Why the network attempt failed.
        reason: String,
    },
}

impl<R> FetchOutcome<R> {
    /// Returns the response to hand back to the page, if any.
    pub fn into_response(self) -> Option<R> {
        match self {
            Self::Network(response) | Self::Cache(_, response) => Some(response),
            Self::Unrecoverable { .. } => None,
        }
    }

    /// Whether the response came from the live network.
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Only successful `GET` responses are captured into the cache.
#[must_use]
pub fn should_capture(method: &str, status: u16) -> bool {
    method.eq_ignore_ascii_case("GET") && status == CACHEABLE_STATUS
}

/// Resolves `request` network first, falling back to the cache and then to `offline_page`.
///
/// Cache lookup failures are treated as misses.
pub async fn network_first<H>(
    host: &H,
    request: &H::Request,
    offline_page: &Url,
) -> FetchOutcome<H::Response>
where
    H: Network + CacheStorage + ?Sized,
{
    let reason = match host.fetch(request).await {
        Ok(response) => return FetchOutcome::Network(response),
        Err(err) => err.to_string(),
    };
    log::debug!("network failed for {}: {reason}", request.url());

    match host.match_request(request).await {
        Ok(Some(response)) => return FetchOutcome::Cache(CacheOutcome::Exact, response),
        Ok(None) => {}
        Err(err) => log::warn!("cache lookup failed for {}: {err}", request.url()),
    }

    match host.match_url(offline_page).await {
        Ok(Some(response)) => {
            return FetchOutcome::Cache(CacheOutcome::OfflineFallback, response);
        }
        Ok(None) => {}
        Err(err) => log::warn!("offline page lookup failed: {err}"),
    }

    FetchOutcome::Unrecoverable { reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_capture() {
        assert!(should_capture("GET", 200));
        assert!(should_capture("get", 200));
        assert!(!should_capture("GET", 201));
        assert!(!should_capture("GET", 304));
        assert!(!should_capture("GET", 404));
        assert!(!should_capture("POST", 200));
        assert!(!should_capture("HEAD", 200));
    }

    #[test]
    fn test_into_response() {
        assert_eq!(FetchOutcome::Network(1).into_response(), Some(1));
        assert_eq!(
            FetchOutcome::Cache(CacheOutcome::OfflineFallback, 2).into_response(),
            Some(2)
        );
        assert_eq!(
            FetchOutcome::<u8>::Unrecoverable {
                reason: "offline".to_string()
            }
            .into_response(),
            None
        );
    }
}
