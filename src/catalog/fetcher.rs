use futures::StreamExt;
use reqwest::redirect::Policy;
use std::time::Duration;
use thiserror::Error;

/// Catalog bundles are a few hundred KB; anything near this is not ours.
const MAX_CATALOG_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Transport-level failures while fetching the catalog.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// The whole request (headers and body) exceeded the configured bound
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
}

/// Shared HTTP client for catalog and banner requests.
pub fn build_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(create_redirect_policy())
        .pool_max_idle_per_host(2)
        .pool_idle_timeout(Duration::from_secs(30))
        .user_agent(concat!("duorou/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Up to 3 hops, no loops. The catalog is static hosting; anything longer
/// is misconfiguration.
fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );

        attempt.follow()
    })
}

/// GET the catalog and return the raw body.
///
/// `timeout` bounds the entire exchange, body included; a slow trickle is
/// treated the same as a dead connection.
pub async fn fetch_catalog_bytes(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<Vec<u8>, FetchError> {
    tokio::time::timeout(timeout, fetch_inner(client, url))
        .await
        .map_err(|_| FetchError::Timeout(timeout))?
}

async fn fetch_inner(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, FetchError> {
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus(status.as_u16()));
    }

    read_limited_bytes(response, MAX_CATALOG_SIZE).await
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
