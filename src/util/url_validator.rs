use thiserror::Error;
use url::Url;

/// Errors from validating the configured catalog endpoint.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// Plain HTTP is only accepted for loopback hosts (local test servers).
    #[error("Insecure catalog URL: HTTPS required except for localhost")]
    Insecure,
}

/// Validate the catalog source URL.
///
/// The catalog is public content, so private hosts are fine, but the
/// transport must be HTTPS unless the host is loopback.
///
/// ```
/// use duorou::util::validate_catalog_url;
///
/// assert!(validate_catalog_url("https://example.github.io/flower/data/duorou.json").is_ok());
/// assert!(validate_catalog_url("http://127.0.0.1:8080/data.json").is_ok());
/// assert!(validate_catalog_url("http://example.com/data.json").is_err());
/// assert!(validate_catalog_url("file:///etc/passwd").is_err());
/// ```
pub fn validate_catalog_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "https" => Ok(url),
        "http" => {
            let loopback = match url.host() {
                Some(url::Host::Domain(d)) => d.eq_ignore_ascii_case("localhost"),
                Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
                Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
                None => false,
            };
            if loopback {
                tracing::warn!(url = %url, "Using non-HTTPS catalog URL (localhost only)");
                Ok(url)
            } else {
                Err(UrlValidationError::Insecure)
            }
        }
        scheme => Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_https() {
        let url = validate_catalog_url("https://example.com/data/duorou.json").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn accepts_loopback_http() {
        assert!(validate_catalog_url("http://localhost:3001/data.json").is_ok());
        assert!(validate_catalog_url("http://127.0.0.1/data.json").is_ok());
        assert!(validate_catalog_url("http://[::1]/data.json").is_ok());
    }

    #[test]
    fn rejects_remote_http() {
        assert!(matches!(
            validate_catalog_url("http://192.168.1.10/data.json"),
            Err(UrlValidationError::Insecure)
        ));
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(matches!(
            validate_catalog_url("ftp://example.com/data.json"),
            Err(UrlValidationError::UnsupportedScheme(s)) if s == "ftp"
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            validate_catalog_url("not a url"),
            Err(UrlValidationError::InvalidUrl(_))
        ));
    }
}
