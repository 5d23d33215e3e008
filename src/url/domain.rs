use crate::{UrlError, UrlResult};
use url::Url;

/// Parses a URL the frontier can fetch
///
/// The URL must use http or https and carry a host. The returned URL is in
/// its serialized form, so `https://example.com` and `https://example.com/`
/// both come back as the latter.
///
/// # Examples
///
/// ```
/// use prospect::url::parse_crawl_url;
///
/// let url = parse_crawl_url("https://Example.com").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/");
/// assert!(parse_crawl_url("ftp://example.com/").is_err());
/// ```
pub fn parse_crawl_url(raw: &str) -> UrlResult<Url> {
    let url = Url::parse(raw).map_err(|source| UrlError::Parse {
        url: raw.to_string(),
        source,
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(raw.to_string()));
    }
    if host_of(&url).is_none() {
        return Err(UrlError::MissingHost(raw.to_string()));
    }

    Ok(url)
}

/// Extracts the hostname from a URL string
///
/// The port is not part of the hostname, and the result is lowercase.
/// Returns None if the string does not parse or has no host.
///
/// # Examples
///
/// ```
/// use prospect::url::extract_hostname;
///
/// assert_eq!(extract_hostname("https://EXAMPLE.COM/path"), Some("example.com".to_string()));
/// assert_eq!(extract_hostname("https://example.com:8080/"), Some("example.com".to_string()));
/// assert_eq!(extract_hostname("not a url"), None);
/// ```
pub fn extract_hostname(url: &str) -> Option<String> {
    Url::parse(url).ok().as_ref().and_then(host_of)
}

/// Extracts the lowercase hostname of an already parsed URL
pub fn host_of(url: &Url) -> Option<String> {
    url.host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_lowercase())
}

/// Checks whether two URLs share the same hostname
///
/// Both sides must parse and carry a host; subdomains count as different
/// hosts (`blog.example.com` is not `example.com`).
pub fn is_same_domain(url: &str, reference: &str) -> bool {
    match (extract_hostname(url), extract_hostname(reference)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
