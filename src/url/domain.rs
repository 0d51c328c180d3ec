use crate::UrlError;
use url::Url;

/// Validates a seed URL and parses it
///
/// A seed must carry both a scheme and a network location; anything else
/// (a relative reference, `mailto:`, a bare hostname) is rejected.
///
/// # Examples
///
/// ```
/// use gleaner::url::validate_seed;
///
/// assert!(validate_seed("https://example.com/").is_ok());
/// assert!(validate_seed("example.com/page").is_err());
/// assert!(validate_seed("mailto:someone@example.com").is_err());
/// ```
pub fn validate_seed(seed: &str) -> Result<Url, UrlError> {
    let seed = seed.trim();
    let url = Url::parse(seed).map_err(|e| match e {
        url::ParseError::RelativeUrlWithoutBase => UrlError::MissingScheme(seed.to_string()),
        other => UrlError::Parse(format!("{}: {}", seed, other)),
    })?;

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost(seed.to_string()));
    }

    Ok(url)
}

/// Returns the network location of a URL: host, plus `:port` when the port
/// is not the scheme's default
///
/// This is the crawl's notion of "domain": two URLs are in scope of each
/// other exactly when their network locations are equal.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use gleaner::url::network_location;
///
/// let url = Url::parse("https://example.com/path").unwrap();
/// assert_eq!(network_location(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(network_location(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn network_location(url: &Url) -> Option<String> {
    let host = url.host_str().filter(|h| !h.is_empty())?;
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host.to_string()),
    }
}

/// Network location of a URL string, `None` if it does not parse
pub fn network_location_of(url: &str) -> Option<String> {
    Url::parse(url).ok().as_ref().and_then(network_location)
}
