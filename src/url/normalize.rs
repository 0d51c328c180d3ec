use url::Url;

/// Normalizes a resolved URL before deduplication
///
/// Only used when `normalize-urls` is enabled; by default the crawler
/// deduplicates on the exact resolved string.
///
/// # Normalization Steps
///
/// 1. Lowercase host and drop the default port (done by the URL parser)
/// 2. Remove fragment (everything after #)
/// 3. Sort query parameters by key, keeping the relative order of repeated keys
/// 4. Remove empty query string (trailing ?)
///
/// Paths are left untouched: `/page` and `/page/` may be different resources.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use gleaner::url::normalize_url;
///
/// let url = Url::parse("https://EXAMPLE.com:443/page?b=2&a=1#top").unwrap();
/// assert_eq!(normalize_url(&url).as_str(), "https://example.com/page?a=1&b=2");
/// ```
pub fn normalize_url(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);

    if url.query().is_some() {
        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        params.sort_by(|a, b| a.0.cmp(&b.0));

        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    url
}
