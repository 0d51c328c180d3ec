use crate::config::FilterConfig;

/// Blacklist/whitelist URL filter
///
/// Patterns are plain substrings. A non-empty whitelist is exclusive: once it
/// is set, only URLs containing one of its patterns pass and the blacklist is
/// never consulted.
#[derive(Debug, Clone, Default)]
pub struct UrlFilter {
    blacklist: Vec<String>,
    whitelist: Vec<String>,
}

impl UrlFilter {
    pub fn new(blacklist: Vec<String>, whitelist: Vec<String>) -> Self {
        Self {
            blacklist,
            whitelist,
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(config.blacklist.clone(), config.whitelist.clone())
    }

    /// Checks whether a URL may be fetched
    ///
    /// # Examples
    ///
    /// ```
    /// use gleaner::url::UrlFilter;
    ///
    /// let filter = UrlFilter::new(vec!["docs".into()], vec!["docs".into()]);
    /// assert!(filter.is_allowed("https://x.com/docs/page"));
    /// assert!(!filter.is_allowed("https://x.com/blog"));
    /// ```
    pub fn is_allowed(&self, url: &str) -> bool {
        if !self.whitelist.is_empty() {
            return self.whitelist.iter().any(|pattern| url.contains(pattern.as_str()));
        }

        !self.blacklist.iter().any(|pattern| url.contains(pattern.as_str()))
    }
}
