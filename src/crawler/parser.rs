//! HTML link extraction and page summaries
//!
//! Every `<a href>` on a page is resolved against the page URL. Only
//! `http`/`https` results are kept; domain scoping is the caller's job.

use scraper::{Html, Selector};
use url::Url;

/// Extracts all anchor targets from an HTML document, in document order
///
/// Duplicates are kept so the caller sees links in the order they appear.
/// Fragment-only links resolve to the page itself plus the fragment.
///
/// # Example
///
/// ```
/// use gleaner::crawler::extract_links;
/// use url::Url;
///
/// let html = r#"<html><body><a href="/page">Link</a><a href="mailto:a@b.c">Mail</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let links = extract_links(html, &base_url);
/// assert_eq!(links.len(), 1);
/// assert_eq!(links[0].as_str(), "https://example.com/page");
/// ```
pub fn extract_links(html: &str, base_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}

/// Element counts reported after scraping a single page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageSummary {
    /// `<img>` elements with a `src`
    pub images: usize,
    pub paragraphs: usize,

    /// `<h1>` through `<h6>`
    pub headings: usize,
}

impl PageSummary {
    pub fn from_html(html: &str) -> Self {
        let document = Html::parse_document(html);
        let count = |selector: &str| {
            Selector::parse(selector)
                .map(|s| document.select(&s).count())
                .unwrap_or(0)
        };

        Self {
            images: count("img[src]"),
            paragraphs: count("p"),
            headings: count("h1, h2, h3, h4, h5, h6"),
        }
    }
}

/// Resolves a link href to an absolute HTTP(S) URL
///
/// Returns None for hrefs that do not parse or resolve to another scheme
/// (`javascript:`, `mailto:`, `tel:`, `data:` ...).
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let absolute_url = base_url.join(href.trim()).ok()?;

    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url),
        _ => None,
    }
}
