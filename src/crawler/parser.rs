//! HTML parser for extracting links and page metadata
//!
//! This module handles parsing HTML content to extract:
//! - Links to follow (from `<a href>` tags)
//! - Title, meta description, favicon and og:image for enrichment
//! - Visible body text and the footer fragment

use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Fields of a homepage consumed by the enrichment pipeline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageSnapshot {
    /// The page title (from `<title>`)
    pub title: Option<String>,

    /// `<meta name="description">` content
    pub description: Option<String>,

    /// Absolute favicon URL; `<link rel="icon">` wins over `rel="shortcut icon"`
    pub favicon_url: Option<String>,

    /// Absolute `og:image` URL
    pub og_image_url: Option<String>,

    /// Visible text of `<body>` with whitespace collapsed
    pub body_text: String,

    /// Inner HTML of the first `<footer>`
    pub footer_html: Option<String>,
}

impl PageSnapshot {
    /// Parses a fetched homepage
    ///
    /// # Arguments
    ///
    /// * `html` - The HTML content to parse
    /// * `base_url` - The page URL, used to resolve favicon and og:image
    ///
    /// # Returns
    ///
    /// * `Ok(PageSnapshot)` - Successfully parsed page
    /// * `Err(url::ParseError)` - A favicon or og:image reference could not be
    ///   resolved against `base_url`
    pub fn parse(html: &str, base_url: &Url) -> Result<Self, url::ParseError> {
        let document = Html::parse_document(html);

        let favicon_url = first_attr(&document, r#"link[rel="icon"]"#, "href")
            .or_else(|| first_attr(&document, r#"link[rel="shortcut icon"]"#, "href"))
            .map(|href| base_url.join(&href).map(String::from))
            .transpose()?;

        let og_image_url = first_attr(&document, r#"meta[property="og:image"]"#, "content")
            .map(|src| base_url.join(&src).map(String::from))
            .transpose()?;

        Ok(Self {
            title: extract_title(&document),
            description: first_attr(&document, r#"meta[name="description"]"#, "content"),
            favicon_url,
            og_image_url,
            body_text: extract_body_text(&document),
            footer_html: extract_footer(&document),
        })
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Value of `attr` on the first element matching `selector`, if non-blank
fn first_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;

    document
        .select(&selector)
        .filter_map(|element| element.value().attr(attr))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

fn extract_body_text(document: &Html) -> String {
    let Ok(body_selector) = Selector::parse("body") else {
        return String::new();
    };
    let Some(body) = document.select(&body_selector).next() else {
        return String::new();
    };

    let mut words = Vec::new();
    for node in body.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(ElementRef::wrap)
            .map(|parent| matches!(parent.value().name(), "script" | "style" | "noscript"))
            .unwrap_or(false);
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }

    words.join(" ")
}

fn extract_footer(document: &Html) -> Option<String> {
    let selector = Selector::parse("footer").ok()?;
    document
        .select(&selector)
        .next()
        .map(|footer| footer.inner_html())
}

/// Extracts the absolute http/https links of all anchors in the document
///
/// Links are deduplicated, keeping the order of first appearance. Malformed
/// `href` values are skipped.
///
/// # Example
///
/// ```
/// use prospect::crawler::extract_links;
/// use url::Url;
///
/// let html = r#"<a href="/about">About</a><a href="/about">Again</a><a href="mailto:x@y.z">Mail</a>"#;
/// let base = Url::parse("https://example.com/").unwrap();
/// assert_eq!(extract_links(html, &base), vec!["https://example.com/about"]);
/// ```
pub fn extract_links(html: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&a_selector) {
        if let Some(href) = element.value().attr("href") {
            if let Some(absolute_url) = resolve_link(href, base_url) {
                if seen.insert(absolute_url.clone()) {
                    links.push(absolute_url);
                }
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url.to_string()),
        _ => None,
    }
}
