//! URL handling module for Prospect
//!
//! This module provides hostname extraction, same-domain checks, the URL
//! blacklist, and classification of links found on a crawled page.

mod domain;
mod matcher;

pub use domain::{extract_hostname, host_of, is_same_domain, parse_crawl_url};
pub use matcher::Blacklist;

/// What the frontier should do with a link found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkClass {
    /// Same hostname as the page it was found on - a queue candidate
    Internal,
    /// Different hostname - registered as a property
    External { hostname: String },
    /// Matches the blacklist - ignored
    Blacklisted,
    /// No usable hostname - ignored
    Invalid,
}

/// Classifies a link relative to the page it was found on
///
/// The blacklist check comes first. Internal/external is decided by hostname
/// equality against `page_url` (the page just fetched), not against the seed
/// that started the crawl.
///
/// # Examples
///
/// ```
/// use prospect::url::{classify_link, Blacklist, LinkClass};
///
/// let blacklist = Blacklist::new(["wcpages"]);
/// let page = "https://chamber.example.org/members";
///
/// assert_eq!(
///     classify_link("https://chamber.example.org/events", page, &blacklist),
///     LinkClass::Internal
/// );
/// assert_eq!(
///     classify_link("https://acme-widgets.com/", page, &blacklist),
///     LinkClass::External { hostname: "acme-widgets.com".to_string() }
/// );
/// assert_eq!(
///     classify_link("https://chamber.example.org/wcpages/1", page, &blacklist),
///     LinkClass::Blacklisted
/// );
/// ```
pub fn classify_link(link: &str, page_url: &str, blacklist: &Blacklist) -> LinkClass {
    if blacklist.is_blacklisted(link) {
        return LinkClass::Blacklisted;
    }

    let Some(hostname) = extract_hostname(link) else {
        return LinkClass::Invalid;
    };

    if is_same_domain(link, page_url) {
        LinkClass::Internal
    } else {
        LinkClass::External { hostname }
    }
}
