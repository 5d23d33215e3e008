/// Case-insensitive substring blacklist for URLs
///
/// A URL is blacklisted when it contains any of the configured keywords,
/// ignoring case. Keywords are lowercased once at construction.
///
/// # Examples
///
/// ```
/// use prospect::url::Blacklist;
///
/// let blacklist = Blacklist::new(["wcpages"]);
/// assert!(blacklist.is_blacklisted("https://example.com/WCPages/listing"));
/// assert!(!blacklist.is_blacklisted("https://example.com/about"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    keywords: Vec<String>,
}

impl Blacklist {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    /// Returns true if `url` contains any keyword
    pub fn is_blacklisted(&self, url: &str) -> bool {
        if self.is_empty() {
            return false;
        }
        let candidate = url.to_lowercase();
        self.keywords.iter().any(|k| candidate.contains(k.as_str()))
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}
