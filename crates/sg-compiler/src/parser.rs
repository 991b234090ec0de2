use sg_core::url::{has_scheme, pattern_host};

/// A user-entered site pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitePattern<'a> {
    /// Bare host such as `example.com`
    Host(&'a str),
    /// Scheme-qualified match pattern such as `https://example.com/*`
    Qualified(&'a str),
}

impl<'a> SitePattern<'a> {
    /// Classify a pattern. Returns `None` for empty input.
    pub fn parse(site: &'a str) -> Option<Self> {
        let site = site.trim();
        if site.is_empty() {
            return None;
        }

        if has_scheme(site) {
            Some(Self::Qualified(site))
        } else {
            Some(Self::Host(site))
        }
    }

    /// Match expression handed to the network filter.
    pub fn url_filter(&self) -> String {
        match self {
            Self::Qualified(pattern) => (*pattern).to_string(),
            Self::Host(host) => format!("*://{}/*", host),
        }
    }

    pub fn host(&self) -> &'a str {
        match self {
            Self::Qualified(pattern) => pattern_host(pattern),
            Self::Host(host) => host,
        }
    }
}
