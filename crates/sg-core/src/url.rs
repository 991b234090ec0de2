//! URL helpers for site patterns and redirect targets
//!
//! These work directly on string slices; nothing here allocates except
//! `extension_url`.

/// Separator between a scheme and the rest of a URL or match pattern.
pub const SCHEME_DELIMITER: &str = "://";

/// Scheme of extension-internal pages.
pub const EXTENSION_SCHEME: &str = "chrome-extension";

/// Page shown when the configured redirect target cannot be used.
pub const FALLBACK_PAGE: &str = "blocked.html";

// =============================================================================
// Scheme Checks
// =============================================================================

/// Whether a site pattern already carries a scheme (`https://a.com/*`).
#[inline]
pub fn has_scheme(pattern: &str) -> bool {
    pattern.contains(SCHEME_DELIMITER)
}

/// Get the position after a leading `http://` or `https://`.
///
/// The scheme must be lowercase, as in `^https?://`.
#[inline]
pub fn http_scheme_end(url: &str) -> Option<usize> {
    let bytes = url.as_bytes();
    if bytes.starts_with(b"https://") {
        Some(8)
    } else if bytes.starts_with(b"http://") {
        Some(7)
    } else {
        None
    }
}

/// Whether `url` can be handed to the network filter as a redirect target.
///
/// Requires an `http`/`https` scheme, something after the scheme, and no
/// whitespace anywhere (the filter rejects the whole update otherwise).
pub fn is_redirect_url(url: &str) -> bool {
    let scheme_end = match http_scheme_end(url) {
        Some(pos) => pos,
        None => return false,
    };

    if url.len() == scheme_end {
        return false;
    }

    !url.bytes().any(|b| b.is_ascii_whitespace())
}

// =============================================================================
// Host Extraction
// =============================================================================

/// Host part of a site pattern.
///
/// Bare patterns are returned whole; scheme-qualified patterns are cut at the
/// first `/`, `?`, `#` or `:` after the scheme.
pub fn pattern_host(pattern: &str) -> &str {
    let start = match pattern.find(SCHEME_DELIMITER) {
        Some(pos) => pos + SCHEME_DELIMITER.len(),
        None => return pattern,
    };

    let rest = &pattern[start..];
    let end = rest
        .bytes()
        .position(|b| b == b'/' || b == b'?' || b == b'#' || b == b':')
        .unwrap_or(rest.len());

    &rest[..end]
}

// =============================================================================
// Extension Pages
// =============================================================================

/// URL of a page bundled with the extension.
pub fn extension_url(extension_id: &str, path: &str) -> String {
    format!(
        "{}{}{}/{}",
        EXTENSION_SCHEME,
        SCHEME_DELIMITER,
        extension_id,
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_scheme() {
        assert!(has_scheme("https://example.com/*"));
        assert!(has_scheme("*://example.com/*"));
        assert!(!has_scheme("example.com"));
        assert!(!has_scheme("example.com/path"));
    }

    #[test]
    fn test_http_scheme_end() {
        assert_eq!(http_scheme_end("https://example.com"), Some(8));
        assert_eq!(http_scheme_end("http://example.com"), Some(7));
        assert_eq!(http_scheme_end("HTTPS://example.com"), None);
        assert_eq!(http_scheme_end("ftp://example.com"), None);
        assert_eq!(http_scheme_end("example.com"), None);
    }

    #[test]
    fn test_is_redirect_url() {
        assert!(is_redirect_url("https://safe.example/"));
        assert!(is_redirect_url("http://localhost:8080/focus"));
        assert!(!is_redirect_url(""));
        assert!(!is_redirect_url("notaurl"));
        assert!(!is_redirect_url("/relative/path"));
        assert!(!is_redirect_url("https://"));
        assert!(!is_redirect_url("https://bad host/"));
        assert!(!is_redirect_url("javascript://alert(1)"));
    }

    #[test]
    fn test_pattern_host() {
        assert_eq!(pattern_host("example.com"), "example.com");
        assert_eq!(pattern_host("https://example.com/*"), "example.com");
        assert_eq!(pattern_host("*://news.example.com:443/x"), "news.example.com");
        assert_eq!(pattern_host("https://example.com"), "example.com");
    }

    #[test]
    fn test_extension_url() {
        assert_eq!(
            extension_url("abcdef", FALLBACK_PAGE),
            "chrome-extension://abcdef/blocked.html"
        );
        assert_eq!(extension_url("abcdef", "/blocked.html"), "chrome-extension://abcdef/blocked.html");
    }
}
