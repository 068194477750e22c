// src/urls.rs
// =============================================================================
// URL helpers shared by the crawler and the page mirror.
//
// Everything here works on parsed `Url` values. Strings only come in from
// markup or input files and only go out when written to disk or printed.
//
// Rust concepts:
// - Borrowing: helpers take &Url and hand back new owned values
// - Option / Result: "no answer" vs "bad input"
// =============================================================================

use url::Url;

use crate::error::{MirrorError, Result};

/// Resolves `reference` against `base` the way a browser would.
///
/// Absolute references pass through the same algorithm, so resolving an
/// already-resolved URL again gives the same result.
pub fn resolve(base: &Url, reference: &str) -> Result<Url> {
    base.join(reference.trim())
        .map_err(|e| MirrorError::invalid_url(reference, e))
}

/// Lowercase extension of the last path segment, without the dot.
///
/// Query and fragment never count: `style.CSS?v=2#x` -> `css`.
pub fn extension_of(url: &Url) -> String {
    let segment = last_segment(url);
    match segment.rfind('.') {
        Some(idx) => segment[idx + 1..].to_ascii_lowercase(),
        None => String::new(),
    }
}

/// Copy of `url` with query and fragment removed
pub fn strip_query_and_fragment(url: &Url) -> Url {
    let mut stripped = url.clone();
    stripped.set_query(None);
    stripped.set_fragment(None);
    stripped
}

/// True when both hosts are equal or one is a subdomain of the other
pub fn same_site(a: &Url, b: &Url) -> bool {
    let (Some(a), Some(b)) = (a.host_str(), b.host_str()) else {
        return false;
    };
    let a = a.trim_end_matches('.');
    let b = b.trim_end_matches('.');

    a.eq_ignore_ascii_case(b) || is_subdomain_of(a, b) || is_subdomain_of(b, a)
}

fn is_subdomain_of(host: &str, parent: &str) -> bool {
    host.len() > parent.len() + 1
        && host.to_ascii_lowercase().ends_with(&format!(".{}", parent.to_ascii_lowercase()))
}

/// Final non-empty path segment ("" for the root path)
pub fn last_segment(url: &Url) -> &str {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or("")
}

/// Turns user input into an absolute http(s) URL.
///
/// Input without `http://` or `https://` gets `https://` prepended,
/// so `example.com` becomes `https://example.com/`.
pub fn coerce_scheme(input: &str) -> Result<Url> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(MirrorError::invalid_url(input, "empty URL"));
    }

    let lower = trimmed.to_ascii_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&candidate).map_err(|e| MirrorError::invalid_url(input, e))?;
    if url.host_str().is_none() {
        return Err(MirrorError::invalid_url(input, "URL has no host"));
    }
    Ok(url)
}

/// Normalized frontier form of `href` found on the page at `base`.
///
/// Resolves against `base`, drops query and fragment, then strips a single
/// trailing slash. `None` when the href cannot be resolved at all.
pub fn normalize_link(base: &Url, href: &str) -> Option<String> {
    let resolved = resolve(base, href).ok()?;
    let stripped = strip_query_and_fragment(&resolved);

    let mut normalized = String::from(stripped);
    if normalized.ends_with('/') {
        normalized.pop();
    }
    Some(normalized)
}

/// True for schemes we can fetch over the network
pub fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_resolve_relative_and_dot_segments() {
        let base = url("https://example.com/blog/post/");
        assert_eq!(
            resolve(&base, "../img/a.png").unwrap().as_str(),
            "https://example.com/blog/img/a.png"
        );
        assert_eq!(
            resolve(&base, "/static/./site.css").unwrap().as_str(),
            "https://example.com/static/site.css"
        );
        assert_eq!(
            resolve(&base, "//cdn.example.net/lib.js").unwrap().as_str(),
            "https://cdn.example.net/lib.js"
        );
    }

    #[test]
    fn test_resolve_is_idempotent_on_absolute_input() {
        let base = url("https://example.com/a/b");
        for reference in ["c.css", "../d.js?x=1", "https://other.org/e.png#frag"] {
            let once = resolve(&base, reference).unwrap();
            let twice = resolve(&base, once.as_str()).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_extension_ignores_query_and_fragment() {
        assert_eq!(extension_of(&url("https://x/style.CSS?v=2#top")), "css");
        assert_eq!(extension_of(&url("https://x/fonts/a.woff2")), "woff2");
        assert_eq!(extension_of(&url("https://x/about")), "");
        assert_eq!(extension_of(&url("https://x/")), "");
        assert_eq!(extension_of(&url("https://x/v1.2/docs")), "");
    }

    #[test]
    fn test_strip_query_and_fragment() {
        let stripped = strip_query_and_fragment(&url("https://x/style.css?v=2#x"));
        assert_eq!(stripped.as_str(), "https://x/style.css");
    }

    #[test]
    fn test_same_site() {
        let seed = url("https://example.com");
        assert!(same_site(&seed, &url("https://example.com/about")));
        assert!(same_site(&seed, &url("https://blog.example.com/post")));
        assert!(same_site(&url("https://blog.example.com"), &seed));
        assert!(!same_site(&seed, &url("https://other.com")));
        assert!(!same_site(&seed, &url("https://notexample.com")));
    }

    #[test]
    fn test_coerce_scheme() {
        assert_eq!(coerce_scheme("example.com").unwrap().as_str(), "https://example.com/");
        assert_eq!(
            coerce_scheme("  http://example.com/a ").unwrap().as_str(),
            "http://example.com/a"
        );
        assert!(coerce_scheme("").is_err());
        assert!(coerce_scheme("https://").is_err());
    }

    #[test]
    fn test_normalize_link_strips_query_fragment_and_slash() {
        let base = url("https://example.com/");
        assert_eq!(
            normalize_link(&base, "https://example.com/page?x=1#top").as_deref(),
            Some("https://example.com/page")
        );
        assert_eq!(
            normalize_link(&base, "/docs/").as_deref(),
            Some("https://example.com/docs")
        );
        assert_eq!(normalize_link(&base, "/").as_deref(), Some("https://example.com"));
    }
}
