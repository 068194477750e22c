// src/crawl/frontier.rs
// =============================================================================
// Builds the frontier: the list of same-site pages linked from a seed page.
//
// How it works:
// 1. Fetch the seed page
// 2. Collect every <a href> on it
// 3. Normalize each href (resolve, drop query/fragment, drop trailing slash)
// 4. Keep only same-site links that look like pages (no file extension)
// 5. Emit the seed first, then the distinct survivors in sorted order
//
// There is no recursion and no depth limit: one seed page, one hop.
//
// Rust concepts:
// - BTreeSet: deduplicates and sorts in one step
// - Option<T>: accept_link returns None for anything filtered out
// - Borrowing: the parsed document never crosses an .await
// =============================================================================

use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

use crate::error::{MirrorError, Result};
use crate::http::fetch_page;
use crate::urls;

/// Fetches `seed` and returns the seed followed by every page it links to.
pub async fn build_frontier(client: &Client, seed: &str) -> Result<Vec<String>> {
    let seed = urls::coerce_scheme(seed)?;
    info!("discovering pages linked from {}", seed);

    let page = fetch_page(client, &seed).await?;
    let frontier = extract_frontier(&page.body, &seed);

    info!("found {} page(s) on {}", frontier.len(), seed);
    Ok(frontier)
}

/// Frontier for an already-fetched seed document.
///
/// Relative links resolve against `seed`, not against any redirect target.
pub fn extract_frontier(html: &str, seed: &Url) -> Vec<String> {
    let document = Html::parse_document(html);

    // Constant selector, known to be valid
    let selector = Selector::parse("a[href]").unwrap();

    let seed_normalized =
        urls::normalize_link(seed, seed.as_str()).unwrap_or_else(|| seed.to_string());

    let mut found = BTreeSet::new();
    for element in document.select(&selector) {
        if let Some(href) = element.value().attr("href") {
            match accept_link(seed, &seed_normalized, href) {
                Some(link) => {
                    found.insert(link);
                }
                None => debug!("skipping link {:?}", href),
            }
        }
    }

    // Seed first, then everything else in sorted order
    let mut frontier = Vec::with_capacity(found.len() + 1);
    frontier.push(seed.to_string());
    frontier.extend(found);
    frontier
}

// Normalizes `href` and applies the frontier filters.
//
// Rejected:
// - empty hrefs, "#" and same-page fragment links ("#section")
// - the seed itself
// - other sites (subdomains of the seed are fine)
// - anything with a file extension (.pdf, .zip, .html, ...)
fn accept_link(seed: &Url, seed_normalized: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let normalized = urls::normalize_link(seed, href)?;
    if normalized.is_empty() || normalized == "#" || normalized == seed_normalized {
        return None;
    }

    let parsed = Url::parse(&normalized).ok()?;
    if !urls::is_http(&parsed) || !urls::same_site(seed, &parsed) {
        return None;
    }

    if !urls::extension_of(&parsed).is_empty() {
        return None;
    }

    Some(normalized)
}

/// `<hostname>.txt`, the default frontier file for a seed
pub fn frontier_file_name(seed: &str) -> Result<PathBuf> {
    let seed = urls::coerce_scheme(seed)?;
    let host = seed
        .host_str()
        .ok_or_else(|| MirrorError::invalid_url(seed.as_str(), "URL has no host"))?;
    Ok(PathBuf::from(format!("{}.txt", host)))
}

/// Writes the frontier, one URL per line
pub async fn write_frontier(path: &Path, frontier: &[String]) -> Result<()> {
    let mut contents = frontier.join("\n");
    contents.push('\n');

    tokio::fs::write(path, contents)
        .await
        .map_err(|e| MirrorError::write(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MirrorConfig;
    use crate::http::build_client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn seed() -> Url {
        Url::parse("https://example.com").unwrap()
    }

    #[test]
    fn test_same_site_filter() {
        let html = r#"
            <a href="https://blog.example.com/post">Blog</a>
            <a href="https://other.com">Other</a>
        "#;
        let frontier = extract_frontier(html, &seed());
        assert_eq!(
            frontier,
            vec!["https://example.com/", "https://blog.example.com/post"]
        );
    }

    #[test]
    fn test_extension_filter() {
        let html = r#"
            <a href="https://example.com/doc.pdf">PDF</a>
            <a href="https://example.com/about">About</a>
            <a href="/archive.zip">Zip</a>
        "#;
        let frontier = extract_frontier(html, &seed());
        assert_eq!(frontier, vec!["https://example.com/", "https://example.com/about"]);
    }

    #[test]
    fn test_normalizes_and_dedups() {
        let html = r##"
            <a href="/page?x=1#top">one</a>
            <a href="https://example.com/page/">two</a>
            <a href="page">three</a>
            <a>no href</a>
        "##;
        let frontier = extract_frontier(html, &seed());
        assert_eq!(frontier, vec!["https://example.com/", "https://example.com/page"]);
    }

    #[test]
    fn test_skips_seed_fragments_and_other_schemes() {
        let html = r##"
            <a href="#">top</a>
            <a href="#section">section</a>
            <a href="">empty</a>
            <a href="/">home</a>
            <a href="https://example.com/?ref=nav">home again</a>
            <a href="mailto:team@example.com">mail</a>
            <a href="javascript:void(0)">js</a>
        "##;
        let frontier = extract_frontier(html, &seed());
        assert_eq!(frontier, vec!["https://example.com/"]);
    }

    #[test]
    fn test_seed_comes_first_and_rest_is_sorted() {
        let html = r#"
            <a href="/zeta">z</a>
            <a href="/alpha">a</a>
            <a href="/mid">m</a>
        "#;
        let frontier = extract_frontier(html, &seed());
        assert_eq!(
            frontier,
            vec![
                "https://example.com/",
                "https://example.com/alpha",
                "https://example.com/mid",
                "https://example.com/zeta",
            ]
        );
    }

    #[test]
    fn test_frontier_file_name() {
        assert_eq!(
            frontier_file_name("example.com").unwrap(),
            PathBuf::from("example.com.txt")
        );
        assert_eq!(
            frontier_file_name("https://www.example.com/blog").unwrap(),
            PathBuf::from("www.example.com.txt")
        );
    }

    #[tokio::test]
    async fn test_build_frontier_from_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"<a href="/about">About</a><a href="/logo.png">Logo</a>"#,
                "text/html",
            ))
            .mount(&server)
            .await;

        let client = build_client(&MirrorConfig::default()).unwrap();
        let frontier = build_frontier(&client, &server.uri()).await.unwrap();
        assert_eq!(frontier.len(), 2);
        assert_eq!(frontier[1], format!("{}/about", server.uri()));
    }

    #[tokio::test]
    async fn test_build_frontier_fails_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = build_client(&MirrorConfig::default()).unwrap();
        let err = build_frontier(&client, &server.uri()).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_write_frontier() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("example.com.txt");
        let frontier = vec![
            "https://example.com/".to_string(),
            "https://example.com/about".to_string(),
        ];

        write_frontier(&file, &frontier).await.unwrap();
        let written = std::fs::read_to_string(&file).unwrap();
        assert_eq!(written, "https://example.com/\nhttps://example.com/about\n");
    }
}
