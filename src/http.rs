// src/http.rs
// =============================================================================
// HTTP plumbing shared by the crawler and the page mirror.
//
// Key functionality:
// - Builds one reqwest Client per run (connection pooling)
// - Fetches an HTML page, following redirects, and reports the final URL
// - Turns reqwest failures into readable reasons
//
// Rust concepts:
// - async/await: network I/O without blocking the runtime
// - Result<T, E>: every failure becomes a MirrorError the caller can match on
// - Builder pattern: Client::builder() for timeouts and redirect policy
// =============================================================================

use anyhow::Result;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use url::Url;

use crate::config::MirrorConfig;
use crate::error::MirrorError;

/// A fetched HTML document
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL the server ultimately served the content at
    pub final_url: Url,
    pub body: String,
}

/// Creates the HTTP client used for every request in a run.
///
/// Redirects are followed transparently up to `max_redirects`.
pub fn build_client(config: &MirrorConfig) -> Result<Client> {
    let client = Client::builder()
        .timeout(config.request_timeout())
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
        .build()?;
    Ok(client)
}

/// Fetches `url` and returns the document plus its post-redirect URL.
///
/// Fails with `Fetch` on transport errors or non-2xx status and with
/// `Parse` when the server says the body is not HTML or it cannot be decoded.
pub async fn fetch_page(client: &Client, url: &Url) -> Result<FetchedPage, MirrorError> {
    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| fetch_error(url.as_str(), e))?;

    let final_url = response.url().clone();
    let status = response.status();
    if !status.is_success() {
        return Err(status_error(final_url.as_str(), status));
    }

    if let Some(content_type) = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    {
        if !is_html_content_type(content_type) {
            return Err(MirrorError::Parse {
                url: final_url.to_string(),
                reason: format!("not an HTML document (content-type: {})", content_type),
            });
        }
    }

    let body = response.text().await.map_err(|e| MirrorError::Parse {
        url: final_url.to_string(),
        reason: describe_error(&e),
    })?;

    Ok(FetchedPage { final_url, body })
}

/// Error for a non-2xx response, carrying the code and its reason phrase
pub fn status_error(url: &str, status: StatusCode) -> MirrorError {
    MirrorError::Fetch {
        url: url.to_string(),
        status: Some(status.as_u16()),
        reason: format!("HTTP {}", status),
    }
}

/// Error for a request that never produced a response
pub fn fetch_error(url: &str, error: reqwest::Error) -> MirrorError {
    MirrorError::Fetch {
        url: url.to_string(),
        status: error.status().map(|s| s.as_u16()),
        reason: describe_error(&error),
    }
}

// Categorizes reqwest errors into something a person can act on
pub fn describe_error(error: &reqwest::Error) -> String {
    let error_string = error.to_string();

    if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_redirect() {
        "too many redirects".to_string()
    } else if error.is_connect() {
        if error_string.contains("dns") {
            "could not resolve hostname".to_string()
        } else {
            "connection failed".to_string()
        }
    } else if error_string.contains("certificate") || error_string.contains("ssl") {
        "SSL certificate error".to_string()
    } else {
        error_string
    }
}

fn is_html_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime.is_empty() || mime.contains("html")
}
