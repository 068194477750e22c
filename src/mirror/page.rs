// src/mirror/page.rs
// =============================================================================
// Mirrors a single page.
//
// Steps:
// 1. Coerce the input to an https URL if it has no scheme
// 2. Fetch it, following redirects, and remember the final URL
// 3. Collect CSS / JS / image / font references, resolved against the final URL
// 4. Download them on a bounded pool (Config::concurrency in flight)
// 5. Point every successfully downloaded reference at its local copy
// 6. Write the result to `<output>/<host>/pages/<path>/index.html`
//
// Asset failures only cost that asset its rewrite. Page fetch, parse and
// write failures end the page.
//
// Rust concepts:
// - Streams: buffer_unordered(n) bounds downloads in flight
// - Option<T>: a download that never started is None
// - ? operator: fetch and write errors end the page early
// =============================================================================

use futures::stream::{self, StreamExt};
use percent_encoding::percent_decode_str;
use reqwest::Client;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use url::Url;

use super::assets::{collect_assets, rewrite_document, AssetCounts, AssetReference};
use super::download::{ensure_dir, DownloadOutcome, Downloader};
use crate::cancel::Cancellation;
use crate::error::{MirrorError, Result};
use crate::http::fetch_page;
use crate::urls;

// Names used inside a page directory (and `index`, the root page). A path
// segment that is one of these, followed by any number of underscores, gets
// one more underscore: `css` -> `css_`, `css_` -> `css__`. The mapping stays
// one-to-one, so a child page never lands in an asset folder or on a sibling.
const RESERVED_NAMES: [&str; 6] = ["css", "js", "imgs", "fonts", "index.html", "index"];

/// Where a page came from and where its mirror goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageTarget {
    /// URL as it was scheduled (before scheme coercion)
    pub seed: String,
    /// URL the content was actually served from
    pub final_url: Url,
    pub output_dir: PathBuf,
}

/// Result of mirroring one page
#[derive(Debug, Clone, Serialize)]
pub struct MirroredPage {
    pub target: PageTarget,
    /// Matched elements per category
    pub counts: AssetCounts,
    /// Assets fetched from the network
    pub fetched: usize,
    /// Bytes written by those fetches
    pub fetched_bytes: u64,
    /// Assets already on disk (or shared with another reference)
    pub reused: usize,
    /// Assets whose download failed; their references were left as-is
    pub failed: usize,
    /// References that were never downloadable (data:, bad URLs, ...)
    pub skipped: usize,
}

pub struct PageMirror {
    client: Client,
    output_root: PathBuf,
    concurrency: usize,
}

impl PageMirror {
    pub fn new(client: Client, output_root: impl Into<PathBuf>, concurrency: usize) -> Self {
        Self {
            client,
            output_root: output_root.into(),
            concurrency: concurrency.max(1),
        }
    }

    /// Mirrors the page at `input` and returns what was found.
    pub async fn mirror(&self, input: &str, cancel: &Cancellation) -> Result<MirroredPage> {
        // Step 1: Turn the input into an absolute http(s) URL
        let url = urls::coerce_scheme(input)?;
        if cancel.is_cancelled() {
            return Err(MirrorError::Cancelled { url: url.to_string() });
        }

        // Step 2: Fetch the page; redirects decide where it is stored
        info!("mirroring {}", url);
        let page = fetch_page(&self.client, &url).await?;
        if page.final_url != url {
            debug!("{} redirected to {}", url, page.final_url);
        }

        let target = PageTarget {
            seed: input.to_string(),
            output_dir: page_directory(&self.output_root, &page.final_url),
            final_url: page.final_url,
        };

        // Step 3: Find every asset reference in the markup
        let assets = collect_assets(&page.body, &target.final_url);
        info!(
            "found {} CSS, {} JS, {} image(s), {} font(s) on {}",
            assets.counts.css, assets.counts.js, assets.counts.images, assets.counts.fonts,
            target.final_url
        );

        // Step 4: Download them, at most `concurrency` at a time
        let results = self
            .download_all(&assets.references, &target.output_dir, cancel)
            .await;

        if cancel.is_cancelled() {
            warn!("mirroring {} cancelled", target.final_url);
            return Err(MirrorError::Cancelled {
                url: target.final_url.to_string(),
            });
        }

        let mut mirrored = MirroredPage {
            counts: assets.counts,
            fetched: 0,
            fetched_bytes: 0,
            reused: 0,
            failed: 0,
            skipped: assets.skipped,
            target,
        };

        // Tally outcomes; only saved assets get their reference rewritten
        let mut saved: Vec<&AssetReference> = Vec::new();
        for (reference, result) in results {
            match result {
                Some(Ok(outcome)) => {
                    match outcome {
                        DownloadOutcome::Fetched { bytes } => {
                            mirrored.fetched += 1;
                            mirrored.fetched_bytes += bytes;
                        }
                        DownloadOutcome::Reused => mirrored.reused += 1,
                    }
                    saved.push(reference);
                }
                Some(Err(e)) => {
                    warn!("{} file not saved: {}", reference.kind.label(), e);
                    mirrored.failed += 1;
                }
                None => mirrored.failed += 1,
            }
        }

        // Step 5: Point the markup at the local copies and write index.html
        let html = rewrite_document(&page.body, &saved);
        write_index(&mirrored.target.output_dir, &html).await?;

        info!(
            "mirrored {} into {}",
            mirrored.target.final_url,
            mirrored.target.output_dir.display()
        );
        Ok(mirrored)
    }

    // Runs every download on a bounded pool. `None` means the download was
    // never started because the page was cancelled first.
    async fn download_all<'a>(
        &self,
        references: &'a [AssetReference],
        output_dir: &Path,
        cancel: &Cancellation,
    ) -> Vec<(&'a AssetReference, Option<Result<DownloadOutcome>>)> {
        let downloader = Downloader::new(self.client.clone());
        let downloader = &downloader;  // each task borrows the same claim table

        let tasks = references.iter().map(|reference| async move {
            if cancel.is_cancelled() {
                return (reference, None);
            }
            let path = output_dir
                .join(reference.kind.dir())
                .join(&reference.file_name);
            debug!("downloading {} file {}", reference.kind.label(), reference.resolved);
            let result = downloader.fetch_to(&reference.resolved, &path).await;
            (reference, Some(result))
        });

        // buffer_unordered(n) keeps at most n downloads running
        stream::iter(tasks)
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }
}

/// Directory a page is mirrored into: `<root>/<host>/pages/<path segments>`.
///
/// The root path maps to `pages/index`. The same URL always maps to the same
/// directory and distinct paths on one host map to distinct directories.
pub fn page_directory(root: &Path, url: &Url) -> PathBuf {
    let host = url.host_str().unwrap_or("unknown-host");
    let mut dir = root.join(sanitize_segment(host)).join("pages");

    let segments: Vec<String> = url
        .path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(|s| sanitize_segment(&percent_decode_str(s).decode_utf8_lossy()))
                .collect()
        })
        .unwrap_or_default();

    if segments.is_empty() {
        dir.push("index");
    } else {
        for segment in segments {
            dir.push(segment);
        }
    }
    dir
}

fn sanitize_segment(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned == "." || cleaned == ".." {
        "_".repeat(cleaned.len())
    } else if RESERVED_NAMES.contains(&cleaned.trim_end_matches('_')) {
        format!("{}_", cleaned)
    } else {
        cleaned
    }
}

async fn write_index(dir: &Path, html: &str) -> Result<()> {
    ensure_dir(dir)
        .await
        .map_err(|e| MirrorError::write(dir, e))?;

    let path = dir.join("index.html");
    tokio::fs::write(&path, html)
        .await
        .map_err(|e| MirrorError::write(path, e))
}
