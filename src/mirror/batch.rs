// src/mirror/batch.rs
// =============================================================================
// Mirrors a list of pages, one after another.
//
// - Pages run in list order; a failing page is logged, contributes zero
//   counts, and the batch moves on to the next URL
// - Statistics are an explicit accumulator owned by the batch and returned
//   in the report, never shared global state
// - A report is always produced, even if every page failed
//
// Rust concepts:
// - #[serde(tag = ...)]: enum variants serialize as tagged JSON objects
// - &mut self: the statistics accumulator has exactly one writer
// - Custom serialize_with: Duration printed as fractional seconds
// =============================================================================

use anyhow::{Context, Result};
use serde::{Serialize, Serializer};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::assets::AssetCounts;
use super::page::{MirroredPage, PageMirror};
use crate::cancel::Cancellation;
use crate::error::MirrorError;

/// How a single page ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PageOutcome {
    /// Page and every downloadable asset saved
    Complete,
    /// Page saved, but some assets could not be downloaded
    Partial { failed_assets: usize },
    /// Page could not be fetched, parsed or written
    Failed {
        reason: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
    },
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
    /// URL as listed in the input
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(flatten)]
    pub outcome: PageOutcome,
    pub counts: AssetCounts,
    pub fetched: usize,
    pub fetched_bytes: u64,
    pub reused: usize,
}

impl PageReport {
    fn mirrored(url: &str, page: MirroredPage) -> Self {
        let outcome = if page.failed > 0 {
            PageOutcome::Partial {
                failed_assets: page.failed,
            }
        } else {
            PageOutcome::Complete
        };

        Self {
            url: url.to_string(),
            final_url: Some(page.target.final_url.to_string()),
            output_dir: Some(page.target.output_dir),
            outcome,
            counts: page.counts,
            fetched: page.fetched,
            fetched_bytes: page.fetched_bytes,
            reused: page.reused,
        }
    }

    fn errored(url: &str, error: &MirrorError) -> Self {
        let outcome = match error {
            MirrorError::Cancelled { .. } => PageOutcome::Cancelled,
            _ => PageOutcome::Failed {
                reason: error.to_string(),
                status: error.status(),
            },
        };
        Self::empty(url, outcome)
    }

    fn empty(url: &str, outcome: PageOutcome) -> Self {
        Self {
            url: url.to_string(),
            final_url: None,
            output_dir: None,
            outcome,
            counts: AssetCounts::default(),
            fetched: 0,
            fetched_bytes: 0,
            reused: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.outcome, PageOutcome::Complete)
    }
}

/// Totals across every page of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MirrorStatistics {
    pub counts: AssetCounts,
    pub pages_complete: usize,
    pub pages_partial: usize,
    pub pages_failed: usize,
    pub pages_cancelled: usize,
}

impl MirrorStatistics {
    pub fn record(&mut self, report: &PageReport) {
        self.counts += report.counts;
        match report.outcome {
            PageOutcome::Complete => self.pages_complete += 1,
            PageOutcome::Partial { .. } => self.pages_partial += 1,
            PageOutcome::Failed { .. } => self.pages_failed += 1,
            PageOutcome::Cancelled => self.pages_cancelled += 1,
        }
    }

    pub fn pages(&self) -> usize {
        self.pages_complete + self.pages_partial + self.pages_failed + self.pages_cancelled
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub statistics: MirrorStatistics,
    #[serde(rename = "elapsed_secs", serialize_with = "as_secs")]
    pub elapsed: Duration,
    pub pages: Vec<PageReport>,
}

impl BatchReport {
    pub fn all_complete(&self) -> bool {
        self.pages.iter().all(PageReport::is_complete)
    }
}

fn as_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Reads a newline-delimited URL list; blank lines are ignored
pub fn read_url_list(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading URL list {}", path.display()))?;
    Ok(parse_url_list(&text))
}

pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Mirrors every URL in order and returns the aggregate report.
///
/// `page_timeout`, when set, gives each page its own deadline on top of the
/// shared `cancel` flag.
pub async fn mirror_all(
    mirror: &PageMirror,
    urls: &[String],
    cancel: &Cancellation,
    page_timeout: Option<Duration>,
) -> BatchReport {
    let started = Instant::now();
    let mut statistics = MirrorStatistics::default();
    let mut pages = Vec::with_capacity(urls.len());

    for url in urls {
        // Once cancelled, the remaining pages are reported without a request
        let report = if cancel.is_cancelled() {
            PageReport::empty(url, PageOutcome::Cancelled)
        } else {
            // Each page gets its own deadline but shares the Ctrl-C flag
            let page_cancel = match page_timeout {
                Some(timeout) => cancel.with_timeout(timeout),
                None => cancel.clone(),
            };
            match mirror.mirror(url, &page_cancel).await {
                Ok(page) => PageReport::mirrored(url, page),
                Err(e) => {
                    warn!("could not mirror {}: {}", url, e);
                    PageReport::errored(url, &e)
                }
            }
        };

        // Failed and cancelled pages add zero counts
        statistics.record(&report);
        pages.push(report);
    }

    let elapsed = started.elapsed();
    info!("mirrored {} page(s) in {:.2?}", statistics.pages(), elapsed);

    BatchReport {
        statistics,
        elapsed,
        pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MirrorConfig;
    use crate::http::build_client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn mirror(root: &Path) -> PageMirror {
        let client = build_client(&MirrorConfig::default()).unwrap();
        PageMirror::new(client, root, 2)
    }

    #[test]
    fn test_parse_url_list_skips_blank_lines() {
        let urls = parse_url_list("example.com\n\n  https://example.com/about  \n\t\n");
        assert_eq!(urls, vec!["example.com", "https://example.com/about"]);
    }

    #[test]
    fn test_read_url_list_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_url_list(&dir.path().join("urls.txt")).unwrap_err();
        assert!(err.to_string().contains("urls.txt"));
    }

    #[test]
    fn test_statistics_accumulate() {
        let mut stats = MirrorStatistics::default();
        let mut ok = PageReport::empty("a", PageOutcome::Complete);
        ok.counts = AssetCounts {
            css: 2,
            js: 1,
            images: 3,
            fonts: 0,
        };
        stats.record(&ok);
        stats.record(&ok);
        stats.record(&PageReport::empty(
            "b",
            PageOutcome::Failed {
                reason: "boom".to_string(),
                status: None,
            },
        ));

        assert_eq!(stats.counts.css, 4);
        assert_eq!(stats.counts.images, 6);
        assert_eq!(stats.pages_complete, 2);
        assert_eq!(stats.pages_failed, 1);
        assert_eq!(stats.pages(), 3);
    }

    #[tokio::test]
    async fn test_failed_pages_do_not_stop_the_batch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"<link rel="stylesheet" href="/s.css"><img src="/i.png">"#,
                "text/html",
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/s.css"))
            .respond_with(ResponseTemplate::new(200).set_body_string("a{}"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/i.png"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let root = tempfile::tempdir().unwrap();
        let urls = vec![
            format!("{}/gone", server.uri()),
            "http://".to_string(),
            format!("{}/ok", server.uri()),
        ];

        let report = mirror_all(&mirror(root.path()), &urls, &Cancellation::new(), None).await;

        assert_eq!(report.pages.len(), 3);
        assert!(matches!(
            report.pages[0].outcome,
            PageOutcome::Failed {
                status: Some(404),
                ..
            }
        ));
        assert!(matches!(report.pages[1].outcome, PageOutcome::Failed { status: None, .. }));
        assert_eq!(
            report.pages[2].outcome,
            PageOutcome::Partial { failed_assets: 1 }
        );
        assert_eq!(
            report.statistics.counts,
            AssetCounts {
                css: 1,
                js: 0,
                images: 1,
                fonts: 0
            }
        );
        assert_eq!(report.statistics.pages_failed, 2);
        assert!(!report.all_complete());
    }

    #[tokio::test]
    async fn test_cancelled_batch_still_reports() {
        let cancel = Cancellation::new();
        cancel.cancel();
        let root = tempfile::tempdir().unwrap();
        let urls = vec!["example.com".to_string(), "example.org".to_string()];

        let report = mirror_all(&mirror(root.path()), &urls, &cancel, None).await;

        assert_eq!(report.statistics.pages_cancelled, 2);
        assert_eq!(report.statistics.counts, AssetCounts::default());
        assert!(report
            .pages
            .iter()
            .all(|p| p.outcome == PageOutcome::Cancelled));
    }

    #[test]
    fn test_report_json_shape() {
        let report = BatchReport {
            statistics: MirrorStatistics::default(),
            elapsed: Duration::from_millis(1500),
            pages: vec![PageReport::empty(
                "example.com",
                PageOutcome::Partial { failed_assets: 2 },
            )],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["elapsed_secs"], 1.5);
        assert_eq!(json["pages"][0]["outcome"], "partial");
        assert_eq!(json["pages"][0]["failed_assets"], 2);
    }
}
