// src/mirror/download.rs
// =============================================================================
// Downloads assets to disk, at most once per local path.
//
// The download rule:
// - the target file name ignores the query string (see assets::file_name_for)
// - if the file already exists it is reused, no network request is made
// - otherwise the parent directory is created and the body is streamed to
//   `<name>.part`, then renamed into place
//
// Several references on one page can map to the same local path and their
// downloads run concurrently. Each path is claimed in a map guarded by a
// mutex; the first caller runs the download, the others wait on its result.
//
// Rust concepts:
// - Mutex<HashMap<..>>: one claim table shared by every download of a page
// - tokio::sync::OnceCell: the first caller downloads, the rest wait for its result
// - Streaming: the body is written chunk by chunk, never held whole in memory
// =============================================================================

use reqwest::Client;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;
use tracing::debug;
use url::Url;

use crate::error::MirrorError;
use crate::http::describe_error;

/// What happened to one asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Fetched from the network by this call
    Fetched { bytes: u64 },
    /// Already on disk, or fetched by another reference to the same path
    Reused,
}

type Claim = Arc<OnceCell<Result<DownloadOutcome, String>>>;

pub struct Downloader {
    client: Client,
    claims: Mutex<HashMap<PathBuf, Claim>>,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            claims: Mutex::new(HashMap::new()),
        }
    }

    /// Makes sure `path` holds the body of `url`.
    pub async fn fetch_to(&self, url: &Url, path: &Path) -> Result<DownloadOutcome, MirrorError> {
        let claim = self.claim(path);

        let mut ran_download = false;
        let result = claim
            .get_or_init(|| {
                ran_download = true;
                claim_or_reuse(&self.client, url, path)
            })
            .await;

        match result {
            Ok(outcome) if ran_download => Ok(*outcome),
            Ok(_) => Ok(DownloadOutcome::Reused),
            Err(reason) => Err(MirrorError::Download {
                url: url.to_string(),
                reason: reason.clone(),
            }),
        }
    }

    fn claim(&self, path: &Path) -> Claim {
        // The lock is only held for the map lookup, never across an await
        let mut claims = match self.claims.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(claims.entry(path.to_path_buf()).or_default())
    }
}

/// Creates `dir` and any missing parents
pub async fn ensure_dir(dir: &Path) -> io::Result<()> {
    tokio::fs::create_dir_all(dir).await
}

// Reuses an existing file or downloads a fresh one
async fn claim_or_reuse(
    client: &Client,
    url: &Url,
    path: &Path,
) -> Result<DownloadOutcome, String> {
    // A file left by an earlier run is trusted as-is
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        debug!("reusing {}", path.display());
        return Ok(DownloadOutcome::Reused);
    }

    let mut response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| describe_error(&e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(format!("HTTP {}", status));
    }

    // Asset folders only appear once something is about to land in them
    if let Some(parent) = path.parent() {
        ensure_dir(parent)
            .await
            .map_err(|e| format!("creating {}: {}", parent.display(), e))?;
    }

    // Write to <name>.part, then rename, so a half-written file is never reused
    let part = part_path(path);
    let written = stream_to_file(&mut response, &part).await;
    let bytes = match written {
        Ok(bytes) => bytes,
        Err(reason) => {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(reason);
        }
    };

    tokio::fs::rename(&part, path)
        .await
        .map_err(|e| format!("moving download into {}: {}", path.display(), e))?;

    debug!("saved {} ({} bytes)", path.display(), bytes);
    Ok(DownloadOutcome::Fetched { bytes })
}

async fn stream_to_file(response: &mut reqwest::Response, path: &Path) -> Result<u64, String> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| format!("creating {}: {}", path.display(), e))?;

    let mut bytes = 0u64;
    while let Some(chunk) = response.chunk().await.map_err(|e| describe_error(&e))? {
        file.write_all(&chunk)
            .await
            .map_err(|e| format!("writing {}: {}", path.display(), e))?;
        bytes += chunk.len() as u64;
    }
    file.flush()
        .await
        .map_err(|e| format!("writing {}: {}", path.display(), e))?;

    Ok(bytes)
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn downloader() -> Downloader {
        Downloader::new(Client::new())
    }

    async fn serve(server: &MockServer, at: &str, body: &str, expected_hits: u64) {
        Mock::given(method("GET"))
            .and(url_path(at))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(expected_hits)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_downloads_then_reuses() {
        let server = MockServer::start().await;
        serve(&server, "/a.css", "body{}", 1).await;
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("css").join("a.css");
        let url = Url::parse(&format!("{}/a.css?v=1", server.uri())).unwrap();

        let first = downloader().fetch_to(&url, &target).await.unwrap();
        assert_eq!(first, DownloadOutcome::Fetched { bytes: 6 });
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "body{}");

        // A new downloader only has the file on disk to go on
        let second = downloader().fetch_to(&url, &target).await.unwrap();
        assert_eq!(second, DownloadOutcome::Reused);
    }

    #[tokio::test]
    async fn test_same_path_is_fetched_once_when_concurrent() {
        let server = MockServer::start().await;
        serve(&server, "/a.css", "body{}", 1).await;
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("css").join("a.css");
        let v1 = Url::parse(&format!("{}/a.css?v=1", server.uri())).unwrap();
        let v2 = Url::parse(&format!("{}/a.css?v=2", server.uri())).unwrap();

        let downloader = downloader();
        let (a, b) = tokio::join!(
            downloader.fetch_to(&v1, &target),
            downloader.fetch_to(&v2, &target)
        );

        let mut outcomes = vec![a.unwrap(), b.unwrap()];
        outcomes.sort_by_key(|o| matches!(o, DownloadOutcome::Reused));
        assert_eq!(
            outcomes,
            vec![DownloadOutcome::Fetched { bytes: 6 }, DownloadOutcome::Reused]
        );
    }

    #[tokio::test]
    async fn test_error_status_leaves_nothing_behind() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("imgs").join("gone.png");
        let url = Url::parse(&format!("{}/gone.png", server.uri())).unwrap();

        let err = downloader().fetch_to(&url, &target).await.unwrap_err();
        assert!(matches!(err, MirrorError::Download { .. }));
        assert!(err.to_string().contains("404"));
        assert!(!target.exists());
        assert!(!part_path(&target).exists());
        assert!(!target.parent().unwrap().exists());
    }

    #[tokio::test]
    async fn test_existing_file_skips_network() {
        let server = MockServer::start().await;
        serve(&server, "/app.js", "new", 0).await;
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("app.js");
        std::fs::write(&target, "old").unwrap();
        let url = Url::parse(&format!("{}/app.js", server.uri())).unwrap();

        let outcome = downloader().fetch_to(&url, &target).await.unwrap();
        assert_eq!(outcome, DownloadOutcome::Reused);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "old");
    }

    #[test]
    fn test_part_path() {
        assert_eq!(
            part_path(Path::new("out/css/a.css")),
            PathBuf::from("out/css/a.css.part")
        );
    }
}
