//! Retrieval of published documents from a remote origin or a local tree.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use benchboard_protocol::BoardError;
use serde::de::DeserializeOwned;

pub type FetchFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BoardError>> + Send + 'a>>;

/// Source of raw document bytes addressed by path or URL.
///
/// Implementations report non-success responses as [`BoardError::Status`]
/// and transport failures as [`BoardError::Fetch`].
pub trait DataFetcher: Send + Sync {
    fn fetch<'a>(&'a self, path: &'a str) -> FetchFuture<'a, Vec<u8>>;

    /// Existence check without needing the body.
    fn exists<'a>(&'a self, path: &'a str) -> FetchFuture<'a, bool> {
        Box::pin(async move { Ok(self.fetch(path).await.is_ok()) })
    }
}

pub async fn fetch_json<T: DeserializeOwned>(
    fetcher: &dyn DataFetcher,
    path: &str,
) -> Result<T, BoardError> {
    let bytes = fetcher.fetch(path).await?;
    serde_json::from_slice(&bytes).map_err(|e| BoardError::parse(path, e))
}

pub async fn fetch_text(fetcher: &dyn DataFetcher, path: &str) -> Result<String, BoardError> {
    let bytes = fetcher.fetch(path).await?;
    String::from_utf8(bytes).map_err(|e| BoardError::parse(path, e))
}

/// Succeeds when `path` holds a parseable JSON document. Any failure is
/// reported as [`BoardError::ProbeNotFound`].
pub async fn probe(fetcher: &dyn DataFetcher, path: &str) -> Result<(), BoardError> {
    match fetch_json::<serde_json::Value>(fetcher, path).await {
        Ok(_) => Ok(()),
        Err(e) => {
            tracing::debug!(path = %path, error = %e, "Probe found no data");
            Err(BoardError::ProbeNotFound {
                path: path.to_string(),
            })
        }
    }
}

/// Fetches `http(s)://` URLs with reqwest and everything else from disk,
/// relative to `local_root`. Missing local files map to HTTP 404.
pub struct SourceFetcher {
    client: reqwest::Client,
    local_root: PathBuf,
}

impl SourceFetcher {
    pub fn new(local_root: impl Into<PathBuf>, timeout: Duration) -> Result<Self, BoardError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BoardError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            local_root: local_root.into(),
        })
    }

    fn is_remote(path: &str) -> bool {
        path.starts_with("http://") || path.starts_with("https://")
    }

    fn local_path(&self, path: &str) -> PathBuf {
        self.local_root.join(path.trim_start_matches('/'))
    }

    async fn fetch_remote(&self, url: &str) -> Result<Vec<u8>, BoardError> {
        let resp = self.client.get(url).send().await.map_err(|e| BoardError::Fetch {
            path: url.to_string(),
            reason: e.to_string(),
        })?;
        if !resp.status().is_success() {
            return Err(BoardError::Status {
                path: url.to_string(),
                status: resp.status().as_u16(),
            });
        }
        let body = resp.bytes().await.map_err(|e| BoardError::Fetch {
            path: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(body.to_vec())
    }

    async fn fetch_local(&self, path: &str) -> Result<Vec<u8>, BoardError> {
        let file = self.local_path(path);
        match tokio::fs::read(&file).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BoardError::Status {
                path: path.to_string(),
                status: 404,
            }),
            Err(e) => Err(BoardError::Fetch {
                path: path.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

impl DataFetcher for SourceFetcher {
    fn fetch<'a>(&'a self, path: &'a str) -> FetchFuture<'a, Vec<u8>> {
        Box::pin(async move {
            tracing::trace!(path = %path, "Fetching");
            if Self::is_remote(path) {
                self.fetch_remote(path).await
            } else {
                self.fetch_local(path).await
            }
        })
    }

    fn exists<'a>(&'a self, path: &'a str) -> FetchFuture<'a, bool> {
        Box::pin(async move {
            if Self::is_remote(path) {
                match self.client.head(path).send().await {
                    Ok(resp) => Ok(resp.status().is_success()),
                    Err(_) => Ok(false),
                }
            } else {
                Ok(tokio::fs::metadata(self.local_path(path)).await.is_ok())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_files_resolve_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("benchmarks");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("doc.json"), br#"{"ok": true}"#).unwrap();

        let fetcher = SourceFetcher::new(dir.path(), Duration::from_secs(1)).unwrap();
        let value: serde_json::Value = fetch_json(&fetcher, "/benchmarks/doc.json").await.unwrap();
        assert_eq!(value["ok"], true);
        assert!(fetcher.exists("benchmarks/doc.json").await.unwrap());
    }

    #[tokio::test]
    async fn missing_local_file_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = SourceFetcher::new(dir.path(), Duration::from_secs(1)).unwrap();
        let err = fetcher.fetch("/nope.json").await.unwrap_err();
        assert_eq!(
            err,
            BoardError::Status {
                path: "/nope.json".into(),
                status: 404
            }
        );
        assert!(probe(&fetcher, "/nope.json").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn malformed_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), b"{not json").unwrap();
        let fetcher = SourceFetcher::new(dir.path(), Duration::from_secs(1)).unwrap();
        let err = fetch_json::<serde_json::Value>(&fetcher, "bad.json").await.unwrap_err();
        assert!(matches!(err, BoardError::Parse { .. }));
    }
}
