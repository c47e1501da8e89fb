use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs;
use tracing::{debug, info};
use url::Url;

use crate::config::DownloaderConfig;
use crate::error::{DownloadError, Result};
use crate::fetch::fetch_all;
use crate::progress::Progress;
use crate::range::partition;
use crate::transport::{HttpClient, ReqwestClient};
use crate::writer::write_chunks;

/// One resource to fetch into one file.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub url: Url,
    pub target: PathBuf,
    pub parallelism: usize,
}

impl DownloadJob {
    pub fn new(url: Url, target: impl Into<PathBuf>, parallelism: usize) -> Self {
        Self {
            url,
            target: target.into(),
            parallelism,
        }
    }
}

pub struct Downloader<C = ReqwestClient> {
    client: Arc<C>,
    progress: Progress,
}

impl Downloader<ReqwestClient> {
    pub fn new(config: &DownloaderConfig) -> Result<Self> {
        let client = ReqwestClient::new(config)?;
        Ok(Self::with_client(client, Progress::new(config.show_progress)))
    }
}

impl<C: HttpClient> Downloader<C> {
    pub fn with_client(client: C, progress: Progress) -> Self {
        Self {
            client: Arc::new(client),
            progress,
        }
    }

    /// Run `job` to completion: pre-flight check, HEAD, partition, fetch,
    /// reassemble. Returns the number of bytes written.
    ///
    /// Nothing touches the network if the target already exists, and no
    /// partial file is left behind on failure.
    pub async fn download(&self, job: &DownloadJob) -> Result<u64> {
        let url = job.url.as_str();

        if fs::try_exists(&job.target).await? {
            return Err(DownloadError::FileExists(job.target.clone()));
        }

        let total_size = self.content_length(url).await?;
        let plan = partition(total_size, job.parallelism);
        info!(
            url,
            total_size,
            parallelism = job.parallelism,
            chunks = plan.len(),
            "starting download"
        );

        self.progress.start(total_size, format!("Downloading {}", job.target.display()));

        let chunks = match fetch_all(Arc::clone(&self.client), url, &plan, &self.progress).await {
            Ok(chunks) => chunks,
            Err(e) => {
                self.progress.abandon();
                return Err(e);
            }
        };

        let written = match write_chunks(&job.target, &chunks).await {
            Ok(written) => written,
            Err(e) => {
                self.progress.abandon();
                return Err(e);
            }
        };

        self.progress.finish(format!("Completed   {}", job.target.display()));
        self.progress.status(format!("Downloaded: {:?}", url));
        info!(url, path = %job.target.display(), bytes = written, "download complete");
        Ok(written)
    }

    async fn content_length(&self, url: &str) -> Result<u64> {
        let head = self.client.head(url).await?;
        debug!(url, status = head.status, content_length = ?head.content_length, "HEAD response");

        if !(200..300).contains(&head.status) {
            return Err(DownloadError::UnexpectedStatus {
                url: url.to_string(),
                status: head.status,
                range: None,
            });
        }

        head.content_length.ok_or_else(|| {
            DownloadError::InvalidInput(format!("{} did not report a usable Content-Length", url))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockHttpClient;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tempfile::TempDir;

    fn job(dir: &TempDir, parallelism: usize) -> DownloadJob {
        DownloadJob::new(
            Url::parse("http://localhost:8080/foo.png").unwrap(),
            dir.path().join("foo.png"),
            parallelism,
        )
    }

    fn downloader(client: MockHttpClient) -> Downloader<MockHttpClient> {
        Downloader::with_client(client, Progress::hidden())
    }

    #[tokio::test]
    async fn test_downloads_and_reassembles_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let job = job(&temp_dir, 2);
        let d = downloader(
            MockHttpClient::new("ABCDE").with_delay("bytes=0-1", Duration::from_millis(40)),
        );

        let written = d.download(&job).await.unwrap();

        assert_eq!(written, 5);
        assert_eq!(std::fs::read(&job.target).unwrap(), b"ABCDE");
        assert_eq!(d.client.head_calls.load(Ordering::SeqCst), 1);
        assert_eq!(d.client.get_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_existing_target_makes_no_network_calls() {
        let temp_dir = TempDir::new().unwrap();
        let job = job(&temp_dir, 8);
        std::fs::write(&job.target, b"old").unwrap();
        let d = downloader(MockHttpClient::new("ABCDE"));

        let err = d.download(&job).await.unwrap_err();

        assert!(matches!(err, DownloadError::FileExists(ref p) if *p == job.target));
        assert_eq!(d.client.network_calls(), 0);
        assert_eq!(std::fs::read(&job.target).unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_failed_chunk_leaves_no_file() {
        let temp_dir = TempDir::new().unwrap();
        let job = job(&temp_dir, 3);
        let d = downloader(MockHttpClient::new("ABCDE").failing("bytes=1-1", 500));

        let err = d.download(&job).await.unwrap_err();

        assert!(matches!(err, DownloadError::UnexpectedStatus { status: 500, .. }));
        assert!(!job.target.exists());
        assert_eq!(d.client.completed_gets.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_head_error_status_stops_before_fetching() {
        let temp_dir = TempDir::new().unwrap();
        let job = job(&temp_dir, 4);
        let d = downloader(MockHttpClient::new("ABCDE").with_head_status(404));

        let err = d.download(&job).await.unwrap_err();

        assert!(matches!(
            err,
            DownloadError::UnexpectedStatus { status: 404, range: None, .. }
        ));
        assert_eq!(d.client.get_calls.load(Ordering::SeqCst), 0);
        assert!(!job.target.exists());
    }

    #[tokio::test]
    async fn test_unknown_length_is_invalid_input() {
        let temp_dir = TempDir::new().unwrap();
        let job = job(&temp_dir, 4);
        let d = downloader(MockHttpClient::new("ABCDE").without_content_length());

        let err = d.download(&job).await.unwrap_err();

        assert!(matches!(err, DownloadError::InvalidInput(_)));
        assert_eq!(d.client.get_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_resource_creates_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let job = job(&temp_dir, 8);
        let d = downloader(MockHttpClient::new(""));

        let written = d.download(&job).await.unwrap();

        assert_eq!(written, 0);
        assert_eq!(std::fs::metadata(&job.target).unwrap().len(), 0);
        assert_eq!(d.client.get_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_parallelism_uses_one_request() {
        let temp_dir = TempDir::new().unwrap();
        let job = job(&temp_dir, 0);
        let d = downloader(MockHttpClient::new("ABCDE"));

        d.download(&job).await.unwrap();

        assert_eq!(std::fs::read(&job.target).unwrap(), b"ABCDE");
        assert_eq!(d.client.get_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_parallelism_is_clamped_to_length() {
        let temp_dir = TempDir::new().unwrap();
        let job = job(&temp_dir, 6);
        let d = downloader(MockHttpClient::new("ABCDE"));

        d.download(&job).await.unwrap();

        assert_eq!(std::fs::read(&job.target).unwrap(), b"ABCDE");
        assert_eq!(d.client.get_calls.load(Ordering::SeqCst), 5);
    }
}
