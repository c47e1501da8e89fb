use std::io::{self, ErrorKind};
use std::path::Path;

use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::error::{DownloadError, Result};
use crate::fetch::ChunkResult;

/// Write `chunks` to a newly created file at `path` in index order.
///
/// The file must not exist yet. If anything goes wrong after it was created,
/// it is removed before the error is returned. Returns the number of bytes
/// written.
pub async fn write_chunks(path: &Path, chunks: &[ChunkResult]) -> Result<u64> {
    write_chunks_via(path, chunks, |file| file).await
}

/// Same as [`write_chunks`], with the created file wrapped by `wrap` before
/// any byte is written.
async fn write_chunks_via<W, F>(path: &Path, chunks: &[ChunkResult], wrap: F) -> Result<u64>
where
    W: AsyncWrite + Unpin,
    F: FnOnce(fs::File) -> W,
{
    let mut ordered: Vec<&ChunkResult> = chunks.iter().collect();
    ordered.sort_by_key(|c| c.index);
    if let Some((position, chunk)) = ordered.iter().enumerate().find(|(i, c)| c.index != *i) {
        return Err(DownloadError::InvalidInput(format!(
            "chunk set has a gap: expected index {}, found {}",
            position, chunk.index
        )));
    }

    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => DownloadError::FileExists(path.to_path_buf()),
            _ => DownloadError::Io(e),
        })?;

    match write_ordered(wrap(file), &ordered).await {
        Ok(written) => {
            debug!(path = %path.display(), bytes = written, "output file written");
            Ok(written)
        }
        Err(e) => Err(discard_partial(path, e).await),
    }
}

async fn write_ordered<W>(mut writer: W, chunks: &[&ChunkResult]) -> io::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let written = copy_chunks(&mut writer, chunks).await?;
    writer.shutdown().await?;
    Ok(written)
}

async fn copy_chunks<W>(writer: &mut W, chunks: &[&ChunkResult]) -> io::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0u64;
    for chunk in chunks {
        writer.write_all(&chunk.body).await?;
        written += chunk.body.len() as u64;
    }
    writer.flush().await?;
    Ok(written)
}

async fn discard_partial(path: &Path, cause: io::Error) -> DownloadError {
    warn!(path = %path.display(), error = %cause, "removing partially written file");
    if let Err(e) = fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "failed to remove partial file");
    }
    DownloadError::Io(cause)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tempfile::TempDir;

    fn chunk(index: usize, body: &'static str) -> ChunkResult {
        ChunkResult {
            index,
            body: Bytes::from_static(body.as_bytes()),
            length: Some(body.len() as u64),
        }
    }

    #[tokio::test]
    async fn test_out_of_order_chunks_are_written_in_index_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.bin");
        let chunks = vec![chunk(2, "GHIJ"), chunk(0, "ABC"), chunk(1, "DEF")];

        let written = write_chunks(&path, &chunks).await.unwrap();

        assert_eq!(written, 10);
        assert_eq!(std::fs::read(&path).unwrap(), b"ABCDEFGHIJ");
    }

    #[tokio::test]
    async fn test_existing_file_is_not_overwritten() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.bin");
        std::fs::write(&path, b"keep me").unwrap();

        let err = write_chunks(&path, &[chunk(0, "AB")]).await.unwrap_err();

        assert!(matches!(err, DownloadError::FileExists(_)));
        assert_eq!(std::fs::read(&path).unwrap(), b"keep me");
    }

    #[tokio::test]
    async fn test_gap_in_chunks_is_rejected_before_creating_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.bin");

        let err = write_chunks(&path, &[chunk(0, "AB"), chunk(2, "E")]).await.unwrap_err();

        assert!(matches!(err, DownloadError::InvalidInput(_)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_missing_directory_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join("out.bin");

        let err = write_chunks(&path, &[chunk(0, "AB")]).await.unwrap_err();

        assert!(matches!(err, DownloadError::Io(_)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_no_chunks_creates_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty.bin");

        let written = write_chunks(&path, &[]).await.unwrap();

        assert_eq!(written, 0);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    struct BrokenPipe;

    impl AsyncWrite for BrokenPipe {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &[u8],
        ) -> std::task::Poll<io::Result<usize>> {
            std::task::Poll::Ready(Err(io::Error::new(ErrorKind::BrokenPipe, "disk went away")))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_copy_stops_at_first_write_error() {
        let chunks = [chunk(0, "ABC"), chunk(1, "DE")];
        let refs: Vec<&ChunkResult> = chunks.iter().collect();

        let err = copy_chunks(&mut BrokenPipe, &refs).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_failed_write_after_create_removes_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.bin");
        let chunks = [chunk(1, "DE"), chunk(0, "ABC")];

        let err = write_chunks_via(&path, &chunks, |file| {
            drop(file);
            BrokenPipe
        })
        .await
        .unwrap_err();

        assert!(matches!(err, DownloadError::Io(ref e) if e.kind() == ErrorKind::BrokenPipe));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_discard_partial_removes_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("partial.bin");
        std::fs::write(&path, b"ABC").unwrap();

        let err = discard_partial(&path, io::Error::new(ErrorKind::Other, "boom")).await;

        assert!(matches!(err, DownloadError::Io(_)));
        assert!(!path.exists());
    }
}
