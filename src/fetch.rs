//! Concurrent ranged fetching.
//!
//! One task is spawned per planned range. The coordinator drains every task
//! before returning, even after a failure, and only then decides between the
//! full result set and the first error it observed.

use std::sync::Arc;

use bytes::Bytes;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::{DownloadError, Result};
use crate::progress::Progress;
use crate::range::ByteRange;
use crate::transport::{HttpClient, RangeResponse};

const PARTIAL_CONTENT: u16 = 206;

/// The buffered body of one planned range.
#[derive(Debug, Clone)]
pub struct ChunkResult {
    pub index: usize,
    pub body: Bytes,
    /// Declared `Content-Length` of the response, if any.
    pub length: Option<u64>,
}

/// Fetch every range of `plan` concurrently.
///
/// The returned chunks are ordered by plan index regardless of the order in
/// which responses arrived. If any fetch fails, all results are dropped and
/// the first error seen is returned once every task has finished.
pub async fn fetch_all<C: HttpClient>(
    client: Arc<C>,
    url: &str,
    plan: &[ByteRange],
    progress: &Progress,
) -> Result<Vec<ChunkResult>> {
    let mut tasks = JoinSet::new();

    for (index, range) in plan.iter().copied().enumerate() {
        let client = Arc::clone(&client);
        let url = url.to_string();
        let progress = progress.clone();

        tasks.spawn(async move {
            let result = fetch_range(client.as_ref(), &url, index, range, &progress).await;
            (index, result)
        });
    }

    // Each slot is written by exactly one task and read after the barrier.
    let mut slots: Vec<Option<ChunkResult>> = (0..plan.len()).map(|_| None).collect();
    let mut first_error: Option<DownloadError> = None;

    while let Some(joined) = tasks.join_next().await {
        let error = match joined {
            Ok((index, Ok(chunk))) => {
                slots[index] = Some(chunk);
                continue;
            }
            Ok((index, Err(e))) => {
                warn!(index, error = %e, "chunk fetch failed");
                e
            }
            Err(e) => {
                warn!(error = %e, "chunk task did not complete");
                DownloadError::from(e)
            }
        };
        if first_error.is_none() {
            first_error = Some(error);
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.ok_or_else(|| DownloadError::TaskFailed(format!("chunk {} produced no result", index)))
        })
        .collect()
}

async fn fetch_range<C: HttpClient>(
    client: &C,
    url: &str,
    index: usize,
    range: ByteRange,
    progress: &Progress,
) -> Result<ChunkResult> {
    let header = range.header_value();
    debug!(index, range = %header, "requesting chunk");

    let response = client.get_range(url, &header).await?;

    let declared = response
        .content_length
        .map(|n| n.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    progress.status(format!("i: {}, ContentLength: {}, Range: {}", index, declared, header));

    check_response(url, range, &response)?;
    progress.inc(response.body.len() as u64);

    debug!(index, status = response.status, bytes = response.body.len(), "chunk received");
    Ok(ChunkResult {
        index,
        length: response.content_length,
        body: response.body,
    })
}

/// 206 is always accepted. Any other 2xx must carry exactly the requested
/// span, otherwise the server ignored the `Range` header.
fn check_response(url: &str, range: ByteRange, response: &RangeResponse) -> Result<()> {
    match response.status {
        PARTIAL_CONTENT => Ok(()),
        200..=299 => {
            let actual = response.body.len() as u64;
            if actual == range.len() {
                Ok(())
            } else {
                Err(DownloadError::RangeNotHonored {
                    range,
                    expected: range.len(),
                    actual,
                })
            }
        }
        status => Err(DownloadError::UnexpectedStatus {
            url: url.to_string(),
            status,
            range: Some(range),
        }),
    }
}
