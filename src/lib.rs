//! Parallel ranged HTTP downloads.
//!
//! A resource is split into byte ranges, each range is fetched with its own
//! `Range` request, and the bodies are written back to disk in their original
//! order.

pub mod config;
pub mod downloader;
pub mod error;
pub mod fetch;
pub mod fixture;
pub mod progress;
pub mod range;
pub mod transport;
pub mod utils;
pub mod writer;

pub use config::{DownloaderConfig, DEFAULT_PARALLELISM};
pub use downloader::{DownloadJob, Downloader};
pub use error::{DownloadError, Result};
pub use fetch::ChunkResult;
pub use range::{partition, ByteRange};
pub use transport::{HttpClient, ReqwestClient};

/// Install the stderr `tracing` subscriber, honoring `RUST_LOG`.
pub fn init_logging(default_directive: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
