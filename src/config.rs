use std::time::Duration;

/// Number of concurrent range requests when none is given.
pub const DEFAULT_PARALLELISM: usize = 8;

pub const DEFAULT_USER_AGENT: &str = concat!("pdl/", env!("CARGO_PKG_VERSION"));

/// Knobs shared by the HTTP client and the downloader.
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    pub user_agent: String,
    pub connect_timeout: Duration,
    /// Whole-request timeout for HEAD and every ranged GET. `None` waits forever.
    pub request_timeout: Option<Duration>,
    /// Draw status lines and the progress bar on stderr.
    pub show_progress: bool,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            show_progress: true,
        }
    }
}
