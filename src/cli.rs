use std::path::PathBuf;
use std::time::Duration;

use clap::builder::TypedValueParser;
use clap::Parser;
use pdl::{DownloaderConfig, DEFAULT_PARALLELISM};
use url::Url;

#[derive(Parser, Debug)]
#[command(author, version, about = "Download a file over HTTP with parallel range requests", long_about = None)]
pub struct Args {
    /// URL of the resource to download
    #[arg(index = 1, value_parser = parse_http_url)]
    pub url: Url,

    /// Number of concurrent range requests
    #[arg(short = 'p', long, default_value_t = DEFAULT_PARALLELISM, value_parser = clap::value_parser!(u64).range(1..).map(|n| n as usize))]
    pub parallelism: usize,

    /// Output file (derived from the URL when omitted)
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Per-request timeout in seconds (no timeout by default)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Suppress status lines and the progress bar
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

impl Args {
    pub fn downloader_config(&self) -> DownloaderConfig {
        DownloaderConfig {
            request_timeout: self.timeout.map(Duration::from_secs),
            show_progress: !self.quiet,
            ..DownloaderConfig::default()
        }
    }
}

fn parse_http_url(s: &str) -> Result<Url, String> {
    let url = Url::parse(s).map_err(|e| format!("invalid URL '{}': {}", s, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{}', expected http or https", other)),
    }
}
