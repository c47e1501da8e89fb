//! Dummy HTTP server that can return partial content, random failures and
//! random latency. Run it next to `pdl` for manual testing:
//!
//! ```text
//! cargo run --bin dummy_server -- --failure-rate 10
//! cargo run --bin pdl -- -p 4 http://localhost:8080/lorem.txt
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use pdl::fixture::{self, FixtureConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "Dummy server that serves a file in byte ranges", long_about = None)]
struct Args {
    /// Port on which the dummy server listens
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Probability (percent) to answer a GET with 500 Internal Server Error
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=100))]
    failure_rate: u8,

    /// Maximum random delay in milliseconds before answering a non-HEAD request
    #[arg(long, default_value_t = 1000)]
    max_delay_ms: u64,

    /// File to serve; it is exposed under `/<file name>`
    #[arg(long, default_value = "testdata/lorem.txt")]
    file: PathBuf,

    /// Seed for delays and failures (random when omitted)
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    pdl::init_logging("info");

    let contents = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let name = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("--file must name a file")?;
    let route = format!("/{}", name);

    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let config = FixtureConfig::new(route.clone(), contents)
        .with_failure_rate(args.failure_rate)
        .with_max_delay(Duration::from_millis(args.max_delay_ms));

    println!(
        "=> starting with a failure rate of {}% on http://localhost:{}",
        args.failure_rate, args.port
    );
    println!("Endpoint:\n  GET {}  # {} bytes", route, config.contents.len());

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let listener = TcpListener::bind(("0.0.0.0", args.port))
            .await
            .with_context(|| format!("Failed to bind port {}", args.port))?;
        info!(port = args.port, "dummy server listening");
        axum::serve(listener, fixture::router(config, rng))
            .await
            .context("Dummy server failed")?;
        Ok::<(), anyhow::Error>(())
    })
}
