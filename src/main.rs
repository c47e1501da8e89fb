mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use pdl::utils::resolve_target;
use pdl::{DownloadJob, Downloader};

use crate::cli::Args;

fn main() -> Result<()> {
    let args = Args::parse();
    pdl::init_logging("pdl=info");

    let target = resolve_target(&args.url, args.output.as_deref());
    let job = DownloadJob::new(args.url.clone(), target, args.parallelism);
    let config = args.downloader_config();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let downloader = Downloader::new(&config)?;
        downloader
            .download(&job)
            .await
            .with_context(|| format!("Failed to download {}", job.url))?;
        Ok::<(), anyhow::Error>(())
    })
}
