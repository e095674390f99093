use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use entropia_common::Config;
use entropia_engine::{BatchProcessor, Pipeline};

use crate::render;

use super::{apply_http_flags, apply_llm_flags, HttpFlags, LlmFlags};

#[derive(Args)]
pub struct BatchArgs {
    /// File containing URLs, one per line
    pub file: PathBuf,

    /// Number of concurrent workers
    #[arg(long, default_value_t = default_concurrency())]
    pub concurrency: usize,

    /// Output directory for reports
    #[arg(long = "output-dir", default_value = "./entropia-reports")]
    pub output_dir: PathBuf,

    /// Total timeout for batch processing, in seconds
    #[arg(long, default_value_t = 600)]
    pub timeout: u64,

    /// Timeout for individual scans, in seconds
    #[arg(long = "scan-timeout", default_value_t = 30)]
    pub scan_timeout: u64,

    /// Disable the footer in Markdown reports
    #[arg(long = "no-footer")]
    pub no_footer: bool,

    #[command(flatten)]
    pub http: HttpFlags,

    #[command(flatten)]
    pub llm: LlmFlags,
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

pub async fn run(args: BatchArgs, verbose: bool) -> Result<()> {
    let mut config = Config::load().context("load configuration")?;
    config.http.timeout_secs = args.scan_timeout;
    config.concurrency.workers = args.concurrency;
    config.output.verbose = verbose;
    config.output.include_footer = !args.no_footer;
    apply_http_flags(&mut config, &args.http);
    apply_llm_flags(&mut config, &args.llm)?;

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("create output directory {}", args.output_dir.display()))?;

    info!(
        file = %args.file.display(),
        workers = args.concurrency,
        output_dir = %args.output_dir.display(),
        "Batch processing"
    );

    let pipeline = Arc::new(Pipeline::new(config));
    let processor = Arc::new(BatchProcessor::new(pipeline, args.concurrency));

    let interrupter = processor.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupter.shutdown();
        }
    });

    let deadline = Duration::from_secs(args.timeout);
    let runner = processor.clone();
    let file = args.file.clone();
    let outcomes = match tokio::time::timeout(deadline, async move {
        runner.process_file(&file).await
    })
    .await
    {
        Ok(outcomes) => outcomes?,
        Err(_) => {
            // Deadline hit: cancel in-flight work and drain what we have.
            processor.shutdown();
            anyhow::bail!("batch deadline of {}s exceeded", args.timeout);
        }
    };

    let mut success = 0usize;
    let mut failed = 0usize;

    for outcome in &outcomes {
        match (&outcome.report, &outcome.error) {
            (Some(report), _) => {
                success += 1;
                let slug = render::sanitize_filename(&report.subject);
                let json_path = args.output_dir.join(format!("{slug}.json"));
                let md_path = args.output_dir.join(format!("{slug}.md"));
                render::render_json(report, &json_path)?;
                render::render_markdown(report, &md_path, !args.no_footer)?;
                if let Some(summary) = report.llm.as_ref().filter(|s| s.enabled) {
                    let llm_path = args.output_dir.join(format!("{slug}.llm.md"));
                    render::render_llm_markdown(summary, &llm_path)?;
                }
                println!("✓ {} (index: {}/100)", outcome.url, report.score.index);
            }
            (None, Some(error)) => {
                failed += 1;
                eprintln!("✗ {}: {}", outcome.url, error);
            }
            (None, None) => {
                failed += 1;
                eprintln!("✗ {}: no result", outcome.url);
            }
        }
    }

    println!();
    println!("Batch complete: {} total, {success} succeeded, {failed} failed", outcomes.len());
    println!("Reports written to {}", args.output_dir.display());

    Ok(())
}
