use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use entropia_common::Config;
use entropia_engine::{CancelToken, Pipeline};

use crate::render;

use super::{apply_http_flags, apply_llm_flags, HttpFlags, LlmFlags};

#[derive(Args)]
pub struct ScanArgs {
    /// URL to scan
    pub url: String,

    /// Output JSON path
    #[arg(long, default_value = "report.json")]
    pub json: PathBuf,

    /// Output Markdown path (optional)
    #[arg(long)]
    pub md: Option<PathBuf>,

    /// Overall scan timeout in seconds (increase for pages with many
    /// evidence links)
    #[arg(long, default_value_t = 120)]
    pub timeout: u64,

    /// Disable the footer in Markdown reports
    #[arg(long = "no-footer")]
    pub no_footer: bool,

    #[command(flatten)]
    pub http: HttpFlags,

    #[command(flatten)]
    pub llm: LlmFlags,
}

pub async fn run(args: ScanArgs, verbose: bool) -> Result<()> {
    let mut config = Config::load().context("load configuration")?;
    config.http.timeout_secs = args.timeout;
    config.output.verbose = verbose;
    config.output.include_footer = !args.no_footer;
    apply_http_flags(&mut config, &args.http);
    apply_llm_flags(&mut config, &args.llm)?;

    info!(url = %args.url, timeout = args.timeout, cache = config.cache.enabled, "Scanning");

    let pipeline = Arc::new(Pipeline::new(config));
    let cancel = CancelToken::new();

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let report = pipeline
        .scan(&cancel, &args.url)
        .await
        .with_context(|| format!("scan failed: {}", args.url))?;

    render::render_json(&report, &args.json)?;
    info!(path = %args.json.display(), "Wrote JSON report");

    if let Some(md_path) = &args.md {
        render::render_markdown(&report, md_path, !args.no_footer)?;
        info!(path = %md_path.display(), "Wrote Markdown report");

        if let Some(summary) = report.llm.as_ref().filter(|s| s.enabled) {
            let llm_path = md_path.with_extension("llm.md");
            render::render_llm_markdown(summary, &llm_path)?;
            info!(path = %llm_path.display(), "Wrote LLM summary");
        }
    }

    render::print_summary(&report);
    Ok(())
}
