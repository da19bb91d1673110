//! navigate command: Export the library by paging through it in Chrome

use crate::browser::{keep_primary, BrowserSession, NavigationSource, SettleConfig};
use crate::client::{Session, DEFAULT_BASE_URL};
use crate::export::{export, DirectorySink, EXPORT_FILENAME};
use crate::fetch::ExportOutput;
use crate::source::collect_library;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use url::Url;

#[derive(Args)]
pub struct NavigateArgs {
    /// Site root
    #[arg(long, env = "LC_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: Url,

    /// Cookie header of a logged-in browser session
    #[arg(long, env = "LC_SESSION_COOKIE", hide_env_values = true)]
    pub cookie: String,

    /// Longest wait for a page to re-render after "next", in milliseconds
    #[arg(long, default_value = "5000")]
    pub settle_timeout: u64,

    /// How often to check for the re-render, in milliseconds
    #[arg(long, default_value = "250", value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval: u64,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Directory to write the export into
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Export file name
    #[arg(long, default_value = EXPORT_FILENAME)]
    pub filename: String,
}

pub async fn run_navigate(args: NavigateArgs) -> Result<()> {
    let session = Session::new(args.cookie);
    let browser = BrowserSession::open(&args.base_url, &session, !args.headed)
        .await
        .context("Failed to launch Chrome. Is Chrome/Chromium installed?")?;

    let settle = SettleConfig {
        timeout: Duration::from_millis(args.settle_timeout),
        poll_interval: Duration::from_millis(args.poll_interval),
    };
    let mut source = NavigationSource::new(browser, settle, Some(args.base_url));

    let collected = collect_library(&mut source).await;
    let closed = source.into_navigator().close().await;
    let library = keep_primary(collected, closed).context("Failed to page through the library")?;

    let sink = DirectorySink::new(&args.out_dir);
    export(library.books(), &args.filename, &sink)
        .await
        .context("Failed to export library")?;

    let output = ExportOutput {
        file: sink.path_for(&args.filename).display().to_string(),
        books: library.len(),
        enriched: None,
    };
    println!("{}", serde_json::to_string(&output)?);
    info!(books = output.books, "done");

    Ok(())
}
