//! fetch command: Export the library through the site's listing endpoint
//!
//! One concurrent request per listing page, then one per book detail page
//! for ISBNs.

use crate::client::{LibraryClient, Session, DEFAULT_BASE_URL};
use crate::export::{export, DirectorySink, EXPORT_FILENAME};
use crate::source::{collect_library, enrich};
use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use url::Url;

#[derive(Args)]
pub struct FetchArgs {
    /// Site root
    #[arg(long, env = "LC_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: Url,

    /// Cookie header of a logged-in browser session
    #[arg(long, env = "LC_SESSION_COOKIE", hide_env_values = true)]
    pub cookie: String,

    /// Anti-forgery token (read from the library page when omitted)
    #[arg(long, env = "LC_CSRF_TOKEN", hide_env_values = true)]
    pub csrf_token: Option<String>,

    /// Skip fetching book detail pages (no ISBNs)
    #[arg(long)]
    pub no_details: bool,

    /// Directory to write the export into
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Export file name
    #[arg(long, default_value = EXPORT_FILENAME)]
    pub filename: String,
}

/// Summary printed to stdout (compact JSON)
#[derive(Debug, Serialize)]
pub struct ExportOutput {
    pub file: String,
    pub books: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enriched: Option<usize>,
}

pub async fn run_fetch(args: FetchArgs) -> Result<()> {
    let session = Session {
        cookie: args.cookie,
        csrf_token: args.csrf_token,
    };
    let mut client = LibraryClient::new(args.base_url, session)?;

    let mut library = collect_library(&mut client)
        .await
        .context("Failed to fetch library pages")?;

    let enriched = if args.no_details {
        None
    } else {
        Some(enrich(&mut library, &client).await)
    };

    let sink = DirectorySink::new(&args.out_dir);
    export(library.books(), &args.filename, &sink)
        .await
        .context("Failed to export library")?;

    let output = ExportOutput {
        file: sink.path_for(&args.filename).display().to_string(),
        books: library.len(),
        enriched,
    };
    println!("{}", serde_json::to_string(&output)?);
    info!(books = output.books, "done");

    Ok(())
}
