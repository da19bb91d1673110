//! lc-export CLI
//!
//! Exports a lubimyczytac.pl library using an existing logged-in session.

use anyhow::Result;
use clap::{Parser, Subcommand};
use lc_export::fetch::{run_fetch, FetchArgs};
use lc_export::goodreads::{run_goodreads, GoodreadsArgs};
use lc_export::logging;
use lc_export::navigate::{run_navigate, NavigateArgs};

#[derive(Parser)]
#[command(name = "lc-export")]
#[command(version)]
#[command(about = "Export your lubimyczytac.pl library to JSON")]
#[command(long_about = "Exports a personal library using a logged-in session cookie.\n\nCommands:\n  fetch      Fetch all listing pages concurrently (with ISBNs)\n  navigate   Page through the library in headless Chrome\n  goodreads  Convert an export to a Goodreads import CSV")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch all listing pages through the site's endpoint
    Fetch(FetchArgs),
    /// Page through the rendered library in headless Chrome
    Navigate(NavigateArgs),
    /// Convert an exported JSON file into a Goodreads import CSV
    Goodreads(GoodreadsArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init()?;

    match cli.command {
        Commands::Fetch(args) => run_fetch(args).await,
        Commands::Navigate(args) => run_navigate(args).await,
        Commands::Goodreads(args) => run_goodreads(args).await,
    }
}
