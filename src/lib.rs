//! lc-export: Export a lubimyczytac.pl personal library
//!
//! Commands:
//! - fetch: page through the listing endpoint concurrently, enrich with ISBNs
//! - navigate: page through the rendered library in headless Chrome
//! - goodreads: convert an export into a Goodreads import CSV

pub mod browser;
pub mod client;
pub mod error;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod goodreads;
pub mod library;
pub mod logging;
pub mod navigate;
pub mod schema;
pub mod source;

pub use client::{LibraryClient, Session};
pub use error::ScrapeError;
pub use export::{export, to_pretty_json, DirectorySink, FileSink};
pub use library::{Library, MergePolicy};
pub use schema::{Book, BookDetails};
pub use source::{collect_library, enrich, DetailSource, PageSource};
