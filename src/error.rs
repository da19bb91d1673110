//! Error type shared by the scraping pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a run.
///
/// Missing fields in the scraped markup are never reported here; they
/// degrade to empty values inside the extractor.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Listing page {page} returned an unexpected payload: {source}")]
    ListingPayload {
        page: u32,
        #[source]
        source: serde_json::Error,
    },

    #[error("No {0} found in the library document")]
    MissingToken(&'static str),

    #[error("Session cookie is not a valid header value")]
    InvalidCookie,

    #[error("Browser error: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),

    #[error("Browser config error: {0}")]
    BrowserConfig(String),

    #[error("No next page to advance to after page {page}")]
    PaginationExhausted { page: u32 },

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize export: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T, E = ScrapeError> = std::result::Result<T, E>;
