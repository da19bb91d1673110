//! Serialize the collected books and hand them to a file sink

use crate::error::{Result, ScrapeError};
use crate::schema::Book;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::path::{Path, PathBuf};
use tracing::info;

pub const EXPORT_FILENAME: &str = "lc_books.json";
pub const EXPORT_MEDIA_TYPE: &str = "application/json";

/// Destination for the exported payload
#[async_trait]
pub trait FileSink: Sync {
    async fn save(&self, payload: &[u8], filename: &str, media_type: &str) -> Result<()>;
}

/// Writes exports into a directory on disk
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }
}

#[async_trait]
impl FileSink for DirectorySink {
    async fn save(&self, payload: &[u8], filename: &str, media_type: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| io_error(&self.dir, source))?;

        let path = self.path_for(filename);
        tokio::fs::write(&path, payload)
            .await
            .map_err(|source| io_error(&path, source))?;

        info!(path = %path.display(), bytes = payload.len(), media_type, "export written");
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ScrapeError {
    ScrapeError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// JSON array with 4-space indentation
pub fn to_pretty_json(books: &[Book]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    books.serialize(&mut ser)?;
    Ok(buf)
}

/// Serialize `books` and save them under `filename`
pub async fn export<F: FileSink + ?Sized>(books: &[Book], filename: &str, sink: &F) -> Result<()> {
    let payload = to_pretty_json(books)?;
    sink.save(&payload, filename, EXPORT_MEDIA_TYPE).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Vec<Book> {
        vec![
            Book {
                name: "Dune".to_string(),
                author: Some("Frank Herbert".to_string()),
                rate: Some(5),
                shelves: vec!["read".to_string()],
                average_rate: Some(4.2),
                href: Some("https://lubimyczytac.pl/ksiazka/1/dune".to_string()),
                isbn: Some("9780441013593".to_string()),
                ..Default::default()
            },
            Book {
                name: "Neuromancer".to_string(),
                rate: Some(3),
                opinion: Some("Dated, still great".to_string()),
                read_date: "2020-05-01".to_string(),
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_four_space_indent() {
        let json = String::from_utf8(to_pretty_json(&sample()).unwrap()).unwrap();
        assert!(json.starts_with("[\n    {\n        \"name\": \"Dune\""));
        assert!(!json.contains('\t'));
    }

    #[test]
    fn test_export_roundtrip() {
        let books = sample();
        let json = to_pretty_json(&books).unwrap();
        let parsed: Vec<Book> = serde_json::from_slice(&json).unwrap();
        assert_eq!(parsed, books);
    }

    #[test]
    fn test_empty_collection() {
        assert_eq!(to_pretty_json(&[]).unwrap(), b"[]");
    }

    #[tokio::test]
    async fn test_directory_sink_writes_file() {
        let dir = tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("out"));

        export(&sample(), EXPORT_FILENAME, &sink).await.unwrap();

        let written = std::fs::read(sink.path_for(EXPORT_FILENAME)).unwrap();
        assert_eq!(written, to_pretty_json(&sample()).unwrap());
    }
}
