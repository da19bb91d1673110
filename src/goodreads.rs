//! goodreads command: Convert an exported library to a Goodreads import CSV

use crate::schema::Book;
use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

pub const GOODREADS_HEADER: [&str; 14] = [
    "Title",
    "Author",
    "ISBN",
    "My Rating",
    "Average Rating",
    "Publisher",
    "Binding",
    "Year Published",
    "Original Publication Year",
    "Date Read",
    "Date Added",
    "Shelves",
    "Bookshelves",
    "My Review",
];

#[derive(Args)]
pub struct GoodreadsArgs {
    /// JSON file produced by `fetch` or `navigate`
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Read date for read books that have none (default: today)
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub def_date: Option<String>,

    /// Output CSV path (default: input path with .csv extension)
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct ConvertOutput {
    pub file: String,
    pub converted: usize,
    pub skipped: usize,
}

pub async fn run_goodreads(args: GoodreadsArgs) -> Result<()> {
    let content = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read file: {}", args.file.display()))?;
    let books: Vec<Book> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", args.file.display()))?;

    let today = Local::now().format("%Y-%m-%d").to_string();
    let def_date = args.def_date.unwrap_or_else(|| today.clone());

    let rows = to_goodreads_rows(&books, &def_date, &today);
    let csv = write_csv(&rows)?;

    let out = args.out.unwrap_or_else(|| args.file.with_extension("csv"));
    tokio::fs::write(&out, csv)
        .await
        .with_context(|| format!("Failed to write {}", out.display()))?;

    info!(converted = rows.len(), skipped = books.len() - rows.len(), "goodreads csv written");
    let output = ConvertOutput {
        file: out.display().to_string(),
        converted: rows.len(),
        skipped: books.len() - rows.len(),
    };
    println!("{}", serde_json::to_string(&output)?);

    Ok(())
}

/// Map the site's default shelves to Goodreads exclusive shelves
pub fn convert_shelf(shelf: &str) -> &'static str {
    match shelf {
        "Przeczytane" => "read",
        "Teraz czytam" => "currently-reading",
        "Chcę przeczytać" => "to-read",
        _ => "",
    }
}

/// Goodreads only takes read dates for the `read` shelf
pub fn read_date(date: &str, shelf: &str, default: &str) -> String {
    if shelf != "read" {
        String::new()
    } else if date.is_empty() {
        default.to_string()
    } else if date.len() > 4 {
        date.to_string()
    } else {
        format!("{date}-01-01")
    }
}

pub fn normalize_isbn(isbn: &str) -> String {
    isbn.trim().replace('-', "")
}

/// Rows for every book with a usable ISBN, in input order
pub fn to_goodreads_rows(books: &[Book], def_date: &str, today: &str) -> Vec<[String; 14]> {
    books
        .iter()
        .filter_map(|book| {
            let isbn = normalize_isbn(book.isbn.as_deref().unwrap_or_default());
            if isbn.is_empty() || isbn.bytes().all(|b| b == b'0') {
                return None;
            }

            let shelf = convert_shelf(book.shelves.first().map(String::as_str).unwrap_or_default());
            // Site ratings are 1-10, Goodreads 1-5
            let rating = book.rate.map(|r| (r / 2).to_string()).unwrap_or_default();

            Some([
                book.name.clone(),
                book.author.clone().unwrap_or_default(),
                isbn,
                rating,
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                read_date(&book.read_date, shelf, def_date),
                today.to_string(),
                shelf.to_string(),
                String::new(),
                book.opinion.clone().unwrap_or_default(),
            ])
        })
        .collect()
}

/// Header plus rows, every field quoted
pub fn write_csv(rows: &[[String; 14]]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::new());

    writer.write_record(GOODREADS_HEADER)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV: {}", e.error()))
}
