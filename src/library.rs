//! Accumulated book collection and enrichment merge

use crate::schema::{Book, BookDetails};
use std::collections::HashMap;

/// How books from successive listing pages are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Keep every entry in page order
    Append,
    /// One record per `href`; a later entry replaces the earlier one in place
    DedupByLink,
}

/// Ordered book collection
#[derive(Debug, Clone)]
pub struct Library {
    policy: MergePolicy,
    books: Vec<Book>,
    by_link: HashMap<String, usize>,
}

impl Library {
    pub fn new(policy: MergePolicy) -> Self {
        Self {
            policy,
            books: Vec::new(),
            by_link: HashMap::new(),
        }
    }

    /// Add a book. Returns false when it replaced an existing record.
    pub fn insert(&mut self, book: Book) -> bool {
        if self.policy == MergePolicy::DedupByLink {
            if let Some(href) = &book.href {
                if let Some(&idx) = self.by_link.get(href) {
                    self.books[idx] = book;
                    return false;
                }
                self.by_link.insert(href.clone(), self.books.len());
            }
        }
        self.books.push(book);
        true
    }

    pub fn extend<I: IntoIterator<Item = Book>>(&mut self, books: I) {
        for book in books {
            self.insert(book);
        }
    }

    /// Distinct book links, in collection order
    pub fn links(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.books
            .iter()
            .filter_map(|b| b.href.clone())
            .filter(|href| seen.insert(href.clone()))
            .collect()
    }

    /// Merge detail-page fields into matching books
    ///
    /// `isbn` comes from the detail page; `author` and `average_rate` only
    /// fill gaps the listing left. Returns how many books matched.
    pub fn merge_details(&mut self, details: &HashMap<String, BookDetails>) -> usize {
        let mut matched = 0;
        for book in &mut self.books {
            let Some(entry) = book.href.as_ref().and_then(|href| details.get(href)) else {
                continue;
            };
            matched += 1;

            book.isbn = entry.isbn.clone();
            if book.author.as_deref().map_or(true, str::is_empty) {
                book.author = entry.author.clone();
            }
            if book.average_rate.is_none() {
                book.average_rate = entry.rating;
            }
        }
        matched
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn into_books(self) -> Vec<Book> {
        self.books
    }
}
