//! Page sources and the collection pipeline shared by both of them

use crate::error::Result;
use crate::extract::{extract_books, page_count};
use crate::library::{Library, MergePolicy};
use crate::schema::BookDetails;
use async_trait::async_trait;
use scraper::Html;
use std::collections::HashMap;
use tracing::info;
use url::Url;

/// Where listing pages come from
#[async_trait]
pub trait PageSource: Send {
    /// Document the page count is read from
    async fn first_document(&mut self) -> Result<String>;

    /// One HTML fragment per page, in page order
    async fn listing_pages(&mut self, page_count: u32) -> Result<Vec<String>>;

    fn merge_policy(&self) -> MergePolicy;

    /// Base for resolving relative book links
    fn base_url(&self) -> Option<&Url>;
}

/// Fetches per-book detail pages for enrichment
#[async_trait]
pub trait DetailSource: Sync {
    /// Details keyed by the requested link. Links that failed are left out.
    async fn book_details(&self, links: &[String]) -> HashMap<String, BookDetails>;
}

/// Resolve the page count, pull every listing page and extract the books
pub async fn collect_library<S: PageSource + ?Sized>(source: &mut S) -> Result<Library> {
    let first = source.first_document().await?;
    let pages = page_count(&Html::parse_document(&first));
    info!(pages, "resolved page count");

    let fragments = source.listing_pages(pages).await?;
    let base = source.base_url().cloned();

    let mut library = Library::new(source.merge_policy());
    for (idx, fragment) in fragments.iter().enumerate() {
        let books = extract_books(&Html::parse_document(fragment), base.as_ref());
        library.extend(books);
        info!(page = idx + 1, books = library.len(), "page scraped");
    }

    Ok(library)
}

/// Enrich every distinct link in the library from its detail page
pub async fn enrich<D: DetailSource + ?Sized>(library: &mut Library, details: &D) -> usize {
    let links = library.links();
    info!(links = links.len(), "fetching book details");

    let found = details.book_details(&links).await;
    let matched = library.merge_details(&found);
    info!(matched, "merged book details");
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::to_pretty_json;
    use crate::schema::Book;

    /// Serves canned fragments, page 1 doubling as the first document
    struct StubSource {
        pages: Vec<String>,
        policy: MergePolicy,
        requested: Option<u32>,
    }

    #[async_trait]
    impl PageSource for StubSource {
        async fn first_document(&mut self) -> Result<String> {
            Ok(self.pages[0].clone())
        }

        async fn listing_pages(&mut self, page_count: u32) -> Result<Vec<String>> {
            self.requested = Some(page_count);
            Ok(self.pages.iter().take(page_count as usize).cloned().collect())
        }

        fn merge_policy(&self) -> MergePolicy {
            self.policy
        }

        fn base_url(&self) -> Option<&Url> {
            None
        }
    }

    struct StubDetails(HashMap<String, BookDetails>);

    #[async_trait]
    impl DetailSource for StubDetails {
        async fn book_details(&self, _links: &[String]) -> HashMap<String, BookDetails> {
            self.0.clone()
        }
    }

    const PAGINATION: &str = r#"<ul><li data-page="1">1</li><li data-page="2">2</li></ul>"#;

    fn dune_page() -> String {
        format!(
            r#"{PAGINATION}
            <div class="authorAllBooks__single">
                <div class="authorAllBooks__singleImg"><div>Okładka</div></div>
                <a class="authorAllBooks__singleTextTitle" href="/ksiazka/1/dune">Dune</a>
                <div class="authorAllBooks__singleTextAuthor"><a>Frank Herbert</a></div>
                <div class="authorAllBooks__singleTextShelfRight"><a>read</a></div>
                <span class="listLibrary__ratingStarsNumber">5</span>
                <span class="listLibrary__ratingStarsNumber">4.2</span>
            </div>"#
        )
    }

    fn neuromancer_page() -> String {
        format!(
            r#"{PAGINATION}
            <div class="authorAllBooks__single">
                <div class="authorAllBooks__singleImg"><div>Okładka<br>2020-05-01</div></div>
                <a class="authorAllBooks__singleTextTitle" href="/ksiazka/2/neuromancer">Neuromancer</a>
                <span class="listLibrary__ratingStarsNumber">3</span>
                <span class="listLibrary__ratingStarsNumber"></span>
            </div>"#
        )
    }

    #[tokio::test]
    async fn test_two_page_library_end_to_end() {
        let mut source = StubSource {
            pages: vec![dune_page(), neuromancer_page()],
            policy: MergePolicy::Append,
            requested: None,
        };

        let library = collect_library(&mut source).await.unwrap();
        assert_eq!(source.requested, Some(2));

        let json = to_pretty_json(library.books()).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(
            parsed,
            serde_json::json!([
                {
                    "name": "Dune",
                    "author": "Frank Herbert",
                    "rate": 5,
                    "read_date": "",
                    "shelves": ["read"],
                    "average_rate": 4.2,
                    "href": "/ksiazka/1/dune"
                },
                {
                    "name": "Neuromancer",
                    "rate": 3,
                    "read_date": "2020-05-01",
                    "shelves": [],
                    "href": "/ksiazka/2/neuromancer"
                }
            ])
        );
    }

    #[tokio::test]
    async fn test_same_link_on_two_pages_collapses() {
        let mut source = StubSource {
            pages: vec![dune_page(), dune_page()],
            policy: MergePolicy::DedupByLink,
            requested: None,
        };

        let library = collect_library(&mut source).await.unwrap();
        assert_eq!(library.len(), 1);
        assert_eq!(library.books()[0].name, "Dune");
    }

    #[tokio::test]
    async fn test_enrich_merges_by_link() {
        let mut source = StubSource {
            pages: vec![dune_page(), neuromancer_page()],
            policy: MergePolicy::DedupByLink,
            requested: None,
        };
        let mut library = collect_library(&mut source).await.unwrap();

        let details = StubDetails(HashMap::from([(
            "/ksiazka/1/dune".to_string(),
            BookDetails {
                href: "/ksiazka/1/dune".to_string(),
                isbn: Some("9780441013593".to_string()),
                author: Some("Someone Else".to_string()),
                rating: None,
            },
        )]));

        assert_eq!(enrich(&mut library, &details).await, 1);
        let books: Vec<Book> = library.into_books();
        assert_eq!(books[0].isbn.as_deref(), Some("9780441013593"));
        assert_eq!(books[0].author.as_deref(), Some("Frank Herbert"));
        assert_eq!(books[1].isbn, None);
    }
}
