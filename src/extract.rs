//! Record extraction from library listing fragments and book detail pages
//!
//! Every field goes through its own `Option`-returning lookup so a missing
//! element only blanks that field.

use crate::schema::{Book, BookDetails};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use url::Url;

const BOOK_NODE: &str = ".authorAllBooks__single";
const TITLE: &str = ".authorAllBooks__singleTextTitle";
const AUTHOR: &str = ".authorAllBooks__singleTextAuthor";
const SHELVES: &str = ".authorAllBooks__singleTextShelfRight a";
const RATINGS: &str = ".listLibrary__ratingStarsNumber";
const OPINION: &str = ".comment-cloud__body .p-collapsed";
const DATE_LABEL: &str = ".authorAllBooks__singleImg div";

const PAGE_CONTROL: &str = "[data-page]";
const PAGINATION_INFO: &str = ".paginationList__info span";

/// Total number of listing pages
///
/// Largest numeric `data-page` among the pagination controls, then the
/// pagination info counter, then 1.
pub fn page_count(doc: &Html) -> u32 {
    let root = doc.root_element();

    let from_controls = selector(PAGE_CONTROL).and_then(|sel| {
        root.select(&sel)
            .filter_map(|el| el.value().attr("data-page"))
            .filter(|v| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()))
            .filter_map(|v| v.parse::<u32>().ok())
            .max()
    });

    from_controls
        .filter(|n| *n > 0)
        .or_else(|| {
            select_text(root, PAGINATION_INFO)
                .and_then(|t| t.parse::<u32>().ok())
                .filter(|n| *n > 0)
        })
        .unwrap_or(1)
}

/// Extract every book entry in a listing fragment, in document order
pub fn extract_books(doc: &Html, base: Option<&Url>) -> Vec<Book> {
    let Some(sel) = selector(BOOK_NODE) else {
        return Vec::new();
    };

    doc.root_element()
        .select(&sel)
        .map(|node| extract_book(node, base))
        .collect()
}

fn extract_book(node: ElementRef, base: Option<&Url>) -> Book {
    let ratings = Ratings::from_positions(&select_all_text(node, RATINGS));

    Book {
        name: select_text(node, TITLE).unwrap_or_default(),
        author: extract_author(node),
        rate: ratings.personal,
        opinion: select_text(node, OPINION),
        read_date: extract_read_date(node).unwrap_or_default(),
        shelves: select_all_text(node, SHELVES)
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect(),
        average_rate: ratings.average,
        href: select_attr(node, TITLE, "href").map(|href| resolve_link(&href, base)),
        isbn: None,
    }
}

/// The two unlabeled rating values shown next to a listing entry
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Ratings {
    pub personal: Option<u8>,
    pub average: Option<f64>,
}

impl Ratings {
    /// First value is the viewer's rating, second the community average.
    /// The markup carries no label, only this order.
    pub fn from_positions<S: AsRef<str>>(values: &[S]) -> Self {
        Self {
            personal: values.first().and_then(|v| parse_personal_rating(v.as_ref())),
            average: values.get(1).and_then(|v| parse_number(v.as_ref())),
        }
    }
}

pub(crate) fn parse_personal_rating(s: &str) -> Option<u8> {
    parse_number(s)
        .filter(|v| v.fract() == 0.0 && (0.0..=f64::from(u8::MAX)).contains(v))
        .map(|v| v as u8)
}

/// Parse a site number, accepting a decimal comma
pub(crate) fn parse_number(s: &str) -> Option<f64> {
    s.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn extract_author(node: ElementRef) -> Option<String> {
    let sel = selector(AUTHOR)?;
    let author = node.select(&sel).next()?;
    let first_child = author.children().find_map(ElementRef::wrap);

    first_child
        .map(element_text)
        .filter(|s| !s.is_empty())
        .or_else(|| Some(element_text(author)).filter(|s| !s.is_empty()))
}

/// Second line of the cover label; the first line is unrelated
fn extract_read_date(node: ElementRef) -> Option<String> {
    let sel = selector(DATE_LABEL)?;
    let label = node.select(&sel).next()?;
    read_date_line(&label.inner_html())
}

/// Isolate the second `<br>`-separated line of a label's inner HTML
pub fn read_date_line(label_html: &str) -> Option<String> {
    let line = line_break().split(label_html).nth(1)?;
    let fragment = Html::parse_fragment(line);
    let text = normalize_ws(&fragment.root_element().text().collect::<String>());
    Some(text).filter(|s| !s.is_empty())
}

fn line_break() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<br\s*/?>").unwrap())
}

fn resolve_link(href: &str, base: Option<&Url>) -> String {
    base.and_then(|b| b.join(href).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| href.to_string())
}

/// Identity of the books on a rendered page, used to notice a re-render
pub fn page_fingerprint(doc: &Html) -> Vec<String> {
    let Some(sel) = selector(BOOK_NODE) else {
        return Vec::new();
    };

    doc.root_element()
        .select(&sel)
        .map(|node| {
            select_attr(node, TITLE, "href")
                .or_else(|| select_text(node, TITLE))
                .unwrap_or_default()
        })
        .collect()
}

/// Anti-forgery token the listing endpoint expects
pub fn csrf_token(doc: &Html) -> Option<String> {
    select_attr(doc.root_element(), r#"meta[name="csrf-token"]"#, "content")
}

/// Library owner id sent with every listing request
pub fn object_id(doc: &Html) -> Option<String> {
    select_attr(doc.root_element(), "#objectId", "value")
}

/// Parse a book detail page's metadata tags
///
/// `href` is the page's canonical `og:url`, or `requested` when the tag is
/// missing. Callers key results by the link they requested.
pub fn parse_details(doc: &Html, requested: &str) -> BookDetails {
    let root = doc.root_element();

    BookDetails {
        href: select_attr(root, r#"meta[property="og:url"]"#, "content")
            .unwrap_or_else(|| requested.to_string()),
        isbn: select_attr(root, r#"meta[property="books:isbn"]"#, "content"),
        author: select_attr(root, r#"meta[property="books:author"]"#, "content"),
        rating: select_attr(root, r#"meta[property="books:rating:value"]"#, "content")
            .and_then(|v| parse_number(&v)),
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn element_text(el: ElementRef) -> String {
    normalize_ws(&el.text().collect::<String>())
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn select_text(el: ElementRef, sel: &str) -> Option<String> {
    let selector = selector(sel)?;
    el.select(&selector)
        .next()
        .map(element_text)
        .filter(|s| !s.is_empty())
}

fn select_all_text(el: ElementRef, sel: &str) -> Vec<String> {
    let Some(selector) = selector(sel) else {
        return Vec::new();
    };
    el.select(&selector).map(element_text).collect()
}

fn select_attr(el: ElementRef, sel: &str, attr: &str) -> Option<String> {
    let selector = selector(sel)?;
    el.select(&selector)
        .next()
        .and_then(|e| e.value().attr(attr))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
