//! Book record schema
//!
//! JSON field names are stable: `goodreads` reads `lc_books.json` files
//! back through [`Book`]. Ratings are written as numbers but also read from
//! the text form (`"8"`, `"7,4"`) that browser-console exports contain.

use crate::extract::{parse_number, parse_personal_rating};
use serde::{Deserialize, Deserializer, Serialize};

/// A single catalogued book
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Title (empty when the listing omits it)
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// The viewer's own rating, on the site's 1-10 scale
    #[serde(
        default,
        deserialize_with = "personal_rating",
        skip_serializing_if = "Option::is_none"
    )]
    pub rate: Option<u8>,
    /// Review excerpt, if the user wrote one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opinion: Option<String>,
    /// Site-local date, empty for unread books
    #[serde(default)]
    pub read_date: String,
    #[serde(default)]
    pub shelves: Vec<String>,
    /// Community average rating
    #[serde(
        default,
        deserialize_with = "average_rating",
        skip_serializing_if = "Option::is_none"
    )]
    pub average_rate: Option<f64>,
    /// Canonical book page; the merge key across pipeline stages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    /// Only set by detail enrichment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
}

/// Fields recovered from a book's own detail page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookDetails {
    pub href: String,
    pub isbn: Option<String>,
    pub author: Option<String>,
    pub rating: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RatingValue {
    Number(f64),
    Text(String),
}

impl RatingValue {
    fn text(self) -> String {
        match self {
            RatingValue::Number(n) => n.to_string(),
            RatingValue::Text(s) => s,
        }
    }
}

/// Number, numeric string, `""` or `null`; unparseable text reads as unrated
fn personal_rating<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u8>, D::Error> {
    let value = Option::<RatingValue>::deserialize(deserializer)?;
    Ok(value.and_then(|v| parse_personal_rating(&v.text())))
}

fn average_rating<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<RatingValue>::deserialize(deserializer)?;
    Ok(value.and_then(|v| parse_number(&v.text())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_fields_omitted() {
        let book = Book {
            name: "Dune".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_string(&book).unwrap();
        assert!(json.contains(r#""name":"Dune""#));
        assert!(json.contains(r#""read_date":"""#));
        assert!(json.contains(r#""shelves":[]"#));
        assert!(!json.contains("isbn"));
        assert!(!json.contains("author"));
    }

    #[test]
    fn test_deserialize_nulls_and_missing_keys() {
        let json = r#"{"name":"Solaris","author":null,"rate":8,"isbn":null}"#;
        let book: Book = serde_json::from_str(json).unwrap();
        assert_eq!(book.name, "Solaris");
        assert_eq!(book.author, None);
        assert_eq!(book.rate, Some(8));
        assert_eq!(book.read_date, "");
        assert!(book.shelves.is_empty());
    }

    #[test]
    fn test_deserialize_text_ratings() {
        let json = r#"{
            "name": "Solaris",
            "author": "Stanisław Lem",
            "rate": "8",
            "opinion": "",
            "read_date": "2019-03-01",
            "shelves": ["Przeczytane"],
            "average_rate": "7,4",
            "href": "https://lubimyczytac.pl/ksiazka/1/solaris",
            "isbn": "9788308049547"
        }"#;
        let book: Book = serde_json::from_str(json).unwrap();
        assert_eq!(book.rate, Some(8));
        assert_eq!(book.average_rate, Some(7.4));
        assert_eq!(book.isbn.as_deref(), Some("9788308049547"));
    }

    #[test]
    fn test_deserialize_empty_and_bad_ratings_as_unrated() {
        let json = r#"{"name":"Solaris","rate":"","average_rate":"brak ocen"}"#;
        let book: Book = serde_json::from_str(json).unwrap();
        assert_eq!(book.rate, None);
        assert_eq!(book.average_rate, None);

        let book: Book = serde_json::from_str(r#"{"rate":null,"average_rate":7.5}"#).unwrap();
        assert_eq!(book.rate, None);
        assert_eq!(book.average_rate, Some(7.5));
    }
}
