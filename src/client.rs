//! HTTP access to the library listing endpoint and book detail pages

use crate::error::{Result, ScrapeError};
use crate::extract::{csrf_token, object_id, parse_details};
use crate::library::MergePolicy;
use crate::schema::BookDetails;
use crate::source::{DetailSource, PageSource};
use async_trait::async_trait;
use futures::future::{join_all, try_join_all};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, COOKIE};
use scraper::Html;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://lubimyczytac.pl/";
pub const LIBRARY_PATH: &str = "biblioteczka";
pub const LISTING_ENDPOINT: &str = "profile/getLibraryBooksList";

/// Credentials of an already logged-in browser session
#[derive(Debug, Clone)]
pub struct Session {
    /// Raw `Cookie` header value
    pub cookie: String,
    /// Anti-forgery token; read from the library page when unset
    pub csrf_token: Option<String>,
}

impl Session {
    pub fn new(cookie: impl Into<String>) -> Self {
        Self {
            cookie: cookie.into(),
            csrf_token: None,
        }
    }

    /// `name=value` pairs of the cookie header
    pub fn cookie_pairs(&self) -> Vec<(String, String)> {
        self.cookie
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.split_once('=')?;
                let name = name.trim();
                (!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
            })
            .collect()
    }
}

#[derive(Deserialize)]
struct ListingResponse {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    content: String,
}

/// Talks to the site's internal endpoints with an injected session
pub struct LibraryClient {
    http: reqwest::Client,
    base: Url,
    session: Session,
    object_id: Option<String>,
}

impl LibraryClient {
    pub fn new(base: Url, session: Session) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let cookie = HeaderValue::from_str(&session.cookie)
            .map_err(|_| ScrapeError::InvalidCookie)?;
        headers.insert(COOKIE, cookie);

        let http = reqwest::Client::builder()
            .user_agent(concat!("lc-export/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base,
            session,
            object_id: None,
        })
    }

    /// The user's library page, as rendered for the session
    pub async fn library_document(&self) -> Result<String> {
        let url = self.base.join(LIBRARY_PATH)?;
        debug!(%url, "fetching library page");
        let html = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(html)
    }

    /// HTML fragment of one listing page
    pub async fn listing_fragment(&self, page: u32) -> Result<String> {
        let token = self
            .session
            .csrf_token
            .as_deref()
            .ok_or(ScrapeError::MissingToken("csrf-token"))?;

        let page_param = page.to_string();
        let mut form = vec![
            ("page", page_param.as_str()),
            ("listId", "booksFilteredList"),
            ("showFirstLetter", "0"),
            ("paginatorType", "Standard"),
            ("porzadek", "malejaco"),
            ("own", "1"),
        ];
        if let Some(id) = &self.object_id {
            form.push(("objectId", id.as_str()));
        }

        let body = self
            .http
            .post(self.base.join(LISTING_ENDPOINT)?)
            .header(
                CONTENT_TYPE,
                "application/x-www-form-urlencoded; charset=UTF-8",
            )
            .header("X-Csrf-Token", token)
            .header("X-Requested-With", "XMLHttpRequest")
            .body(encode_form(&form))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let listing: ListingResponse = serde_json::from_str(&body)
            .map_err(|source| ScrapeError::ListingPayload { page, source })?;
        debug!(page, bytes = listing.data.content.len(), "listing page fetched");
        Ok(listing.data.content)
    }

    /// One book's detail page, parsed into enrichment fields
    pub async fn detail(&self, link: &str) -> Result<BookDetails> {
        let html = self
            .http
            .get(link)
            .header(CONTENT_TYPE, "text/html; charset=UTF-8")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(parse_details(&Html::parse_document(&html), link))
    }
}

fn encode_form(pairs: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

#[async_trait]
impl PageSource for LibraryClient {
    async fn first_document(&mut self) -> Result<String> {
        let html = self.library_document().await?;
        let (token, owner) = {
            let doc = Html::parse_document(&html);
            (csrf_token(&doc), object_id(&doc))
        };

        if self.session.csrf_token.is_none() {
            self.session.csrf_token = Some(token.ok_or(ScrapeError::MissingToken("csrf-token"))?);
        }
        if owner.is_none() {
            warn!("no #objectId on the library page, listing requests will omit it");
        }
        self.object_id = owner;
        Ok(html)
    }

    async fn listing_pages(&mut self, page_count: u32) -> Result<Vec<String>> {
        info!(pages = page_count, "fetching listing pages");
        let this = &*self;
        try_join_all((1..=page_count).map(|page| this.listing_fragment(page))).await
    }

    fn merge_policy(&self) -> MergePolicy {
        MergePolicy::DedupByLink
    }

    fn base_url(&self) -> Option<&Url> {
        Some(&self.base)
    }
}

#[async_trait]
impl DetailSource for LibraryClient {
    async fn book_details(&self, links: &[String]) -> HashMap<String, BookDetails> {
        let results = join_all(links.iter().map(|link| async move {
            (link, self.detail(link).await)
        }))
        .await;

        let mut details = HashMap::with_capacity(results.len());
        for (link, result) in results {
            match result {
                // Keyed by the listing link; og:url may point at another edition
                Ok(entry) => {
                    details.insert(link.clone(), entry);
                }
                Err(e) => warn!(%link, error = %e, "book details unavailable"),
            }
        }
        details
    }
}
