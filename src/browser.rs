//! Sequential page navigation in headless Chrome via chromiumoxide

use crate::client::{Session, LIBRARY_PATH};
use crate::error::{Result, ScrapeError};
use crate::extract::page_fingerprint;
use crate::library::MergePolicy;
use crate::source::PageSource;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use scraper::Html;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

const NEXT_PAGE: &str = r#"[aria-label="Next"]"#;

/// A rendered document that can be moved to its next page
#[async_trait]
pub trait Navigator: Send {
    /// Current rendered HTML
    async fn document(&mut self) -> Result<String>;

    /// Trigger the "next page" control. `Ok(false)` means there is none.
    async fn advance(&mut self) -> Result<bool>;
}

/// Chrome tab logged in as the session owner, parked on the library page
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    /// Launch Chrome, install the session cookies and open the library
    pub async fn open(base: &Url, session: &Session, headless: bool) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run");
        if headless {
            builder = builder.arg("--headless=new");
        } else {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(ScrapeError::BrowserConfig)?;

        let (mut browser, mut handler) = Browser::launch(config).await?;
        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        match open_library(&browser, base, session).await {
            Ok(page) => Ok(Self {
                browser,
                page,
                handler,
            }),
            Err(e) => {
                let closed = browser.close().await.map(drop).map_err(ScrapeError::from);
                handler.abort();
                keep_primary(Err(e), closed)
            }
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.browser.close().await?;
        self.handler.abort();
        Ok(())
    }
}

/// Log a failed browser shutdown and hand back `primary` unchanged
pub fn keep_primary<T>(primary: Result<T>, cleanup: Result<()>) -> Result<T> {
    if let Err(e) = cleanup {
        warn!(error = %e, "browser did not shut down cleanly");
    }
    primary
}

async fn open_library(browser: &Browser, base: &Url, session: &Session) -> Result<Page> {
    let page = browser.new_page("about:blank").await?;

    let cookies = session
        .cookie_pairs()
        .into_iter()
        .map(|(name, value)| {
            CookieParam::builder()
                .name(name)
                .value(value)
                .url(base.as_str())
                .build()
                .map_err(ScrapeError::BrowserConfig)
        })
        .collect::<Result<Vec<_>>>()?;
    if !cookies.is_empty() {
        page.set_cookies(cookies).await?;
    }

    let library = base.join(LIBRARY_PATH)?;
    info!(url = %library, "opening library page");
    page.goto(library.as_str()).await?;

    Ok(page)
}

#[async_trait]
impl Navigator for BrowserSession {
    async fn document(&mut self) -> Result<String> {
        Ok(self.page.content().await?)
    }

    async fn advance(&mut self) -> Result<bool> {
        let next = match self.page.find_element(NEXT_PAGE).await {
            Ok(el) => el,
            Err(e) => {
                debug!(error = %e, "next page control not found");
                return Ok(false);
            }
        };
        next.click().await?;
        Ok(true)
    }
}

/// How long to wait for a page to re-render after advancing
#[derive(Debug, Clone, Copy)]
pub struct SettleConfig {
    /// Upper bound; the current document is used once it elapses
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// Visits pages one at a time through a [`Navigator`]
pub struct NavigationSource<N> {
    navigator: N,
    settle: SettleConfig,
    base: Option<Url>,
}

impl<N: Navigator> NavigationSource<N> {
    pub fn new(navigator: N, settle: SettleConfig, base: Option<Url>) -> Self {
        Self {
            navigator,
            settle,
            base,
        }
    }

    pub fn into_navigator(self) -> N {
        self.navigator
    }

    /// Poll until a non-empty book list different from `previous` shows up,
    /// or time out
    async fn wait_for_render(&mut self, previous: &[String]) -> Result<String> {
        let deadline = Instant::now() + self.settle.timeout;
        loop {
            tokio::time::sleep(self.settle.poll_interval).await;
            let html = self.navigator.document().await?;
            let current = fingerprint(&html);
            // An empty list is the cleared container while the next page loads
            if !current.is_empty() && current != previous {
                return Ok(html);
            }
            if Instant::now() >= deadline {
                warn!(
                    timeout_ms = self.settle.timeout.as_millis() as u64,
                    "page did not re-render in time, using current document"
                );
                return Ok(html);
            }
        }
    }
}

fn fingerprint(html: &str) -> Vec<String> {
    page_fingerprint(&Html::parse_document(html))
}

#[async_trait]
impl<N: Navigator> PageSource for NavigationSource<N> {
    async fn first_document(&mut self) -> Result<String> {
        self.navigator.document().await
    }

    async fn listing_pages(&mut self, page_count: u32) -> Result<Vec<String>> {
        let mut pages = Vec::with_capacity(page_count as usize);
        let mut current = self.navigator.document().await?;

        for page in 1..=page_count {
            if page > 1 {
                if !self.navigator.advance().await? {
                    return Err(ScrapeError::PaginationExhausted { page: page - 1 });
                }
                let previous = fingerprint(&current);
                current = self.wait_for_render(&previous).await?;
            }
            info!(page, of = page_count, "page rendered");
            pages.push(current.clone());
        }

        Ok(pages)
    }

    fn merge_policy(&self) -> MergePolicy {
        MergePolicy::Append
    }

    fn base_url(&self) -> Option<&Url> {
        self.base.as_ref()
    }
}
