use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_retry::strategy::{jitter, FixedInterval};
use tokio_retry::Retry;

use crate::config::ScraperSettings;
use crate::utils::error::{AppError, Result};

/// Cookies accumulated from `Set-Cookie` headers and replayed on later requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one `Set-Cookie` header value. Only the leading `name=value` pair is kept;
    /// attributes such as `Path` or `Expires` are dropped.
    pub fn merge_set_cookie(&mut self, header: &str) {
        let pair = header.split(';').next().unwrap_or_default().trim();
        if pair.is_empty() {
            return;
        }
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        self.cookies.insert(name.trim().to_string(), value.trim().to_string());
    }

    /// `Cookie` request header value, or `None` while the jar is empty.
    pub fn header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

/// HTTP session bound to one site origin. Owned by a single checker, never shared.
pub struct HttpSession {
    client: Client,
    base_url: String,
    cookies: CookieJar,
    retry_attempts: usize,
    retry_delay_ms: u64,
}

struct RawResponse {
    set_cookies: Vec<String>,
    body: String,
}

impl HttpSession {
    pub fn new(base_url: impl Into<String>, settings: &ScraperSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.request_timeout_s))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cookies: CookieJar::new(),
            retry_attempts: settings.retry_attempts,
            retry_delay_ms: settings.retry_delay_ms,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    /// GETs `path` with the session cookies, retrying transient failures, and folds the
    /// response's cookies back into the session. Returns the response body.
    pub async fn get(&mut self, path: &str, query: &[(&str, &str)]) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        let cookie_header = self.cookies.header_value();

        let strategy = FixedInterval::from_millis(self.retry_delay_ms)
            .map(jitter)
            .take(self.retry_attempts);

        let this = &*self;
        let response = Retry::spawn(strategy, || {
            this.fetch_once(&url, query, cookie_header.as_deref())
        })
        .await?;

        for header in &response.set_cookies {
            self.cookies.merge_set_cookie(header);
        }
        tracing::debug!("GET {} -> {} bytes, {} cookies in session", url, response.body.len(), self.cookies.len());

        Ok(response.body)
    }

    async fn fetch_once(&self, url: &str, query: &[(&str, &str)], cookie: Option<&str>) -> Result<RawResponse> {
        let mut request = self.client.get(url).query(query);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }

        let response = request.send().await?.error_for_status()?;
        let set_cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();
        let body = response.text().await?;

        Ok(RawResponse { set_cookies, body })
    }
}

pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| AppError::Parse {
        message: format!("Invalid CSS selector '{}': {:?}", selector, e),
    })
}

/// Whitespace-normalised text content of an element.
pub fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of the first element matching `selector`; a missing element is a scrape failure.
pub fn select_text(document: &Html, selector: &str) -> Result<String> {
    let parsed = parse_selector(selector)?;
    document
        .select(&parsed)
        .next()
        .map(|element| element_text(&element))
        .ok_or_else(|| AppError::ElementNotFound { selector: selector.to_string() })
}
