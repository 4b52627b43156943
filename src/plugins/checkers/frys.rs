use async_trait::async_trait;
use regex::Regex;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html};
use std::str::FromStr;

use crate::config::ScraperSettings;
use crate::models::{CheckerConfig, ProductSnapshot, StoreStock};
use crate::plugins::traits::Checker;
use crate::scraper::{element_text, parse_selector, select_text, HttpSession};
use crate::utils::error::{AppError, Result};

pub const SITE: &str = "frys";
pub const LINK_PATTERN: &str = r"frys\.com";

const NEARBY_STORES_PATH: &str = "/template/product/product_text_normal/nearby_stores.jsp";
const TITLE_SELECTOR: &str = "label.product_title b";
const STORE_RADIO_SELECTOR: &str = r#"input[type="radio"][onclick][id][name][value]"#;
const STORE_NAME_SELECTOR: &str = "td.storeTD";
const STORE_STATUS_SELECTOR: &str = "td.sStatusTD";

/// Fry's Electronics adapter.
///
/// Reads name and price from the product page, then asks the nearby-stores endpoint for
/// availability around the configured zip code. Both requests share one cookie session.
pub struct FrysChecker {
    config: CheckerConfig,
    product_id: String,
    session: HttpSession,
}

impl FrysChecker {
    pub fn new(config: CheckerConfig, settings: &ScraperSettings) -> Result<Self> {
        let product_id = extract_product_id(&config.link).ok_or_else(|| AppError::InvalidProduct {
            label: config.label.clone(),
            message: format!("no product id found in link {}", config.link),
        })?;

        let url = config.url()?;
        let session = HttpSession::new(url.origin().ascii_serialization(), settings)?;

        Ok(Self {
            config,
            product_id,
            session,
        })
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn session(&self) -> &HttpSession {
        &self.session
    }

    async fn fetch_name_price(&mut self) -> Result<(String, Decimal)> {
        let path = format!("/product/{}", self.product_id);
        let body = non_empty(self.session.get(&path, &[]).await?, &path)?;
        parse_product_page(&body, &self.product_id).inspect_err(|e| {
            tracing::error!("Fry's product page {} could not be read: {}", path, e);
        })
    }

    async fn fetch_stores(&mut self) -> Result<Vec<StoreStock>> {
        let query = [
            ("zipcode", self.config.rules.zip_code.as_str()),
            ("plu", self.product_id.as_str()),
        ];
        let body = non_empty(self.session.get(NEARBY_STORES_PATH, &query).await?, NEARBY_STORES_PATH)?;
        parse_nearby_stores(&body)
    }
}

#[async_trait]
impl Checker for FrysChecker {
    fn site(&self) -> &str {
        SITE
    }

    fn config(&self) -> &CheckerConfig {
        &self.config
    }

    async fn scrape_site(&mut self) -> Result<ProductSnapshot> {
        let (name, price) = self.fetch_name_price().await?;
        let stores_with_stock = self.fetch_stores().await?;

        Ok(ProductSnapshot {
            name,
            price,
            stores_with_stock,
        })
    }
}

/// Rejects blank responses.
fn non_empty(body: String, path: &str) -> Result<String> {
    if body.trim().is_empty() {
        return Err(AppError::Scraping(format!("empty response from {}", path)));
    }
    Ok(body)
}

/// Product id from links such as `http://www.frys.com/product/8911983?site=sr:SEARCH`.
pub fn extract_product_id(link: &str) -> Option<String> {
    let re = Regex::new(r"product/(\d+)").ok()?;
    re.captures(link)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parses a price label such as `$1,068.99`.
pub fn parse_price(text: &str) -> Result<Decimal> {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();
    Decimal::from_str(&cleaned).map_err(|e| AppError::Parse {
        message: format!("invalid price '{}': {}", text.trim(), e),
    })
}

/// Name and price from the product page. The price sits in a label whose id contains
/// `value_<product id>`, e.g. `<label id="l_price1_value_8911983">$68.99</label>`.
pub fn parse_product_page(body: &str, product_id: &str) -> Result<(String, Decimal)> {
    let document = Html::parse_document(body);
    let name = select_text(&document, TITLE_SELECTOR)?;
    let price_selector = format!(r#"label[id*="value_{}"]"#, product_id);
    let price = parse_price(&select_text(&document, &price_selector)?)?;
    Ok((name, price))
}

/// Store availability from the nearby-stores fragment.
///
/// A store counts as available only when its radio control is enabled AND its status
/// cell reads "Available"; either signal alone is not trusted.
pub fn parse_nearby_stores(body: &str) -> Result<Vec<StoreStock>> {
    let document = Html::parse_document(body);
    let radio_selector = parse_selector(STORE_RADIO_SELECTOR)?;
    let name_selector = parse_selector(STORE_NAME_SELECTOR)?;
    let status_selector = parse_selector(STORE_STATUS_SELECTOR)?;

    let mut stores = Vec::new();
    for radio in document.select(&radio_selector) {
        let Some(row) = grandparent(&radio) else {
            continue;
        };

        let store = row
            .select(&name_selector)
            .next()
            .map(|cell| element_text(&cell).replace("(map)", "").trim().to_string())
            .ok_or_else(|| AppError::ElementNotFound { selector: STORE_NAME_SELECTOR.to_string() })?;

        let status_available = row
            .select(&status_selector)
            .next()
            .map(|cell| element_text(&cell) == "Available")
            .unwrap_or(false);
        let radio_enabled = radio.value().attr("disabled").is_none();

        stores.push(if radio_enabled && status_available {
            StoreStock::available(store)
        } else {
            StoreStock::unavailable(store)
        });
    }

    Ok(stores)
}

fn grandparent<'a>(element: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    element
        .parent()
        .and_then(|p| p.parent())
        .and_then(ElementRef::wrap)
}
