use crate::error::ExtractError;
use crate::models::RawListingRecord;
use crate::parser;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

const TITLE_SELECTOR: &str = "a.ellipsis";
const PRICE_SELECTOR: &str = "p.aditem-main--middle--price-shipping--price";
const DISTANCE_SELECTOR: &str = "div.aditem-main--top--left";

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Selector {
        selector: css.to_string(),
        message: format!("{:?}", e),
    })
}

fn rendered_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

/// Pulls the listings off a result page.
///
/// Titles, prices and distance blocks are selected independently and paired
/// by position. A page without any title anchors has no listings; lists of
/// unequal length are reported as [`ExtractError::ShapeMismatch`].
pub fn extract_listings(html: &str) -> Result<Vec<RawListingRecord>, ExtractError> {
    let document = Html::parse_document(html);

    let title_selector = selector(TITLE_SELECTOR)?;
    let price_selector = selector(PRICE_SELECTOR)?;
    let distance_selector = selector(DISTANCE_SELECTOR)?;

    let titles: Vec<ElementRef> = document.select(&title_selector).collect();
    let prices: Vec<ElementRef> = document.select(&price_selector).collect();
    let distances: Vec<ElementRef> = document.select(&distance_selector).collect();

    debug!(
        titles = titles.len(),
        prices = prices.len(),
        distances = distances.len(),
        "Selected listing nodes"
    );

    if titles.is_empty() {
        return Ok(Vec::new());
    }

    if titles.len() != prices.len() || titles.len() != distances.len() {
        return Err(ExtractError::ShapeMismatch {
            titles: titles.len(),
            prices: prices.len(),
            distances: distances.len(),
        });
    }

    let records = titles
        .into_iter()
        .zip(prices)
        .zip(distances)
        .map(|((title, price), distance)| RawListingRecord {
            title_text: rendered_text(title),
            price_text: rendered_text(price).trim().to_string(),
            href_path: title.value().attr("href").unwrap_or_default().to_string(),
            distance_km: parser::extract_distance_km(&rendered_text(distance)),
        })
        .collect();

    Ok(records)
}

/// Turns a listing href into an absolute link.
pub fn absolute_url(base_url: &str, href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{}{}", base_url.trim_end_matches('/'), href)
    }
}
