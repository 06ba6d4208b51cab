use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One accepted listing observation. Field order is the ledger column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub timestamp: String,
    pub price: String,
    pub title: String,
    pub url: String,
}

impl Offer {
    pub fn new(timestamp: &str, title: &str, url: &str, price: &str) -> Self {
        Self {
            timestamp: timestamp.to_string(),
            price: price.trim().to_string(),
            title: title.trim().to_string(),
            url: url.to_string(),
        }
    }

    /// The dedup key.
    pub fn key(&self) -> &str {
        self.title.trim()
    }
}

/// A listing as read off a result page, before reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawListingRecord {
    pub title_text: String,
    pub price_text: String,
    pub href_path: String,
    pub distance_km: Option<u32>,
}

/// The filters for one search target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub region: String,
    pub category_region_code: String,
    pub price_min: Option<String>,
    pub price_max: Option<String>,
    pub distance_km: u32,
    pub ground_size_min: Option<String>,
    pub ground_size_max: Option<String>,
}

/// Every offer ever accepted, in acceptance order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    offers: Vec<Offer>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_offers(offers: Vec<Offer>) -> Self {
        Self { offers }
    }

    pub fn offers(&self) -> &[Offer] {
        &self.offers
    }

    pub fn len(&self) -> usize {
        self.offers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    pub fn known_titles(&self) -> HashSet<String> {
        self.offers.iter().map(|o| o.key().to_string()).collect()
    }

    pub fn extend(&mut self, offers: impl IntoIterator<Item = Offer>) {
        self.offers.extend(offers);
    }
}
