use crate::config::CrawlConfig;
use crate::dedup::find_new_offers;
use crate::error::LedgerError;
use crate::extractor::extract_listings;
use crate::fetcher::Fetcher;
use crate::ledger::{LedgerStore, Snapshot};
use crate::mailer::Mailer;
use crate::models::{Offer, RawListingRecord};
use crate::notifier::Notifier;
use crate::query::{build_targets, QueryTarget};
use crate::storage::{ObjectStore, Precondition};
use anyhow::{Context, Result};
use tracing::{info, warn};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    pub url: String,
    pub listings_found: usize,
    pub new_offers: Vec<Offer>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub targets: Vec<TargetReport>,
}

impl PassReport {
    pub fn total_new_offers(&self) -> usize {
        self.targets.iter().map(|t| t.new_offers.len()).sum()
    }
}

/// Runs crawl passes over every configured search target.
///
/// Each target is handled start to finish before the next one: the ledger is
/// reloaded, the page fetched and extracted, new offers merged and the ledger
/// written back, then the new offers are mailed. Later targets therefore see
/// what earlier ones accepted, and a crash keeps everything already written.
pub struct Pipeline<'a> {
    config: &'a CrawlConfig,
    fetcher: &'a dyn Fetcher,
    ledgers: LedgerStore<'a>,
    notifier: Notifier<'a>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a CrawlConfig,
        fetcher: &'a dyn Fetcher,
        store: &'a dyn ObjectStore,
        mailer: &'a dyn Mailer,
    ) -> Self {
        Self {
            config,
            fetcher,
            ledgers: LedgerStore::new(store, config.ledger_key.clone()),
            notifier: Notifier::new(mailer, config.sender.clone(), config.recipients.clone()),
        }
    }

    pub fn notifier(&self) -> &Notifier<'a> {
        &self.notifier
    }

    pub fn run_pass(&self) -> Result<PassReport> {
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.run_pass_at(&timestamp)
    }

    /// One pass with every accepted offer stamped `timestamp`.
    pub fn run_pass_at(&self, timestamp: &str) -> Result<PassReport> {
        let targets = build_targets(self.config).context("Failed to build search targets")?;
        info!(targets = targets.len(), "Starting crawl pass");

        let mut report = PassReport::default();
        for target in &targets {
            report.targets.push(self.process_target(target, timestamp)?);
        }

        info!(
            targets = report.targets.len(),
            new_offers = report.total_new_offers(),
            "Crawl pass finished"
        );
        Ok(report)
    }

    fn process_target(&self, target: &QueryTarget, timestamp: &str) -> Result<TargetReport> {
        let snapshot = self.load_ledger()?;

        let html = self
            .fetcher
            .fetch(&target.url)
            .with_context(|| format!("Failed to fetch {}", target.url))?;
        info!(url = %target.url, "Crawled");

        let records = extract_listings(&html)
            .with_context(|| format!("Failed to extract listings from {}", target.url))?;
        info!(url = %target.url, entries = records.len(), "Found entries");

        let new_offers = self.reconcile(snapshot, &records, target, timestamp)?;

        if new_offers.is_empty() {
            info!(url = %target.url, "No new offers found");
        } else {
            info!(url = %target.url, new_offers = new_offers.len(), "Found new offers");
            self.notifier.notify(&new_offers);
        }

        Ok(TargetReport {
            url: target.url.clone(),
            listings_found: records.len(),
            new_offers,
        })
    }

    fn load_ledger(&self) -> Result<Snapshot> {
        self.ledgers
            .load()
            .with_context(|| format!("Failed to load ledger {}", self.ledgers.key()))
    }

    /// Merges new offers into the ledger and writes it back, conditional on
    /// the revision it was read at. On a conflicting write the ledger is
    /// reloaded and the merge redone.
    fn reconcile(
        &self,
        mut snapshot: Snapshot,
        records: &[RawListingRecord],
        target: &QueryTarget,
        timestamp: &str,
    ) -> Result<Vec<Offer>> {
        let mut attempt = 0;
        loop {
            match self.merge_and_save(snapshot, records, target, timestamp) {
                Ok(offers) => return Ok(offers),
                Err(e) if e.is_concurrent_modification() && attempt < self.config.max_conflict_retries => {
                    attempt += 1;
                    warn!(
                        key = %self.ledgers.key(),
                        attempt,
                        "Ledger changed while reconciling, retrying"
                    );
                    snapshot = self.load_ledger()?;
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to save ledger {}", self.ledgers.key()))
                }
            }
        }
    }

    fn merge_and_save(
        &self,
        snapshot: Snapshot,
        records: &[RawListingRecord],
        target: &QueryTarget,
        timestamp: &str,
    ) -> Result<Vec<Offer>, LedgerError> {
        let Snapshot { mut ledger, version } = snapshot;

        let new_offers = find_new_offers(
            &ledger,
            records,
            target.query.distance_km,
            timestamp,
            &self.config.base_url,
        );
        ledger.extend(new_offers.iter().cloned());

        self.ledgers.save(&ledger, Precondition::Matches(version))?;
        Ok(new_offers)
    }
}
