pub mod config;
pub mod dedup;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod ledger;
pub mod mailer;
pub mod models;
pub mod notifier;
pub mod parser;
pub mod pipeline;
pub mod query;
pub mod storage;
