use anyhow::{Context, Result};
use clap::Parser;
use immofinder::config::{non_empty, CrawlConfig};
use immofinder::fetcher::HttpFetcher;
use immofinder::mailer::{HttpMailer, LogMailer, Mailer};
use immofinder::pipeline::Pipeline;
use immofinder::query::build_targets;
use immofinder::storage::{FileStore, MemoryStore, ObjectStore};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Immofinder - new house listings on Kleinanzeigen, by mail")]
struct Args {
    /// Comma-separated region slugs to search
    #[clap(long, env = "REGIONS", value_delimiter = ',')]
    regions: Option<Vec<String>>,

    /// Comma-separated locality codes, one per region
    #[clap(long, env = "CATEGORY_REGION_CODES", value_delimiter = ',')]
    category_region_codes: Option<Vec<String>>,

    /// Minimum price (empty for unbounded)
    #[clap(long, env = "PRICE_MIN")]
    price_min: Option<String>,

    /// Maximum price (empty for unbounded)
    #[clap(long, env = "PRICE_MAX")]
    price_max: Option<String>,

    /// Search radius in km, also the maximum accepted listing distance
    #[clap(long, env = "DISTANCE")]
    distance: Option<u32>,

    /// Minimum ground size in m² (empty for unbounded)
    #[clap(long, env = "GROUND_SIZE_MIN")]
    ground_size_min: Option<String>,

    /// Maximum ground size in m² (empty for unbounded)
    #[clap(long, env = "GROUND_SIZE_MAX")]
    ground_size_max: Option<String>,

    /// Sender address of notification mails
    #[clap(long, env = "SENDER")]
    sender: Option<String>,

    /// Comma-separated recipient addresses
    #[clap(long, env = "RECIPIENTS", value_delimiter = ',')]
    recipients: Option<Vec<String>>,

    /// Directory holding the ledger
    #[clap(long, env = "STORE_DIR")]
    store_dir: Option<PathBuf>,

    /// Object name of the ledger
    #[clap(long, env = "LEDGER_KEY")]
    ledger_key: Option<String>,

    /// Site base URL
    #[clap(long, env = "BASE_URL")]
    base_url: Option<String>,

    /// Transactional mail API endpoint
    #[clap(long, env = "MAIL_API_URL")]
    mail_api_url: Option<String>,

    /// Transactional mail API key; without it mails are only logged
    #[clap(long, env = "MAIL_API_KEY", hide_env_values = true)]
    mail_api_key: Option<String>,

    /// How often to redo a target when the ledger changed underneath
    #[clap(long, env = "MAX_CONFLICT_RETRIES")]
    max_conflict_retries: Option<usize>,

    /// Print the search URLs and exit
    #[clap(long)]
    print_targets: bool,

    /// Crawl without writing the ledger or sending mail
    #[clap(long)]
    dry_run: bool,

    /// Enable debug output
    #[clap(short, long)]
    debug: bool,
}

impl Args {
    fn into_config(self) -> CrawlConfig {
        let defaults = CrawlConfig::default();
        CrawlConfig {
            base_url: self.base_url.unwrap_or(defaults.base_url),
            regions: self.regions.unwrap_or(defaults.regions),
            category_region_codes: self
                .category_region_codes
                .unwrap_or(defaults.category_region_codes),
            price_min: non_empty(self.price_min),
            price_max: non_empty(self.price_max),
            distance_km: self.distance.unwrap_or(defaults.distance_km),
            ground_size_min: non_empty(self.ground_size_min),
            ground_size_max: non_empty(self.ground_size_max),
            sender: self.sender.unwrap_or(defaults.sender),
            recipients: self
                .recipients
                .map(|r| r.into_iter().filter_map(|a| non_empty(Some(a))).collect())
                .unwrap_or(defaults.recipients),
            store_dir: self.store_dir.unwrap_or(defaults.store_dir),
            ledger_key: self.ledger_key.unwrap_or(defaults.ledger_key),
            mail_api_url: self.mail_api_url.unwrap_or(defaults.mail_api_url),
            mail_api_key: non_empty(self.mail_api_key),
            max_conflict_retries: self
                .max_conflict_retries
                .unwrap_or(defaults.max_conflict_retries),
        }
    }
}

/// In-memory copy of the ledger at `path`, empty if there is none yet.
fn dry_run_store(path: &Path, key: &str) -> Result<MemoryStore> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(MemoryStore::with_object(key, bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(MemoryStore::new()),
        Err(e) => Err(e).with_context(|| format!("Failed to read ledger {}", path.display())),
    }
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "immofinder=debug" } else { "immofinder=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();
}

fn main() -> Result<()> {
    // Picked up before parsing so .env values act as flag fallbacks.
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_logging(args.debug);

    let print_targets = args.print_targets;
    let dry_run = args.dry_run;
    let config = args.into_config();

    if print_targets {
        for target in build_targets(&config)? {
            println!("{}", target.url);
        }
        return Ok(());
    }

    let file_store = FileStore::new(&config.store_dir);
    let store: Box<dyn ObjectStore> = if dry_run {
        info!("Dry run: changes to the ledger are kept in memory");
        Box::new(dry_run_store(&file_store.path_for(&config.ledger_key), &config.ledger_key)?)
    } else {
        Box::new(file_store)
    };

    let mailer: Box<dyn Mailer> = match (&config.mail_api_key, dry_run) {
        (Some(key), false) => Box::new(HttpMailer::new(config.mail_api_url.clone(), key.clone())),
        _ => Box::new(LogMailer),
    };

    let fetcher = HttpFetcher::new().context("Failed to build HTTP client")?;
    let pipeline = Pipeline::new(&config, &fetcher, store.as_ref(), mailer.as_ref());

    match pipeline.run_pass() {
        Ok(report) => {
            println!("\n=== Summary ===");
            for target in &report.targets {
                println!(
                    "{} listings, {} new: {}",
                    target.listings_found,
                    target.new_offers.len(),
                    target.url
                );
            }
            println!("Total new offers: {}", report.total_new_offers());
            Ok(())
        }
        Err(e) => {
            pipeline.notifier().notify_failure(&format!("{:#}", e));
            Err(e)
        }
    }
}
