use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "https://www.kleinanzeigen.de";
pub const DEFAULT_LEDGER_KEY: &str = "crawld.csv";
pub const DEFAULT_MAIL_API_URL: &str = "https://api.brevo.com/v3/smtp/email";

pub const DEFAULT_REGIONS: &[&str] = &[
    "olsberg",
    "sundern-%28sauerland%29",
    "iserlohn",
    "plettenberg",
    "moehnesee",
    "edertal",
    "solingen",
];

pub const DEFAULT_CATEGORY_REGION_CODES: &[&str] =
    &["1354", "1412", "1735", "1415", "16255", "10306", "2117"];

/// Everything one crawl pass needs, built once at startup.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub base_url: String,
    pub regions: Vec<String>,
    pub category_region_codes: Vec<String>,
    pub price_min: Option<String>,
    pub price_max: Option<String>,
    pub distance_km: u32,
    pub ground_size_min: Option<String>,
    pub ground_size_max: Option<String>,
    pub sender: String,
    pub recipients: Vec<String>,
    pub store_dir: PathBuf,
    pub ledger_key: String,
    pub mail_api_url: String,
    pub mail_api_key: Option<String>,
    pub max_conflict_retries: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            regions: DEFAULT_REGIONS.iter().map(|s| s.to_string()).collect(),
            category_region_codes: DEFAULT_CATEGORY_REGION_CODES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            price_min: None,
            price_max: None,
            distance_km: 20,
            ground_size_min: None,
            ground_size_max: None,
            sender: "immofinder@localhost".to_string(),
            recipients: Vec::new(),
            store_dir: PathBuf::from("."),
            ledger_key: DEFAULT_LEDGER_KEY.to_string(),
            mail_api_url: DEFAULT_MAIL_API_URL.to_string(),
            mail_api_key: None,
            max_conflict_retries: 3,
        }
    }
}

/// Blank strings from the environment mean "unbounded".
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
