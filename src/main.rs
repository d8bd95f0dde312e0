use tracing::{error, info, warn};

use dealerscrape::config::{AppConfig, CsvJob, Job, MergeJob, ScrapeJob};
use dealerscrape::dealer;
use dealerscrape::errlog::ErrorLog;
use dealerscrape::extract::{self, build_listings};
use dealerscrape::fetch::{HttpFetcher, RetryPolicy};
use dealerscrape::model::Listing;
use dealerscrape::reconcile::{split_glued_price, OverrideMap};
use dealerscrape::store;

/// The process always exits 0: a failed scrape must not break the CI
/// workflow that runs one invocation per site. Failures are logged and,
/// where it makes sense, an empty result is written so downstream steps
/// see a consistent file.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("config error: {err}");
            return;
        }
    };
    let errlog = ErrorLog::new(&config.error_log);

    let result = match &config.job {
        Job::Scrape(job) => run_scrape(job, &config, &errlog).await,
        Job::DealerCsv(job) => run_dealer_csv(job, &config).await,
        Job::Merge(job) => run_merge(job, &config),
    };
    match result {
        Ok(()) => info!("done"),
        Err(message) => {
            error!("{message}");
            errlog.append(&message);
        }
    }
}

async fn run_scrape(job: &ScrapeJob, config: &AppConfig, errlog: &ErrorLog) -> Result<(), String> {
    info!(brand = %job.brand, url = %job.url, "scraping site");
    let listings = scrape_listings(job, errlog).await;
    info!(count = listings.len(), "listings ready");
    store::save_json(&listings, &config.output_paths)
        .map_err(|err| format!("save failed: {err}"))
}

/// Fetch and extract, degrading to an empty list on failure so the output
/// files are still (over)written.
async fn scrape_listings(job: &ScrapeJob, errlog: &ErrorLog) -> Vec<Listing> {
    let extractor = match extract::extractor_for(&job.strategy) {
        Ok(extractor) => extractor,
        Err(err) => {
            let message = format!("{}: bad extraction config: {err}", job.brand.to_uppercase());
            error!("{message}");
            errlog.append(&message);
            return Vec::new();
        }
    };

    let fetcher = match HttpFetcher::new() {
        Ok(fetcher) => fetcher,
        Err(err) => {
            error!("http client init failed: {err}");
            return Vec::new();
        }
    };
    let html = match RetryPolicy::new(job.retry).fetch(&fetcher, &job.url).await {
        Ok(html) => html,
        Err(err) => {
            let message = format!("{}: fetch failed: {err}", job.brand.to_uppercase());
            error!("{message}");
            errlog.append(&message);
            return Vec::new();
        }
    };

    let cards = match extractor.extract(&html, &job.url) {
        Ok(cards) => cards,
        Err(err) => {
            let message = format!("{}: extraction failed: {err}", job.brand.to_uppercase());
            error!("{message}");
            errlog.append(&message);
            return Vec::new();
        }
    };

    let mut listings = build_listings(cards, &job.brand);
    for listing in &mut listings {
        listing.price = split_glued_price(&listing.price, job.split_threshold);
    }

    if let Some(settings) = &job.overrides {
        match dealer::load_overrides(&settings.path) {
            Some(entries) => {
                let map = OverrideMap::new(entries, settings);
                for listing in &mut listings {
                    map.reconcile(listing);
                }
            }
            None => warn!("no dealer overrides applied"),
        }
    }
    listings
}

async fn run_dealer_csv(job: &CsvJob, config: &AppConfig) -> Result<(), String> {
    let url = format!("{}{}", job.csv_url, urlencode(&job.query_string));
    info!(%url, "downloading dealer csv");
    let fetcher = HttpFetcher::new().map_err(|err| format!("http client init failed: {err}"))?;
    let csv_data = RetryPolicy::new(job.retry)
        .fetch(&fetcher, &url)
        .await
        .map_err(|err| format!("csv download failed: {err}"))?;
    let keyed = dealer::csv_to_keyed_json(&csv_data, &job.key_column)
        .map_err(|err| format!("csv conversion failed: {err}"))?;
    store::save_json(&keyed, &config.output_paths).map_err(|err| format!("save failed: {err}"))
}

fn run_merge(job: &MergeJob, config: &AppConfig) -> Result<(), String> {
    let merged =
        store::merge_arrays(&job.input_paths).map_err(|err| format!("merge failed: {err}"))?;
    info!(count = merged.len(), "records merged");
    store::save_json(&merged, &config.output_paths).map_err(|err| format!("save failed: {err}"))
}

fn urlencode(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}
