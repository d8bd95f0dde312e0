//! Environment-variable configuration, read once at startup into explicit
//! structs. Components never touch the environment themselves; every
//! required variable is validated here and errors name the variable.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::model::ConfigError;

/// Default key path into the embedded menu JSON blob.
pub const DEFAULT_CARDS_PATH: &str = "desktopMenu.sections[0].data.tabs.items[0].content.cards";

/// Prices above this are assumed to be two price tiers glued together
/// by broken markup.
pub const DEFAULT_SPLIT_THRESHOLD: u64 = 10_000_000;

const DEFAULT_ERROR_LOG: &str = "output.txt";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub job: Job,
    pub output_paths: Vec<PathBuf>,
    pub error_log: PathBuf,
}

#[derive(Debug, Clone)]
pub enum Job {
    Scrape(ScrapeJob),
    DealerCsv(CsvJob),
    Merge(MergeJob),
}

#[derive(Debug, Clone)]
pub struct ScrapeJob {
    pub url: String,
    pub brand: String,
    pub strategy: Strategy,
    pub overrides: Option<OverrideSettings>,
    pub split_threshold: u64,
    pub retry: RetrySettings,
}

#[derive(Debug, Clone)]
pub struct CsvJob {
    pub csv_url: String,
    pub query_string: String,
    pub key_column: String,
    pub retry: RetrySettings,
}

#[derive(Debug, Clone)]
pub struct MergeJob {
    pub input_paths: Vec<PathBuf>,
}

/// How the card records are located on the page.
#[derive(Debug, Clone)]
pub enum Strategy {
    EmbeddedJson {
        pattern: String,
        cards_path: String,
    },
    Css(SelectorSet),
    Xpath(XpathSet),
}

#[derive(Debug, Clone)]
pub struct SelectorSet {
    pub item: String,
    pub model: String,
    pub price: String,
    pub link: Option<String>,
}

#[derive(Debug, Clone)]
pub struct XpathSet {
    pub item: String,
    pub model: String,
    pub price: String,
    pub link: String,
    pub id: Option<String>,
}

/// Dealer override file plus the field names inside each entry.
#[derive(Debug, Clone)]
pub struct OverrideSettings {
    pub path: PathBuf,
    pub price_field: String,
    pub benefit_field: Option<String>,
    pub benefit_policy: Option<BenefitPolicy>,
}

/// Direction of the benefit merge. The source scripts disagreed among
/// themselves (max in most, min in one), so this is a required choice
/// whenever a benefit field is configured, never a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenefitPolicy {
    TakeMax,
    TakeMin,
}

impl BenefitPolicy {
    pub fn combine(self, a: u64, b: u64) -> u64 {
        match self {
            BenefitPolicy::TakeMax => a.max(b),
            BenefitPolicy::TakeMin => a.min(b),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(2000),
        }
    }
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(var)),
    }
}

fn optional(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn paths_list(raw: &str) -> Vec<PathBuf> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn retry_settings() -> Result<RetrySettings, ConfigError> {
    let mut retry = RetrySettings::default();
    if let Some(raw) = optional("MAX_RETRIES") {
        retry.max_attempts = raw.parse().map_err(|_| ConfigError::Invalid {
            var: "MAX_RETRIES",
            reason: format!("not a number: {raw}"),
        })?;
    }
    if let Some(raw) = optional("RETRY_DELAY_MS") {
        let ms: u64 = raw.parse().map_err(|_| ConfigError::Invalid {
            var: "RETRY_DELAY_MS",
            reason: format!("not a number: {raw}"),
        })?;
        retry.delay = Duration::from_millis(ms);
    }
    Ok(retry)
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let output_paths = paths_list(&required("OUTPUT_PATHS")?);
        if output_paths.is_empty() {
            return Err(ConfigError::Invalid {
                var: "OUTPUT_PATHS",
                reason: "no paths after splitting on commas".into(),
            });
        }
        let error_log =
            PathBuf::from(optional("ERROR_LOG").unwrap_or_else(|| DEFAULT_ERROR_LOG.into()));

        let mode = optional("MODE").unwrap_or_else(|| "scrape".into());
        let job = match mode.as_str() {
            "scrape" => Job::Scrape(ScrapeJob::from_env()?),
            "dealer-csv" => Job::DealerCsv(CsvJob {
                csv_url: required("CSV_URL")?,
                query_string: optional("QUERY_STRING").unwrap_or_default(),
                key_column: required("KEY_COLUMN")?,
                retry: retry_settings()?,
            }),
            "merge" => {
                let input_paths = paths_list(&required("INPUT_PATHS")?);
                if input_paths.is_empty() {
                    return Err(ConfigError::Invalid {
                        var: "INPUT_PATHS",
                        reason: "no paths after splitting on commas".into(),
                    });
                }
                Job::Merge(MergeJob { input_paths })
            }
            other => {
                return Err(ConfigError::Invalid {
                    var: "MODE",
                    reason: format!("expected scrape, dealer-csv or merge, got {other}"),
                })
            }
        };

        Ok(Self {
            job,
            output_paths,
            error_log,
        })
    }
}

impl ScrapeJob {
    fn from_env() -> Result<Self, ConfigError> {
        let url = required("URL")?;
        let brand = required("BRAND")?.trim().to_lowercase();

        let strategy = match required("STRATEGY")?.as_str() {
            "json" => Strategy::EmbeddedJson {
                pattern: required("REGEXP")?,
                cards_path: optional("CARDS_PATH").unwrap_or_else(|| DEFAULT_CARDS_PATH.into()),
            },
            "css" => Strategy::Css(SelectorSet {
                item: required("ITEM_CSS")?,
                model: required("MODEL_CSS")?,
                price: required("PRICE_CSS")?,
                link: optional("LINK_CSS"),
            }),
            "xpath" => Strategy::Xpath(XpathSet {
                item: required("ITEM_XPATH")?,
                model: required("MODEL_XPATH")?,
                price: required("PRICE_XPATH")?,
                link: required("LINK_XPATH")?,
                id: optional("ID_XPATH"),
            }),
            other => {
                return Err(ConfigError::Invalid {
                    var: "STRATEGY",
                    reason: format!("expected json, css or xpath, got {other}"),
                })
            }
        };

        let overrides = match optional("DEALER_PRICES_PATH") {
            Some(path) => {
                let benefit_field = optional("DEALER_BENEFIT_FIELD");
                let benefit_policy = match optional("BENEFIT_POLICY").as_deref() {
                    Some("max") => Some(BenefitPolicy::TakeMax),
                    Some("min") => Some(BenefitPolicy::TakeMin),
                    Some(other) => {
                        return Err(ConfigError::Invalid {
                            var: "BENEFIT_POLICY",
                            reason: format!("expected max or min, got {other}"),
                        })
                    }
                    None => None,
                };
                if benefit_field.is_some() && benefit_policy.is_none() {
                    return Err(ConfigError::Invalid {
                        var: "BENEFIT_POLICY",
                        reason: "required when DEALER_BENEFIT_FIELD is set".into(),
                    });
                }
                Some(OverrideSettings {
                    path: PathBuf::from(path),
                    price_field: required("DEALER_PRICE_FIELD")?,
                    benefit_field,
                    benefit_policy,
                })
            }
            None => None,
        };

        let split_threshold = match optional("PRICE_SPLIT_THRESHOLD") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                var: "PRICE_SPLIT_THRESHOLD",
                reason: format!("not a number: {raw}"),
            })?,
            None => DEFAULT_SPLIT_THRESHOLD,
        };

        Ok(Self {
            url,
            brand,
            strategy,
            overrides,
            split_threshold,
            retry: retry_settings()?,
        })
    }
}

/// Editor-side configuration.
#[derive(Debug, Clone)]
pub struct EditorConfig {
    pub root: PathBuf,
    pub data_dir: String,
    pub readonly_files: Vec<String>,
}

/// File names the editor refuses to overwrite: these are regenerated by
/// the scraper on every run.
pub const DEFAULT_READONLY: &[&str] = &["cars.json", "federal-models_price.json", "models.json"];

impl EditorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let readonly_files = match optional("READONLY_FILES") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            None => DEFAULT_READONLY.iter().map(|s| s.to_string()).collect(),
        };
        Ok(Self {
            root: PathBuf::from(required("EDIT_ROOT")?),
            data_dir: optional("DATA_DIR").unwrap_or_else(|| "data".into()),
            readonly_files,
        })
    }
}
