use crate::error::{LeadError, Result};
use crate::services::reconciler::ReconcileConfig;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub service: ServiceConfig,
    pub store: StoreConfig,
    pub scorer: ScorerConfig,
    pub job: JobConfig,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub service_name: String,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub base_url: String,
    pub api_token: String,
    pub page_size: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ScorerConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Pause between consecutive scorer calls
    pub call_delay_ms: u64,
    /// Maximum leads scored per pass (0 = unlimited)
    pub max_records_per_pass: usize,
    /// Whether to exit after one pass
    pub run_once: bool,
    /// Interval between passes (if not run_once)
    pub interval_secs: u64,
    /// Rows logged from the top of the ranked view after each pass
    pub preview_rows: usize,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            call_delay_ms: 200,
            max_records_per_pass: 0,
            run_once: true,
            interval_secs: 900, // 15 minutes
            preview_rows: 10,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup, applying defaults for missing keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = JobConfig::default();

        Ok(Config {
            service: ServiceConfig {
                service_name: lookup("SERVICE_NAME")
                    .unwrap_or_else(|| "lead-ranking-service".to_string()),
            },
            store: StoreConfig {
                base_url: lookup("LEAD_STORE_URL")
                    .unwrap_or_else(|| "http://localhost:5000".to_string()),
                api_token: lookup("LEAD_STORE_TOKEN").unwrap_or_default(),
                page_size: parse_var(&lookup, "LEAD_STORE_PAGE_SIZE", 100)?,
                timeout_secs: parse_var(&lookup, "LEAD_STORE_TIMEOUT_SECS", 30)?,
            },
            scorer: ScorerConfig {
                base_url: lookup("SCORER_URL").unwrap_or_else(|| "http://localhost:8000".to_string()),
                timeout_secs: parse_var(&lookup, "SCORER_TIMEOUT_SECS", 10)?,
            },
            job: JobConfig {
                call_delay_ms: parse_var(&lookup, "RECONCILE_CALL_DELAY_MS", defaults.call_delay_ms)?,
                max_records_per_pass: parse_var(
                    &lookup,
                    "RECONCILE_MAX_RECORDS",
                    defaults.max_records_per_pass,
                )?,
                run_once: parse_var(&lookup, "RECONCILE_RUN_ONCE", defaults.run_once)?,
                interval_secs: parse_var(&lookup, "RECONCILE_INTERVAL_SECS", defaults.interval_secs)?,
                preview_rows: parse_var(&lookup, "RECONCILE_PREVIEW_ROWS", defaults.preview_rows)?,
            },
        })
    }

    pub fn reconcile_config(&self) -> ReconcileConfig {
        ReconcileConfig {
            call_delay_ms: self.job.call_delay_ms,
            max_records_per_pass: self.job.max_records_per_pass,
            scorer_timeout: Duration::from_secs(self.scorer.timeout_secs),
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| LeadError::Config(format!("{} has invalid value {:?}", key, raw))),
        None => Ok(default),
    }
}
