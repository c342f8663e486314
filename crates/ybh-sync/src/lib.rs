//! Ingestion orchestration: one sync module per source, a shared run
//! summary, and the cron scheduler that drives scheduled runs.
//!
//! A scheduled run executes the four orchestrators sequentially (finance →
//! LH → SH → youth); each source is wrapped in its own failure boundary so
//! one source blowing up never blocks the rest of the run.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};
use uuid::Uuid;
use ybh_adapters::finlife::{FinanceCatalog, FinlifeClient};
use ybh_adapters::lh::{LhClient, LhNoticePages};
use ybh_adapters::sh::{ShBoard, ShClient};
use ybh_adapters::youth::{PolicyCatalog, YouthClient};
use ybh_storage::{has_initial_data, HttpClientConfig, HttpFetcher, Store, UpsertOutcome};

pub mod finance;
pub mod lh;
pub mod sh;
pub mod youth;

pub const CRATE_NAME: &str = "ybh-sync";

/* ------------------------------ reporting ----------------------------- */

/// Outcome counters for one source within a run. `failure` carries the cause
/// of a truncated loop; the rows saved before the failure are kept.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub pages: u32,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failure: Option<String>,
}

impl SourceReport {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn saved(&self) -> usize {
        self.inserted + self.updated
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncRunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub reports: Vec<SourceReport>,
}

/* ------------------------------- config ------------------------------- */

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub database_url: Option<String>,
    pub finlife_base_url: String,
    pub finlife_api_key: String,
    pub lh_base_url: String,
    pub lh_service_key: String,
    pub sh_base_url: String,
    pub youth_base_url: String,
    pub youth_api_key: String,
    pub scheduler_enabled: bool,
    pub sync_cron_1: String,
    pub sync_cron_2: String,
    pub user_agent: String,
    pub http_timeout_secs: u64,
    pub company_pages: u32,
    pub product_pages: u32,
    pub loan_pages: u32,
    pub lh_page_size: u32,
    pub policy_page_size: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            finlife_base_url: "http://finlife.fss.or.kr/finlifeapi".to_string(),
            finlife_api_key: String::new(),
            lh_base_url: "https://apis.data.go.kr/B552555/lhLeaseNoticeInfo1/lhLeaseNoticeInfo1"
                .to_string(),
            lh_service_key: String::new(),
            sh_base_url: "https://www.i-sh.co.kr".to_string(),
            youth_base_url: "https://www.youthcenter.go.kr/go/ythip/getPlcy".to_string(),
            youth_api_key: String::new(),
            scheduler_enabled: false,
            sync_cron_1: "0 0 6 * * *".to_string(),
            sync_cron_2: "0 0 18 * * *".to_string(),
            user_agent: "ybh-bot/0.1".to_string(),
            http_timeout_secs: 20,
            company_pages: 10,
            product_pages: 20,
            loan_pages: 20,
            lh_page_size: 100,
            policy_page_size: 100,
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_url: std::env::var("DATABASE_URL").ok(),
            finlife_base_url: env_or("FINLIFE_BASE_URL", &defaults.finlife_base_url),
            finlife_api_key: env_or("FINLIFE_API_KEY", ""),
            lh_base_url: env_or("LH_BASE_URL", &defaults.lh_base_url),
            lh_service_key: env_or("LH_SERVICE_KEY", ""),
            sh_base_url: env_or("SH_BASE_URL", &defaults.sh_base_url),
            youth_base_url: env_or("YOUTH_BASE_URL", &defaults.youth_base_url),
            youth_api_key: env_or("YOUTH_API_KEY", ""),
            scheduler_enabled: std::env::var("YBH_SCHEDULER_ENABLED")
                .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "True"))
                .unwrap_or(false),
            sync_cron_1: env_or("SYNC_CRON_1", &defaults.sync_cron_1),
            sync_cron_2: env_or("SYNC_CRON_2", &defaults.sync_cron_2),
            user_agent: env_or("YBH_USER_AGENT", &defaults.user_agent),
            http_timeout_secs: std::env::var("YBH_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.http_timeout_secs),
            company_pages: env_u32("YBH_COMPANY_PAGES", defaults.company_pages),
            product_pages: env_u32("YBH_PRODUCT_PAGES", defaults.product_pages),
            loan_pages: env_u32("YBH_LOAN_PAGES", defaults.loan_pages),
            lh_page_size: env_u32("YBH_LH_PAGE_SIZE", defaults.lh_page_size),
            policy_page_size: env_u32("YBH_POLICY_PAGE_SIZE", defaults.policy_page_size),
        }
    }

    /// Apply overrides from an optional YAML config file on top of the
    /// environment-derived values.
    pub fn with_file_overrides(mut self, path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let overrides: ConfigFileOverrides = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        overrides.apply(&mut self);
        Ok(self)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFileOverrides {
    database_url: Option<String>,
    finlife_api_key: Option<String>,
    lh_service_key: Option<String>,
    youth_api_key: Option<String>,
    sync_cron_1: Option<String>,
    sync_cron_2: Option<String>,
    scheduler_enabled: Option<bool>,
    company_pages: Option<u32>,
    product_pages: Option<u32>,
    loan_pages: Option<u32>,
}

impl ConfigFileOverrides {
    fn apply(self, config: &mut SyncConfig) {
        if self.database_url.is_some() {
            config.database_url = self.database_url;
        }
        if let Some(v) = self.finlife_api_key {
            config.finlife_api_key = v;
        }
        if let Some(v) = self.lh_service_key {
            config.lh_service_key = v;
        }
        if let Some(v) = self.youth_api_key {
            config.youth_api_key = v;
        }
        if let Some(v) = self.sync_cron_1 {
            config.sync_cron_1 = v;
        }
        if let Some(v) = self.sync_cron_2 {
            config.sync_cron_2 = v;
        }
        if let Some(v) = self.scheduler_enabled {
            config.scheduler_enabled = v;
        }
        if let Some(v) = self.company_pages {
            config.company_pages = v;
        }
        if let Some(v) = self.product_pages {
            config.product_pages = v;
        }
        if let Some(v) = self.loan_pages {
            config.loan_pages = v;
        }
    }
}

/* ------------------------------- context ------------------------------ */

/// Everything one scheduled or manual run needs. The scheduler holds an
/// `Arc` of this and nothing else; business state lives in the store.
pub struct SyncContext {
    pub store: Arc<dyn Store>,
    pub finance: Arc<dyn FinanceCatalog>,
    pub lh: Arc<dyn LhNoticePages>,
    pub sh: Arc<dyn ShBoard>,
    pub youth: Arc<dyn PolicyCatalog>,
    pub config: SyncConfig,
}

impl SyncContext {
    pub fn from_config(config: SyncConfig, store: Arc<dyn Store>) -> Result<Self> {
        let fetcher = HttpFetcher::new(HttpClientConfig {
            timeout: Duration::from_secs(config.http_timeout_secs),
            user_agent: Some(config.user_agent.clone()),
        })?;
        Ok(Self {
            finance: Arc::new(FinlifeClient::new(
                fetcher.clone(),
                config.finlife_base_url.clone(),
                config.finlife_api_key.clone(),
            )),
            lh: Arc::new(LhClient::new(
                fetcher.clone(),
                config.lh_base_url.clone(),
                config.lh_service_key.clone(),
            )),
            sh: Arc::new(ShClient::new(fetcher.clone(), config.sh_base_url.clone())),
            youth: Arc::new(YouthClient::new(
                fetcher,
                config.youth_base_url.clone(),
                config.youth_api_key.clone(),
            )),
            store,
            config,
        })
    }

    /// One full run over all four sources, in the conventional order.
    /// Never fails as a whole: a source that errors contributes a failure
    /// report and the run moves on.
    pub async fn run_all(&self) -> SyncRunSummary {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, "sync run start");

        let mut reports = Vec::new();
        reports.extend(self.run_finance().await);
        reports.push(boundary("lh", lh::sync_lh_notices(
            self.lh.as_ref(),
            self.store.as_ref(),
            self.config.lh_page_size,
        )
        .await));
        reports.push(boundary("sh", sh::sync_sh_announcements(
            self.sh.as_ref(),
            self.store.as_ref(),
        )
        .await));
        reports.push(boundary("youth", youth::sync_policies(
            self.youth.as_ref(),
            self.store.as_ref(),
            self.config.policy_page_size,
        )
        .await));

        let finished_at = Utc::now();
        for report in &reports {
            info!(
                source = %report.source,
                pages = report.pages,
                inserted = report.inserted,
                updated = report.updated,
                skipped = report.skipped,
                failure = report.failure.as_deref().unwrap_or(""),
                "source sync done"
            );
        }
        SyncRunSummary {
            run_id,
            started_at,
            finished_at,
            reports,
        }
    }

    async fn run_finance(&self) -> Vec<SourceReport> {
        let catalog = self.finance.as_ref();
        let store = self.store.as_ref();
        vec![
            boundary(
                "finlife-companies",
                finance::sync_companies(catalog, store, self.config.company_pages).await,
            ),
            boundary(
                "finlife-deposit-saving",
                finance::sync_deposit_and_saving(catalog, store, self.config.product_pages).await,
            ),
            boundary(
                "finlife-loans",
                finance::sync_loans(catalog, store, self.config.loan_pages).await,
            ),
        ]
    }

    /// First-run seed with small page bounds; a store that already has data
    /// skips it entirely.
    pub async fn run_bootstrap(&self) -> Result<Option<SyncRunSummary>> {
        if has_initial_data(self.store.as_ref()).await? {
            info!("store already seeded; skipping bootstrap sync");
            return Ok(None);
        }
        let bounded = Self {
            store: self.store.clone(),
            finance: self.finance.clone(),
            lh: self.lh.clone(),
            sh: self.sh.clone(),
            youth: self.youth.clone(),
            config: SyncConfig {
                company_pages: 3,
                product_pages: 3,
                loan_pages: 3,
                ..self.config.clone()
            },
        };
        Ok(Some(bounded.run_all().await))
    }
}

/// Per-source failure boundary: an orchestrator error becomes a failure
/// report instead of aborting the run.
fn boundary(source: &str, result: Result<SourceReport>) -> SourceReport {
    match result {
        Ok(report) => report,
        Err(err) => {
            error!(source, error = %err, "source sync failed");
            SourceReport {
                failure: Some(err.to_string()),
                ..SourceReport::new(source)
            }
        }
    }
}

/* ------------------------------ scheduler ----------------------------- */

/// Register the two daily triggers. Returns `None` when scheduling is
/// disabled by config.
pub async fn build_scheduler(ctx: Arc<SyncContext>) -> Result<Option<JobScheduler>> {
    if !ctx.config.scheduler_enabled {
        return Ok(None);
    }
    let sched = JobScheduler::new().await.context("creating scheduler")?;
    for cron in [ctx.config.sync_cron_1.clone(), ctx.config.sync_cron_2.clone()] {
        let ctx = ctx.clone();
        let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
            let ctx = ctx.clone();
            Box::pin(async move {
                let summary = ctx.run_all().await;
                info!(
                    run_id = %summary.run_id,
                    sources = summary.reports.len(),
                    saved = summary.reports.iter().map(SourceReport::saved).sum::<usize>(),
                    "scheduled sync run finished"
                );
            })
        })
        .with_context(|| format!("creating scheduler job for cron {cron}"))?;
        sched.add(job).await.context("adding scheduler job")?;
    }
    Ok(Some(sched))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_report_counts_outcomes() {
        let mut report = SourceReport::new("finlife-companies");
        report.record(UpsertOutcome::Inserted);
        report.record(UpsertOutcome::Inserted);
        report.record(UpsertOutcome::Updated);
        report.record(UpsertOutcome::Skipped);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.updated, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.saved(), 3);
    }

    #[test]
    fn config_file_overrides_apply_on_top_of_defaults() {
        let mut config = SyncConfig::default();
        let overrides: ConfigFileOverrides = serde_yaml::from_str(
            "finlife_api_key: abc123\nscheduler_enabled: true\nloan_pages: 5\n",
        )
        .unwrap();
        overrides.apply(&mut config);
        assert_eq!(config.finlife_api_key, "abc123");
        assert!(config.scheduler_enabled);
        assert_eq!(config.loan_pages, 5);
        assert_eq!(config.product_pages, 20);
    }
}
