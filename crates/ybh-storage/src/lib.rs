//! Normalized Store boundary + shared HTTP fetch utilities.
//!
//! Orchestrators and the recommendation engine only see the repository
//! traits here: find-by-natural-key, insert, update. [`MemoryStore`] backs
//! tests and fixture runs; [`pg::PgStore`] is the Postgres implementation.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;
use ybh_core::{
    FinanceCompany, FinanceLoanOption, FinanceProduct, FinanceProductKind, LhNotice, LoanOptionKey,
    Product, ShAnnouncement, YouthPolicy,
};

pub mod pg;

pub const CRATE_NAME: &str = "ybh-storage";

/* ----------------------------- http fetch ---------------------------- */

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            user_agent: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
}

/// Thin reqwest wrapper shared by all source adapters. No retry layer: the
/// adapters report a failed call as an empty-handed outcome and the
/// orchestrator stops that source's loop for the run.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder.build().context("building reqwest client")?;
        Ok(Self { client })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        debug!(url, "http get (json)");
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: resp.url().to_string(),
            });
        }
        Ok(resp.json::<T>().await?)
    }

    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        debug!(url, "http get (text)");
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: resp.url().to_string(),
            });
        }
        Ok(resp.text().await?)
    }

    pub async fn post_form_text(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<String, FetchError> {
        debug!(url, "http post (form)");
        let resp = self.client.post(url).form(form).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: resp.url().to_string(),
            });
        }
        Ok(resp.text().await?)
    }
}

/* ----------------------------- store API ------------------------------ */

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Message(String),
}

/// What an upsert actually did. `Skipped` covers both the insert-only
/// policies (record already present) and unique-constraint races, which are
/// treated as "already exists" rather than escalated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Skipped,
}

#[async_trait]
pub trait FinanceStore: Send + Sync {
    /// Full-overwrite upsert keyed by the normalized company code.
    async fn upsert_company(&self, company: FinanceCompany) -> Result<UpsertOutcome, StoreError>;
    async fn find_company(&self, company_code: &str) -> Result<Option<FinanceCompany>, StoreError>;

    /// Full-overwrite upsert keyed by (kind, name, provider); returns the
    /// stored row with its id assigned.
    async fn upsert_product(&self, product: Product) -> Result<Product, StoreError>;

    async fn find_finance_product(
        &self,
        product_id: i64,
        company_code: &str,
    ) -> Result<Option<FinanceProduct>, StoreError>;

    /// Upsert keyed by (product, company code); mutable fields overwrite.
    async fn save_finance_product(
        &self,
        finance_product: FinanceProduct,
    ) -> Result<(FinanceProduct, UpsertOutcome), StoreError>;

    /// Selective merge keyed by (finance product, repayment-type, rate-type,
    /// collateral-type): rate fields merge into an existing row with the
    /// same triple, otherwise a fresh row is inserted.
    async fn merge_loan_option(
        &self,
        option: FinanceLoanOption,
    ) -> Result<UpsertOutcome, StoreError>;

    async fn list_finance_products(
        &self,
        kind: FinanceProductKind,
    ) -> Result<Vec<(FinanceProduct, Product)>, StoreError>;

    async fn list_loan_options(
        &self,
        finance_product_id: i64,
    ) -> Result<Vec<FinanceLoanOption>, StoreError>;
}

#[async_trait]
pub trait HousingStore: Send + Sync {
    async fn lh_notice_exists(
        &self,
        title: &str,
        notice_date: &str,
    ) -> Result<bool, StoreError>;

    /// Insert-only: a notice whose (title, notice-date) already exists is
    /// skipped. Creates the owning product row in the same unit.
    async fn insert_lh_notice(
        &self,
        product: Product,
        notice: LhNotice,
    ) -> Result<UpsertOutcome, StoreError>;

    async fn list_lh_notices(&self) -> Result<Vec<LhNotice>, StoreError>;
    async fn recent_lh_notices(&self, limit: usize) -> Result<Vec<LhNotice>, StoreError>;

    async fn find_sh_announcement(
        &self,
        source: &str,
        external_id: &str,
    ) -> Result<Option<ShAnnouncement>, StoreError>;

    /// Merge upsert keyed by (source, external id): mutable fields update in
    /// place, the owning product row is created only on first sight.
    async fn upsert_sh_announcement(
        &self,
        product: Product,
        announcement: ShAnnouncement,
    ) -> Result<UpsertOutcome, StoreError>;

    async fn list_sh_announcements(&self) -> Result<Vec<ShAnnouncement>, StoreError>;
    async fn recent_sh_announcements(&self, limit: usize)
        -> Result<Vec<ShAnnouncement>, StoreError>;
}

#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn policy_exists(&self, policy_no: &str) -> Result<bool, StoreError>;

    /// Insert-only: repeated sightings of a policy number are no-ops.
    async fn insert_policy(
        &self,
        product: Product,
        policy: YouthPolicy,
    ) -> Result<UpsertOutcome, StoreError>;

    async fn list_policies(&self) -> Result<Vec<YouthPolicy>, StoreError>;

    /// Policies whose end date is today or later (open-ended included),
    /// newest start date first.
    async fn recent_active_policies(
        &self,
        today_compact: &str,
        limit: usize,
    ) -> Result<Vec<YouthPolicy>, StoreError>;
}

pub trait Store: FinanceStore + HousingStore + PolicyStore {}
impl<T: FinanceStore + HousingStore + PolicyStore> Store for T {}

/// True when the store already carries data from a previous run; used by the
/// bootstrap sync to decide whether to seed at all.
pub async fn has_initial_data(store: &dyn Store) -> Result<bool, StoreError> {
    Ok(!store.list_policies().await?.is_empty()
        || !store.list_lh_notices().await?.is_empty()
        || !store
            .list_finance_products(FinanceProductKind::Deposit)
            .await?
            .is_empty())
}

/* ---------------------------- memory store ---------------------------- */

#[derive(Debug, Default)]
struct MemoryInner {
    next_id: i64,
    products: HashMap<i64, Product>,
    companies: HashMap<String, FinanceCompany>,
    finance_products: Vec<FinanceProduct>,
    loan_options: Vec<FinanceLoanOption>,
    lh_notices: Vec<LhNotice>,
    sh_announcements: Vec<ShAnnouncement>,
    policies: Vec<YouthPolicy>,
}

impl MemoryInner {
    fn assign_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory store with the same natural-key semantics as the Postgres
/// backend. Backs unit tests and fixture runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl FinanceStore for MemoryStore {
    async fn upsert_company(&self, company: FinanceCompany) -> Result<UpsertOutcome, StoreError> {
        let mut inner = self.lock();
        match inner.companies.get_mut(&company.company_code) {
            Some(existing) => {
                let id = existing.id;
                *existing = FinanceCompany { id, ..company };
                Ok(UpsertOutcome::Updated)
            }
            None => {
                let id = inner.assign_id();
                inner.companies.insert(
                    company.company_code.clone(),
                    FinanceCompany {
                        id: Some(id),
                        ..company
                    },
                );
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    async fn find_company(&self, company_code: &str) -> Result<Option<FinanceCompany>, StoreError> {
        Ok(self.lock().companies.get(company_code).cloned())
    }

    async fn upsert_product(&self, product: Product) -> Result<Product, StoreError> {
        let mut inner = self.lock();
        let existing_id = inner
            .products
            .values()
            .find(|p| {
                p.kind == product.kind && p.name == product.name && p.provider == product.provider
            })
            .and_then(|p| p.id);
        let id = match existing_id {
            Some(id) => id,
            None => inner.assign_id(),
        };
        let stored = Product {
            id: Some(id),
            ..product
        };
        inner.products.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_finance_product(
        &self,
        product_id: i64,
        company_code: &str,
    ) -> Result<Option<FinanceProduct>, StoreError> {
        Ok(self
            .lock()
            .finance_products
            .iter()
            .find(|fp| fp.product_id == product_id && fp.company_code == company_code)
            .cloned())
    }

    async fn save_finance_product(
        &self,
        finance_product: FinanceProduct,
    ) -> Result<(FinanceProduct, UpsertOutcome), StoreError> {
        let mut inner = self.lock();
        if let Some(existing) = inner.finance_products.iter_mut().find(|fp| {
            fp.product_id == finance_product.product_id
                && fp.company_code == finance_product.company_code
        }) {
            let id = existing.id;
            *existing = FinanceProduct {
                id,
                ..finance_product
            };
            return Ok((existing.clone(), UpsertOutcome::Updated));
        }
        let id = inner.assign_id();
        let stored = FinanceProduct {
            id: Some(id),
            ..finance_product
        };
        inner.finance_products.push(stored.clone());
        Ok((stored, UpsertOutcome::Inserted))
    }

    async fn merge_loan_option(
        &self,
        option: FinanceLoanOption,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut inner = self.lock();
        let key: LoanOptionKey = option.option_key();
        if let Some(existing) = inner.loan_options.iter_mut().find(|o| {
            o.finance_product_id == option.finance_product_id && o.option_key() == key
        }) {
            existing.lend_rate_min = option.lend_rate_min;
            existing.lend_rate_avg = option.lend_rate_avg;
            existing.lend_rate_max = option.lend_rate_max;
            existing.credit_rate_type = option.credit_rate_type;
            existing.credit_rate_type_name = option.credit_rate_type_name;
            existing.credit_grades = option.credit_grades;
            return Ok(UpsertOutcome::Updated);
        }
        let id = inner.assign_id();
        inner.loan_options.push(FinanceLoanOption {
            id: Some(id),
            ..option
        });
        Ok(UpsertOutcome::Inserted)
    }

    async fn list_finance_products(
        &self,
        kind: FinanceProductKind,
    ) -> Result<Vec<(FinanceProduct, Product)>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .finance_products
            .iter()
            .filter(|fp| fp.kind == kind)
            .filter_map(|fp| {
                inner
                    .products
                    .get(&fp.product_id)
                    .map(|p| (fp.clone(), p.clone()))
            })
            .collect())
    }

    async fn list_loan_options(
        &self,
        finance_product_id: i64,
    ) -> Result<Vec<FinanceLoanOption>, StoreError> {
        Ok(self
            .lock()
            .loan_options
            .iter()
            .filter(|o| o.finance_product_id == finance_product_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl HousingStore for MemoryStore {
    async fn lh_notice_exists(&self, title: &str, notice_date: &str) -> Result<bool, StoreError> {
        Ok(self
            .lock()
            .lh_notices
            .iter()
            .any(|n| n.title == title && n.notice_date == notice_date))
    }

    async fn insert_lh_notice(
        &self,
        product: Product,
        notice: LhNotice,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut inner = self.lock();
        if inner
            .lh_notices
            .iter()
            .any(|n| n.title == notice.title && n.notice_date == notice.notice_date)
        {
            return Ok(UpsertOutcome::Skipped);
        }
        let product_id = inner.assign_id();
        inner.products.insert(
            product_id,
            Product {
                id: Some(product_id),
                ..product
            },
        );
        let id = inner.assign_id();
        inner.lh_notices.push(LhNotice {
            id: Some(id),
            product_id,
            ..notice
        });
        Ok(UpsertOutcome::Inserted)
    }

    async fn list_lh_notices(&self) -> Result<Vec<LhNotice>, StoreError> {
        Ok(self.lock().lh_notices.clone())
    }

    async fn recent_lh_notices(&self, limit: usize) -> Result<Vec<LhNotice>, StoreError> {
        let mut notices = self.lock().lh_notices.clone();
        notices.sort_by(|a, b| b.notice_date.cmp(&a.notice_date));
        notices.truncate(limit);
        Ok(notices)
    }

    async fn find_sh_announcement(
        &self,
        source: &str,
        external_id: &str,
    ) -> Result<Option<ShAnnouncement>, StoreError> {
        Ok(self
            .lock()
            .sh_announcements
            .iter()
            .find(|a| a.source == source && a.external_id == external_id)
            .cloned())
    }

    async fn upsert_sh_announcement(
        &self,
        product: Product,
        announcement: ShAnnouncement,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut inner = self.lock();
        if let Some(existing) = inner
            .sh_announcements
            .iter_mut()
            .find(|a| a.source == announcement.source && a.external_id == announcement.external_id)
        {
            let id = existing.id;
            let product_id = existing.product_id;
            let crawled_at = existing.crawled_at;
            *existing = ShAnnouncement {
                id,
                product_id,
                crawled_at,
                ..announcement
            };
            return Ok(UpsertOutcome::Updated);
        }
        let product_id = inner.assign_id();
        inner.products.insert(
            product_id,
            Product {
                id: Some(product_id),
                ..product
            },
        );
        let id = inner.assign_id();
        inner.sh_announcements.push(ShAnnouncement {
            id: Some(id),
            product_id,
            ..announcement
        });
        Ok(UpsertOutcome::Inserted)
    }

    async fn list_sh_announcements(&self) -> Result<Vec<ShAnnouncement>, StoreError> {
        Ok(self.lock().sh_announcements.clone())
    }

    async fn recent_sh_announcements(
        &self,
        limit: usize,
    ) -> Result<Vec<ShAnnouncement>, StoreError> {
        let mut rows = self.lock().sh_announcements.clone();
        rows.sort_by(|a, b| b.post_date.cmp(&a.post_date));
        rows.truncate(limit);
        Ok(rows)
    }
}

#[async_trait]
impl PolicyStore for MemoryStore {
    async fn policy_exists(&self, policy_no: &str) -> Result<bool, StoreError> {
        Ok(self.lock().policies.iter().any(|p| p.policy_no == policy_no))
    }

    async fn insert_policy(
        &self,
        product: Product,
        policy: YouthPolicy,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut inner = self.lock();
        if inner.policies.iter().any(|p| p.policy_no == policy.policy_no) {
            return Ok(UpsertOutcome::Skipped);
        }
        let product_id = inner.assign_id();
        inner.products.insert(
            product_id,
            Product {
                id: Some(product_id),
                ..product
            },
        );
        let id = inner.assign_id();
        inner.policies.push(YouthPolicy {
            id: Some(id),
            product_id,
            ..policy
        });
        Ok(UpsertOutcome::Inserted)
    }

    async fn list_policies(&self) -> Result<Vec<YouthPolicy>, StoreError> {
        Ok(self.lock().policies.clone())
    }

    async fn recent_active_policies(
        &self,
        today_compact: &str,
        limit: usize,
    ) -> Result<Vec<YouthPolicy>, StoreError> {
        let mut rows: Vec<YouthPolicy> = self
            .lock()
            .policies
            .iter()
            .filter(|p| match p.end_date.as_deref() {
                Some(end) => ybh_core::dates::is_open_ended(end) || end >= today_compact,
                None => true,
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        rows.truncate(limit);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ybh_core::{CreditGradeRates, ProductKind};

    fn company(code: &str, name: &str) -> FinanceCompany {
        FinanceCompany {
            id: None,
            company_code: code.to_string(),
            name: Some(name.to_string()),
            homepage: None,
            contact: None,
        }
    }

    fn policy(no: &str) -> (Product, YouthPolicy) {
        let product = Product::new(ProductKind::Policy, format!("policy {no}"), "온통청년");
        let policy = YouthPolicy {
            id: None,
            product_id: 0,
            policy_no: no.to_string(),
            name: format!("policy {no}"),
            description: None,
            keyword: None,
            category_large: None,
            category_middle: None,
            agency: None,
            apply_url: None,
            region_code: None,
            min_age: None,
            max_age: None,
            support_content: None,
            start_date: Some("20250101".into()),
            end_date: Some("20251231".into()),
            created_at: Utc::now(),
        };
        (product, policy)
    }

    #[tokio::test]
    async fn company_upsert_is_keyed_by_code() {
        let store = MemoryStore::new();
        assert_eq!(
            store.upsert_company(company("001", "첫번째은행")).await.unwrap(),
            UpsertOutcome::Inserted
        );
        assert_eq!(
            store.upsert_company(company("001", "바뀐이름")).await.unwrap(),
            UpsertOutcome::Updated
        );
        let found = store.find_company("001").await.unwrap().unwrap();
        assert_eq!(found.name.as_deref(), Some("바뀐이름"));
    }

    #[tokio::test]
    async fn policy_insert_is_idempotent_by_policy_no() {
        let store = MemoryStore::new();
        let (product, row) = policy("P001");
        assert_eq!(
            store.insert_policy(product.clone(), row.clone()).await.unwrap(),
            UpsertOutcome::Inserted
        );
        assert_eq!(
            store.insert_policy(product, row).await.unwrap(),
            UpsertOutcome::Skipped
        );
        assert_eq!(store.list_policies().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn loan_option_merge_updates_same_triple() {
        let store = MemoryStore::new();
        let option = FinanceLoanOption {
            id: None,
            finance_product_id: 7,
            lend_rate_min: Some(3.0),
            lend_rate_avg: Some(3.5),
            lend_rate_max: Some(4.0),
            repay_type_name: Some("분할상환방식".into()),
            rate_type_name: Some("변동금리".into()),
            collateral_type_name: Some("아파트".into()),
            credit_rate_type: None,
            credit_rate_type_name: None,
            credit_grades: CreditGradeRates::default(),
        };
        assert_eq!(
            store.merge_loan_option(option.clone()).await.unwrap(),
            UpsertOutcome::Inserted
        );
        let refreshed = FinanceLoanOption {
            lend_rate_avg: Some(3.8),
            ..option
        };
        assert_eq!(
            store.merge_loan_option(refreshed).await.unwrap(),
            UpsertOutcome::Updated
        );
        let options = store.list_loan_options(7).await.unwrap();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].lend_rate_avg, Some(3.8));
    }

    #[tokio::test]
    async fn recent_active_policies_excludes_ended() {
        let store = MemoryStore::new();
        let (product, mut expired) = policy("P-OLD");
        expired.end_date = Some("20240101".into());
        store.insert_policy(product, expired).await.unwrap();
        let (product, mut open) = policy("P-OPEN");
        open.end_date = Some("00000000".into());
        store.insert_policy(product, open).await.unwrap();

        let active = store.recent_active_policies("20250601", 10).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].policy_no, "P-OPEN");
    }
}
