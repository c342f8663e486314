//! Youth-policy catalog ingestion: pages until the catalog runs dry,
//! creating each policy number on first sight. Repeat sightings are
//! idempotent skips with no field-level diffing.

use anyhow::Result;
use chrono::Utc;
use tracing::warn;
use ybh_adapters::youth::{PolicyCatalog, YouthPolicyRaw};
use ybh_adapters::FetchOutcome;
use ybh_core::{dates, Product, ProductKind, YouthPolicy};
use ybh_storage::Store;

use crate::SourceReport;

pub const PROVIDER: &str = "온통청년";

fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn map_policy(raw: &YouthPolicyRaw) -> Option<(Product, YouthPolicy)> {
    let policy_no = non_blank(&raw.plcy_no)?;
    let name = non_blank(&raw.plcy_nm)?;
    let apply_url = raw.aply_url_addr.as_deref().and_then(non_blank);
    let product = Product::new(ProductKind::Policy, name.clone(), PROVIDER)
        .with_detail_url(apply_url.clone());
    let policy = YouthPolicy {
        id: None,
        product_id: 0,
        policy_no,
        name,
        description: raw.plcy_expln_cn.as_deref().and_then(non_blank),
        keyword: raw.plcy_kywd_nm.as_deref().and_then(non_blank),
        category_large: raw.lclsf_nm.as_deref().and_then(non_blank),
        category_middle: raw.mclsf_nm.as_deref().and_then(non_blank),
        agency: raw.sprvsn_inst_cd_nm.as_deref().and_then(non_blank),
        apply_url,
        region_code: raw.zip_cd.as_deref().and_then(non_blank),
        min_age: raw.sprt_trgt_min_age.as_deref().and_then(dates::parse_age),
        max_age: raw.sprt_trgt_max_age.as_deref().and_then(dates::parse_age),
        support_content: raw.plcy_sprt_cn.as_deref().and_then(non_blank),
        start_date: raw.biz_prd_bgng_ymd.as_deref().and_then(non_blank),
        end_date: raw.biz_prd_end_ymd.as_deref().and_then(non_blank),
        created_at: Utc::now(),
    };
    Some((product, policy))
}

pub async fn sync_policies(
    catalog: &dyn PolicyCatalog,
    store: &dyn Store,
    page_size: u32,
) -> Result<SourceReport> {
    let mut report = SourceReport::new("youth");
    let mut page = 1u32;
    loop {
        match catalog.policies(page, page_size).await {
            FetchOutcome::Page(records) => {
                report.pages += 1;
                for raw in &records {
                    let Some((product, policy)) = map_policy(raw) else {
                        report.skipped += 1;
                        continue;
                    };
                    if store.policy_exists(&policy.policy_no).await? {
                        report.skipped += 1;
                        continue;
                    }
                    report.record(store.insert_policy(product, policy).await?);
                }
            }
            FetchOutcome::Empty => break,
            FetchOutcome::Failed(err) => {
                warn!(page, error = %err, "policy page failed; truncating run");
                report.failure = Some(err.to_string());
                break;
            }
        }
        page += 1;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use ybh_storage::{MemoryStore, PolicyStore};

    struct ScriptedCatalog {
        calls: AtomicU32,
        pages: Vec<Vec<YouthPolicyRaw>>,
    }

    fn raw(policy_no: &str, name: &str) -> YouthPolicyRaw {
        YouthPolicyRaw {
            plcy_no: policy_no.to_string(),
            plcy_nm: name.to_string(),
            plcy_kywd_nm: Some("소득,지원".to_string()),
            plcy_expln_cn: None,
            lclsf_nm: Some("주거".to_string()),
            mclsf_nm: None,
            sprvsn_inst_cd_nm: Some("국토교통부".to_string()),
            aply_url_addr: None,
            zip_cd: Some("11110".to_string()),
            sprt_trgt_min_age: Some("19".to_string()),
            sprt_trgt_max_age: Some("34".to_string()),
            plcy_sprt_cn: None,
            biz_prd_bgng_ymd: Some("20250301".to_string()),
            biz_prd_end_ymd: Some("20251231".to_string()),
        }
    }

    #[async_trait]
    impl PolicyCatalog for ScriptedCatalog {
        async fn policies(&self, page: u32, _page_size: u32) -> FetchOutcome<Vec<YouthPolicyRaw>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.pages.get((page - 1) as usize) {
                Some(records) if !records.is_empty() => FetchOutcome::Page(records.clone()),
                _ => FetchOutcome::Empty,
            }
        }
    }

    #[tokio::test]
    async fn known_policy_is_skipped_new_one_saved_in_two_fetches() {
        let store = MemoryStore::new();
        let catalog = ScriptedCatalog {
            calls: AtomicU32::new(0),
            pages: vec![vec![raw("P001", "기존 정책")]],
        };
        sync_policies(&catalog, &store, 100).await.unwrap();
        assert_eq!(store.list_policies().await.unwrap().len(), 1);

        // P001 already stored, P002 new, page 2 empty.
        let catalog = ScriptedCatalog {
            calls: AtomicU32::new(0),
            pages: vec![vec![raw("P001", "기존 정책"), raw("P002", "신규 정책")]],
        };
        let report = sync_policies(&catalog, &store, 100).await.unwrap();
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 2);
        assert_eq!(report.inserted, 1);
        assert_eq!(report.skipped, 1);

        let policies = store.list_policies().await.unwrap();
        assert_eq!(policies.len(), 2);
        assert!(policies.iter().any(|p| p.policy_no == "P002"));
    }

    #[tokio::test]
    async fn age_bounds_parse_from_provider_strings() {
        let store = MemoryStore::new();
        let catalog = ScriptedCatalog {
            calls: AtomicU32::new(0),
            pages: vec![vec![raw("P010", "연령 정책")]],
        };
        sync_policies(&catalog, &store, 100).await.unwrap();
        let policies = store.list_policies().await.unwrap();
        assert_eq!(policies[0].min_age, Some(19));
        assert_eq!(policies[0].max_age, Some(34));
    }

    #[tokio::test]
    async fn record_without_policy_no_is_skipped_not_fatal() {
        let store = MemoryStore::new();
        let catalog = ScriptedCatalog {
            calls: AtomicU32::new(0),
            pages: vec![vec![raw("", "번호 없는 정책"), raw("P020", "정상 정책")]],
        };
        let report = sync_policies(&catalog, &store, 100).await.unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(report.skipped, 1);
        assert!(report.failure.is_none());
    }
}
