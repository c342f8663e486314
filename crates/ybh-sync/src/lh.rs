//! Housing-authority A ingestion: pages through the lease-notice API until
//! an empty page, inserting notices keyed by (title, notice-date). Repeat
//! sightings are cheap skips; nothing is diffed.

use anyhow::Result;
use chrono::Utc;
use tracing::warn;
use ybh_adapters::lh::{LhNoticePages, LhNoticeRaw};
use ybh_adapters::FetchOutcome;
use ybh_core::{LhNotice, Product, ProductKind};
use ybh_storage::Store;

use crate::SourceReport;

pub const PROVIDER: &str = "LH 한국토지주택공사";

fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn map_notice(raw: &LhNoticeRaw) -> Option<(Product, LhNotice)> {
    let title = non_blank(&raw.title)?;
    let notice_date = non_blank(&raw.notice_date)?;
    let detail_url = raw.detail_url.as_deref().and_then(non_blank);
    let product = Product::new(ProductKind::Housing, title.clone(), PROVIDER)
        .with_detail_url(detail_url.clone());
    let notice = LhNotice {
        id: None,
        product_id: 0,
        notice_kind: raw.notice_kind.as_deref().and_then(non_blank),
        notice_detail_kind: raw.notice_detail_kind.as_deref().and_then(non_blank),
        title,
        region_name: raw.region_name.as_deref().and_then(non_blank),
        status: raw.status.as_deref().and_then(non_blank),
        notice_date,
        close_date: raw.close_date.as_deref().and_then(non_blank),
        detail_url,
        created_at: Utc::now(),
    };
    Some((product, notice))
}

/// Unbounded page loop: the API itself terminates the sync with an empty
/// page. A failed call truncates the run for this source.
pub async fn sync_lh_notices(
    pages: &dyn LhNoticePages,
    store: &dyn Store,
    page_size: u32,
) -> Result<SourceReport> {
    let mut report = SourceReport::new("lh");
    let mut page = 1u32;
    loop {
        match pages.notices(page, page_size).await {
            FetchOutcome::Page(records) => {
                report.pages += 1;
                for raw in &records {
                    let Some((product, notice)) = map_notice(raw) else {
                        report.skipped += 1;
                        continue;
                    };
                    if store
                        .lh_notice_exists(&notice.title, &notice.notice_date)
                        .await?
                    {
                        report.skipped += 1;
                        continue;
                    }
                    report.record(store.insert_lh_notice(product, notice).await?);
                }
            }
            FetchOutcome::Empty => break,
            FetchOutcome::Failed(err) => {
                warn!(page, error = %err, "lease-notice page failed; truncating run");
                report.failure = Some(err.to_string());
                break;
            }
        }
        page += 1;
    }
    Ok(report)
}
