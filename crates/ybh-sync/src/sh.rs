//! Housing-authority B ingestion: crawls the announcement board per
//! category and supply-type code, enriching each row from its detail page.
//! Upserts are keyed by (source, external id) and merge mutable fields.

use anyhow::Result;
use chrono::Utc;
use tracing::warn;
use ybh_adapters::sh::{supply_types, ShBoard, ShDetailRaw, ShListingRaw, SOURCE_ID};
use ybh_adapters::FetchOutcome;
use ybh_core::{dates, Product, ProductKind, RecruitStatus, ShAnnouncement, ShCategory};
use ybh_storage::Store;

use crate::SourceReport;

pub const PROVIDER: &str = "SH 서울주택도시공사";

/// District names scanned when deriving a region from the title.
const SEOUL_DISTRICTS: [&str; 25] = [
    "강남", "강동", "강북", "강서", "관악", "광진", "구로", "금천", "노원", "도봉", "동대문",
    "동작", "마포", "서대문", "서초", "성동", "성북", "송파", "양천", "영등포", "용산", "은평",
    "종로", "중구", "중랑",
];

/// Region out of the announcement title; board rows carry no region column.
pub fn extract_region(title: &str) -> &'static str {
    SEOUL_DISTRICTS
        .iter()
        .find(|district| title.contains(**district))
        .copied()
        .unwrap_or("서울")
}

fn parse_views(raw: &str) -> Option<i32> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn map_announcement(
    category: ShCategory,
    supply_type: &str,
    listing: &ShListingRaw,
    detail: &ShDetailRaw,
) -> (Product, ShAnnouncement) {
    let now = Utc::now();
    let product = Product::new(ProductKind::Housing, listing.title.clone(), PROVIDER)
        .with_detail_url(Some(listing.detail_url.clone()));
    let announcement = ShAnnouncement {
        id: None,
        product_id: 0,
        source: SOURCE_ID.to_string(),
        external_id: listing.external_id.clone(),
        title: listing.title.clone(),
        department: listing.department.clone(),
        post_date: listing
            .post_date
            .as_deref()
            .and_then(dates::parse_notice_date),
        views: listing.views.as_deref().and_then(parse_views),
        recruit_status: RecruitStatus::Now,
        supply_type: Some(supply_type.to_string()),
        category,
        region: Some(extract_region(&listing.title).to_string()),
        content_html: detail.content_html.clone(),
        attachments: detail.attachments.clone(),
        detail_url: Some(listing.detail_url.clone()),
        crawled_at: now,
        updated_at: now,
    };
    (product, announcement)
}

/// Crawl both boards. Each supply-type code runs its own page loop, so a
/// failure in one code does not starve the others.
pub async fn sync_sh_announcements(board: &dyn ShBoard, store: &dyn Store) -> Result<SourceReport> {
    let mut report = SourceReport::new("sh");
    for category in [ShCategory::Rent, ShCategory::Sale] {
        for (code, supply_type) in supply_types(category).iter().copied() {
            let mut page = 1u32;
            loop {
                match board.listing(category, code, page).await {
                    FetchOutcome::Page(rows) => {
                        report.pages += 1;
                        for listing in &rows {
                            // Detail enrichment is best-effort.
                            let detail = match board.detail(&listing.detail_url).await {
                                FetchOutcome::Page(detail) => detail,
                                FetchOutcome::Empty => ShDetailRaw::default(),
                                FetchOutcome::Failed(err) => {
                                    warn!(url = %listing.detail_url, error = %err, "detail fetch failed");
                                    ShDetailRaw::default()
                                }
                            };
                            let (product, announcement) =
                                map_announcement(category, supply_type, listing, &detail);
                            report.record(
                                store.upsert_sh_announcement(product, announcement).await?,
                            );
                        }
                    }
                    FetchOutcome::Empty => break,
                    FetchOutcome::Failed(err) => {
                        warn!(?category, code, page, error = %err, "listing page failed; stopping this code");
                        report.failure = Some(err.to_string());
                        break;
                    }
                }
                page += 1;
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ybh_storage::{HousingStore, MemoryStore};

    struct ScriptedBoard;

    fn listing(title: &str, external_id: &str) -> ShListingRaw {
        ShListingRaw {
            title: title.to_string(),
            external_id: external_id.to_string(),
            department: Some("맞춤주택부".to_string()),
            post_date: Some("2025-11-18".to_string()),
            views: Some("1,204".to_string()),
            detail_url: format!("https://www.i-sh.co.kr/view.do?seq={external_id}"),
        }
    }

    #[async_trait]
    impl ShBoard for ScriptedBoard {
        async fn listing(
            &self,
            category: ShCategory,
            supply_code: &str,
            page: u32,
        ) -> FetchOutcome<Vec<ShListingRaw>> {
            if category == ShCategory::Rent && supply_code == "10" && page == 1 {
                return FetchOutcome::Page(vec![listing("강남 청년안심주택 모집", "45821")]);
            }
            FetchOutcome::Empty
        }

        async fn detail(&self, _url: &str) -> FetchOutcome<ShDetailRaw> {
            FetchOutcome::Failed(ybh_adapters::AdapterError::Message("detail down".into()))
        }
    }

    #[tokio::test]
    async fn announcements_upsert_and_survive_detail_failures() {
        let store = MemoryStore::new();
        let report = sync_sh_announcements(&ScriptedBoard, &store).await.unwrap();
        assert_eq!(report.inserted, 1);
        assert!(report.failure.is_none());

        let rows = store.list_sh_announcements().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].external_id, "45821");
        assert_eq!(rows[0].region.as_deref(), Some("강남"));
        assert_eq!(rows[0].views, Some(1204));
        assert!(rows[0].content_html.is_none());

        // Re-crawl merges into the existing row.
        let report = sync_sh_announcements(&ScriptedBoard, &store).await.unwrap();
        assert_eq!(report.inserted, 0);
        assert_eq!(report.updated, 1);
        assert_eq!(store.list_sh_announcements().await.unwrap().len(), 1);
    }

    #[test]
    fn region_extraction_scans_districts_with_fallback() {
        assert_eq!(extract_region("은평 행복주택 추가모집"), "은평");
        assert_eq!(extract_region("청년 매입임대 통합공고"), "서울");
    }
}
