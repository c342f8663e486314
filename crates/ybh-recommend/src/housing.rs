//! Housing notice ranking.
//!
//! The engine loads the complete candidate set and filters in memory:
//! notices without a readable close date (or already past it) are excluded,
//! the rest are scored by region tier, posting recency, and days until
//! close. Lower score = higher rank.

use chrono::NaiveDate;
use serde::Serialize;
use ybh_core::{dates, LhNotice, ShAnnouncement, UserProfile};

use crate::{join_reasons, Scored, MAX_RESULTS};

// Weighted-sum components. Region dominates, recency and urgency break the
// field apart inside a region tier.
const REGION_EXACT: f64 = 0.0;
const REGION_PARTIAL: f64 = 10.0;
const REGION_NONE: f64 = 20.0;
const RECENCY_PER_DAY: f64 = 0.5;
const RECENCY_CAP_DAYS: i64 = 30;
const URGENCY_PER_DAY: f64 = 1.0;
const URGENCY_CAP_DAYS: i64 = 30;
const CLOSING_SOON_DAYS: i64 = 7;
const RECENT_POST_DAYS: i64 = 7;

/// Unified projection over both housing-notice variants.
#[derive(Debug, Clone, Serialize)]
pub struct HousingCandidate {
    pub title: String,
    pub provider: String,
    pub region_name: Option<String>,
    pub notice_date: Option<NaiveDate>,
    pub close_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub detail_url: Option<String>,
}

impl HousingCandidate {
    pub fn from_lh(notice: &LhNotice) -> Self {
        Self {
            title: notice.title.clone(),
            provider: "LH 한국토지주택공사".to_string(),
            region_name: notice.region_name.clone(),
            notice_date: dates::parse_notice_date(&notice.notice_date),
            close_date: notice.close_date.as_deref().and_then(dates::parse_notice_date),
            status: notice.status.clone(),
            category: notice.notice_kind.clone(),
            detail_url: notice.detail_url.clone(),
        }
    }

    /// Board announcements publish no close date, so they fall out at the
    /// deadline filter; the projection exists so the caller can hand the
    /// engine one combined set.
    pub fn from_sh(announcement: &ShAnnouncement) -> Self {
        Self {
            title: announcement.title.clone(),
            provider: "SH 서울주택도시공사".to_string(),
            region_name: announcement.region.clone(),
            notice_date: announcement.post_date,
            close_date: None,
            status: None,
            category: announcement.supply_type.clone(),
            detail_url: announcement.detail_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegionTier {
    Exact,
    Partial,
    None,
}

fn region_tier(user_region: Option<&str>, notice_region: Option<&str>) -> RegionTier {
    let (Some(user), Some(notice)) = (user_region, notice_region) else {
        // A profile with no region degrades every notice to the worst tier.
        return RegionTier::None;
    };
    let user = user.trim();
    let notice = notice.trim();
    if user.is_empty() || notice.is_empty() {
        return RegionTier::None;
    }
    if user == notice {
        return RegionTier::Exact;
    }
    if user.contains(notice) || notice.contains(user) {
        return RegionTier::Partial;
    }
    let user_head: String = user.chars().take(2).collect();
    let notice_head: String = notice.chars().take(2).collect();
    if user_head == notice_head {
        RegionTier::Partial
    } else {
        RegionTier::None
    }
}

pub fn recommend_housing(
    profile: &UserProfile,
    candidates: &[HousingCandidate],
    today: NaiveDate,
) -> Vec<Scored<HousingCandidate>> {
    let mut scored: Vec<Scored<HousingCandidate>> = candidates
        .iter()
        .filter_map(|candidate| {
            let close_date = candidate.close_date?;
            let days_until_close = (close_date - today).num_days();
            if days_until_close < 0 {
                return None;
            }

            let tier = region_tier(profile.region.as_deref(), candidate.region_name.as_deref());
            let region_score = match tier {
                RegionTier::Exact => REGION_EXACT,
                RegionTier::Partial => REGION_PARTIAL,
                RegionTier::None => REGION_NONE,
            };

            let days_since_notice = candidate
                .notice_date
                .map(|d| (today - d).num_days().max(0))
                .unwrap_or(RECENCY_CAP_DAYS);
            let recency_score = days_since_notice.min(RECENCY_CAP_DAYS) as f64 * RECENCY_PER_DAY;
            let urgency_score = days_until_close.min(URGENCY_CAP_DAYS) as f64 * URGENCY_PER_DAY;

            let score = region_score + recency_score + urgency_score;

            let mut reasons = Vec::new();
            match tier {
                RegionTier::Exact => reasons.push("거주 지역과 동일 지역 공고"),
                RegionTier::Partial => reasons.push("거주 생활권 내 공고"),
                RegionTier::None => reasons.push("타지역 공고이지만 조건 적합"),
            }
            if days_until_close <= CLOSING_SOON_DAYS {
                reasons.push("마감 임박 공고");
            }
            if days_since_notice <= RECENT_POST_DAYS {
                reasons.push("최근 게시된 공고");
            }

            Some(Scored {
                item: candidate.clone(),
                score,
                reason: join_reasons(reasons),
            })
        })
        .collect();

    // Ascending by score; ties go to the more recent notice. The tie-break
    // is implementation-chosen, kept stable for test determinism.
    scored.sort_by(|a, b| {
        a.score
            .partial_cmp(&b.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.item.notice_date.cmp(&a.item.notice_date))
    });
    scored.truncate(MAX_RESULTS);
    scored
}

/// Notices closing within the next `days` (today inclusive), soonest first.
pub fn closing_soon(
    candidates: &[HousingCandidate],
    today: NaiveDate,
    days: i64,
) -> Vec<HousingCandidate> {
    let mut rows: Vec<HousingCandidate> = candidates
        .iter()
        .filter(|c| {
            c.close_date
                .map(|close| {
                    let left = (close - today).num_days();
                    (0..=days).contains(&left)
                })
                .unwrap_or(false)
        })
        .cloned()
        .collect();
    rows.sort_by(|a, b| a.close_date.cmp(&b.close_date));
    rows
}

/// Notices posted within the last `days`, newest first.
pub fn recently_posted(
    candidates: &[HousingCandidate],
    today: NaiveDate,
    days: i64,
) -> Vec<HousingCandidate> {
    let mut rows: Vec<HousingCandidate> = candidates
        .iter()
        .filter(|c| {
            c.notice_date
                .map(|posted| {
                    let age = (today - posted).num_days();
                    (0..=days).contains(&age)
                })
                .unwrap_or(false)
        })
        .cloned()
        .collect();
    rows.sort_by(|a, b| b.notice_date.cmp(&a.notice_date));
    rows
}
