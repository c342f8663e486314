//! "Recent notices" merged feed for the home surface: the latest rows of
//! each source folded into reverse-chronological lists, with a per-source
//! fallback chain for the timestamp.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use ybh_core::region::region_display_name;
use ybh_core::{dates, LhNotice, ShAnnouncement, YouthPolicy};

use crate::policy::in_active_window;

pub const FEED_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecentKind {
    #[serde(rename = "주거")]
    Housing,
    #[serde(rename = "정책")]
    Policy,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentNotice {
    pub kind: RecentKind,
    pub title: String,
    pub region: Option<String>,
    pub created_at: DateTime<Utc>,
    pub link: String,
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

pub fn from_lh(notice: &LhNotice, now: DateTime<Utc>) -> RecentNotice {
    // Posting date first, falling back to "now" when unreadable.
    let created_at = dates::parse_notice_date(&notice.notice_date)
        .map(midnight)
        .unwrap_or(now);
    RecentNotice {
        kind: RecentKind::Housing,
        title: notice.title.clone(),
        region: notice.region_name.clone(),
        created_at,
        link: "/housing".to_string(),
    }
}

pub fn from_sh(announcement: &ShAnnouncement) -> RecentNotice {
    // Post date first; a row scraped without one falls back to the crawl
    // timestamp, which every stored announcement carries.
    let created_at = announcement
        .post_date
        .map(midnight)
        .unwrap_or(announcement.crawled_at);
    RecentNotice {
        kind: RecentKind::Housing,
        title: announcement.title.clone(),
        region: announcement.region.clone(),
        created_at,
        link: "/housing".to_string(),
    }
}

/// Policies outside their active window drop out of the feed.
pub fn from_policy(policy: &YouthPolicy, today: NaiveDate) -> Option<RecentNotice> {
    if !in_active_window(policy, today) {
        return None;
    }
    let start = dates::parse_compact_date(policy.start_date.as_deref()?)?;
    let region = policy.region_code.as_deref().map(region_display_name);
    Some(RecentNotice {
        kind: RecentKind::Policy,
        title: policy.name.clone(),
        region,
        created_at: midnight(start),
        link: "/policy".to_string(),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentNoticeFeed {
    pub all: Vec<RecentNotice>,
    pub housing: Vec<RecentNotice>,
    pub policy: Vec<RecentNotice>,
}

fn newest_first(mut rows: Vec<RecentNotice>, limit: usize) -> Vec<RecentNotice> {
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    rows.truncate(limit);
    rows
}

pub fn build_feed(
    lh_notices: &[LhNotice],
    sh_announcements: &[ShAnnouncement],
    policies: &[YouthPolicy],
    today: NaiveDate,
    now: DateTime<Utc>,
) -> RecentNoticeFeed {
    let lh: Vec<RecentNotice> = lh_notices.iter().map(|n| from_lh(n, now)).collect();
    let sh: Vec<RecentNotice> = sh_announcements.iter().map(from_sh).collect();
    let policy = newest_first(
        policies.iter().filter_map(|p| from_policy(p, today)).collect(),
        FEED_SIZE,
    );

    let housing = newest_first(lh.into_iter().chain(sh).collect(), FEED_SIZE);
    let all = newest_first(
        housing.iter().cloned().chain(policy.iter().cloned()).collect(),
        FEED_SIZE,
    );

    RecentNoticeFeed {
        all,
        housing,
        policy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn lh(title: &str, notice_date: &str) -> LhNotice {
        LhNotice {
            id: None,
            product_id: 1,
            notice_kind: None,
            notice_detail_kind: None,
            title: title.to_string(),
            region_name: Some("서울특별시".to_string()),
            status: Some("공고중".to_string()),
            notice_date: notice_date.to_string(),
            close_date: None,
            detail_url: None,
            created_at: Utc::now(),
        }
    }

    fn sh(title: &str, post_date: Option<&str>) -> ShAnnouncement {
        ShAnnouncement {
            id: None,
            product_id: 1,
            source: "i-sh".to_string(),
            external_id: "1".to_string(),
            title: title.to_string(),
            department: None,
            post_date: post_date.and_then(dates::parse_notice_date),
            views: None,
            recruit_status: ybh_core::RecruitStatus::Now,
            supply_type: None,
            category: ybh_core::ShCategory::Rent,
            region: Some("강남".to_string()),
            content_html: None,
            attachments: vec![],
            detail_url: None,
            crawled_at: midnight(NaiveDate::from_ymd_opt(2025, 6, 14).unwrap()),
            updated_at: midnight(NaiveDate::from_ymd_opt(2025, 6, 14).unwrap()),
        }
    }

    fn policy(name: &str, start: &str, end: &str, region_code: &str) -> YouthPolicy {
        YouthPolicy {
            id: None,
            product_id: 1,
            policy_no: name.to_string(),
            name: name.to_string(),
            description: None,
            keyword: None,
            category_large: None,
            category_middle: None,
            agency: None,
            apply_url: None,
            region_code: Some(region_code.to_string()),
            min_age: None,
            max_age: None,
            support_content: None,
            start_date: Some(start.to_string()),
            end_date: Some(end.to_string()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn lh_date_fallback_uses_now_for_unreadable_dates() {
        let now = midnight(today());
        assert_eq!(
            from_lh(&lh("a", "2025.06.10"), now).created_at,
            midnight(NaiveDate::from_ymd_opt(2025, 6, 10).unwrap())
        );
        assert_eq!(from_lh(&lh("b", "상시"), now).created_at, now);
    }

    #[test]
    fn sh_date_fallback_prefers_post_date_then_crawl_time() {
        let with_post = from_sh(&sh("a", Some("2025-06-12")));
        assert_eq!(
            with_post.created_at,
            midnight(NaiveDate::from_ymd_opt(2025, 6, 12).unwrap())
        );
        let without_post = from_sh(&sh("b", None));
        assert_eq!(
            without_post.created_at,
            midnight(NaiveDate::from_ymd_opt(2025, 6, 14).unwrap())
        );
    }

    #[test]
    fn policy_entries_respect_active_window_and_region_mapping() {
        assert!(from_policy(&policy("만료", "20250101", "20250601", "11110"), today()).is_none());
        let entry =
            from_policy(&policy("진행", "20250601", "00000000", "11110"), today()).unwrap();
        assert_eq!(entry.region.as_deref(), Some("서울특별시"));
        let raw_code =
            from_policy(&policy("미지정", "20250601", "00000000", "99999"), today()).unwrap();
        assert_eq!(raw_code.region.as_deref(), Some("99999"));
    }

    #[test]
    fn feed_merges_sources_reverse_chronologically() {
        let feed = build_feed(
            &[lh("LH 공고", "2025-06-13")],
            &[sh("SH 공고", Some("2025-06-14"))],
            &[policy("정책", "20250612", "00000000", "11110")],
            today(),
            Utc::now(),
        );
        assert_eq!(feed.housing.len(), 2);
        assert_eq!(feed.housing[0].title, "SH 공고");
        assert_eq!(feed.policy.len(), 1);
        assert_eq!(feed.all.len(), 3);
        assert_eq!(feed.all[0].title, "SH 공고");
        assert_eq!(feed.all[2].title, "정책");
    }

    #[test]
    fn feed_caps_each_list_at_five() {
        let notices: Vec<LhNotice> = (1..=8)
            .map(|d| lh(&format!("공고 {d}"), &format!("2025-06-{d:02}")))
            .collect();
        let feed = build_feed(&notices, &[], &[], today(), Utc::now());
        assert_eq!(feed.housing.len(), FEED_SIZE);
        assert_eq!(feed.housing[0].title, "공고 8");
    }
}
