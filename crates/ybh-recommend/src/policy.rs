//! Youth-policy ranking: active-window filtering, strict/loose region
//! matching over 5-digit region codes, and age/income scoring.

use chrono::{Months, NaiveDate};
use serde::Serialize;
use ybh_core::region::{any_code_has_prefix, prefix_for_user_region, region_display_name, region_prefix};
use ybh_core::{dates, UserProfile, YouthPolicy};

use crate::{join_reasons, Scored, MAX_RESULTS};

const REGION_STRICT: f64 = 0.0;
const REGION_LOOSE: f64 = 5.0;
const REGION_UNKNOWN: f64 = 10.0;
const AGE_PER_YEAR: f64 = 1.0;
const AGE_UNKNOWN: f64 = 5.0;
const INCOME_MATCHED: f64 = 0.0;
const INCOME_UNMATCHED: f64 = 4.0;
const INCOME_UNKNOWN: f64 = 2.0;

/// Keywords that mark a policy as income-support related.
const INCOME_KEYWORDS: [&str; 5] = ["소득", "보조금", "지원", "장려금", "대출"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionMatchMode {
    /// The user's full region string must line up with the policy's
    /// region-code display name, and the policy must target one province.
    Strict,
    /// Only the 2-digit province prefix has to match.
    Loose,
}

#[derive(Debug, Clone, Serialize)]
pub struct PolicyProjection {
    pub policy_no: String,
    pub name: String,
    pub agency: Option<String>,
    pub apply_url: Option<String>,
    /// Region-code-derived display name; the raw code when unmapped.
    pub region: Option<String>,
    pub keyword: Option<String>,
    pub category_large: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl PolicyProjection {
    fn from_policy(policy: &YouthPolicy) -> Self {
        Self {
            policy_no: policy.policy_no.clone(),
            name: policy.name.clone(),
            agency: policy.agency.clone(),
            apply_url: policy.apply_url.clone(),
            region: policy.region_code.as_deref().map(region_display_name),
            keyword: policy.keyword.clone(),
            category_large: policy.category_large.clone(),
            start_date: policy.start_date.clone(),
            end_date: policy.end_date.clone(),
        }
    }
}

/// Active-window filter: a policy is a candidate when its period has begun
/// or begins within a month, and has not ended. The open-ended end marker
/// bypasses the end check; an unreadable date excludes the candidate.
pub fn in_active_window(policy: &YouthPolicy, today: NaiveDate) -> bool {
    let Some(start_raw) = policy.start_date.as_deref() else {
        return false;
    };
    let Some(start) = dates::parse_compact_date(start_raw) else {
        return false;
    };
    let horizon = today
        .checked_add_months(Months::new(1))
        .unwrap_or(today);
    if start > horizon {
        return false;
    }

    match policy.end_date.as_deref() {
        Some(end_raw) if dates::is_open_ended(end_raw) => true,
        Some(end_raw) => match dates::parse_compact_date(end_raw) {
            Some(end) => end >= today,
            None => false,
        },
        None => false,
    }
}

fn matches_region(policy: &YouthPolicy, user_prefix: &str, user_region: &str, mode: RegionMatchMode) -> bool {
    let Some(codes) = policy.region_code.as_deref() else {
        return false;
    };
    if !any_code_has_prefix(codes, user_prefix) {
        return false;
    }
    match mode {
        RegionMatchMode::Loose => true,
        RegionMatchMode::Strict => {
            let mut prefixes: Vec<&str> = codes.split(',').filter_map(region_prefix).collect();
            prefixes.sort_unstable();
            prefixes.dedup();
            if prefixes.len() > 1 {
                return false;
            }
            let display = region_display_name(codes.split(',').next().unwrap_or_default().trim());
            !display.is_empty() && user_region.contains(&display)
        }
    }
}

fn age_fit(policy: &YouthPolicy, age: Option<u32>) -> (f64, bool) {
    let Some(age) = age else {
        return (AGE_UNKNOWN, false);
    };
    let age = age as i64;
    let min = policy.min_age.map(|v| v as i64);
    let max = policy.max_age.map(|v| v as i64);
    let distance = match (min, max) {
        (Some(min), _) if age < min => min - age,
        (_, Some(max)) if age > max => age - max,
        _ => 0,
    };
    (distance as f64 * AGE_PER_YEAR, distance == 0)
}

fn income_fit(policy: &YouthPolicy, income_band: Option<&str>) -> (f64, bool) {
    let Some(band) = income_band else {
        return (INCOME_UNKNOWN, false);
    };
    if band.trim().is_empty() {
        return (INCOME_UNKNOWN, false);
    }
    let matched = policy
        .keyword
        .as_deref()
        .map(|keyword| INCOME_KEYWORDS.iter().any(|needle| keyword.contains(needle)))
        .unwrap_or(false);
    if matched {
        (INCOME_MATCHED, true)
    } else {
        (INCOME_UNMATCHED, false)
    }
}

pub fn recommend_policies(
    profile: &UserProfile,
    policies: &[YouthPolicy],
    today: NaiveDate,
    mode: RegionMatchMode,
) -> Vec<Scored<PolicyProjection>> {
    let user_region = profile.region.as_deref().map(str::trim).filter(|r| !r.is_empty());
    let user_prefix = user_region.and_then(prefix_for_user_region);

    let mut scored: Vec<Scored<PolicyProjection>> = policies
        .iter()
        .filter(|policy| in_active_window(policy, today))
        .filter_map(|policy| {
            let region_score = match (user_region, user_prefix) {
                (Some(region), Some(prefix)) => {
                    if !matches_region(policy, prefix, region, mode) {
                        return None;
                    }
                    match mode {
                        RegionMatchMode::Strict => REGION_STRICT,
                        RegionMatchMode::Loose => REGION_LOOSE,
                    }
                }
                // No usable region on the profile: keep the candidate at
                // the worst region tier instead of failing.
                _ => REGION_UNKNOWN,
            };

            let (age_score, age_matched) = age_fit(policy, profile.age);
            let (income_score, income_matched) = income_fit(policy, profile.income_band.as_deref());
            let score = region_score + age_score + income_score;

            let mut reasons = Vec::new();
            if region_score == REGION_STRICT && user_region.is_some() {
                reasons.push("거주 지역 대상 정책");
            } else if region_score == REGION_LOOSE {
                reasons.push("광역 생활권 대상 정책");
            } else {
                reasons.push("전국 단위 추천");
            }
            if age_matched {
                reasons.push("신청 가능 연령에 해당");
            }
            if income_matched {
                reasons.push("소득 지원 관련 정책");
            }
            if policy.end_date.as_deref().is_some_and(dates::is_open_ended) {
                reasons.push("상시 모집");
            }

            Some(Scored {
                item: PolicyProjection::from_policy(policy),
                score,
                reason: join_reasons(reasons),
            })
        })
        .collect();

    // Ascending by score; ties go to the later start date.
    scored.sort_by(|a, b| {
        a.score
            .partial_cmp(&b.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.item.start_date.cmp(&a.item.start_date))
    });
    scored.truncate(MAX_RESULTS);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn policy(no: &str, region_code: &str, start: &str, end: &str) -> YouthPolicy {
        YouthPolicy {
            id: None,
            product_id: 0,
            policy_no: no.to_string(),
            name: format!("정책 {no}"),
            description: None,
            keyword: Some("소득,주거지원".to_string()),
            category_large: Some("주거".to_string()),
            category_middle: None,
            agency: None,
            apply_url: None,
            region_code: Some(region_code.to_string()),
            min_age: Some(19),
            max_age: Some(34),
            support_content: None,
            start_date: Some(start.to_string()),
            end_date: Some(end.to_string()),
            created_at: Utc::now(),
        }
    }

    fn profile() -> UserProfile {
        UserProfile {
            age: Some(29),
            region: Some("서울특별시 강서구".to_string()),
            income_band: Some("중위소득 100% 이하".to_string()),
        }
    }

    #[test]
    fn active_window_excludes_ended_and_far_future() {
        // Ended yesterday → excluded.
        assert!(!in_active_window(
            &policy("P1", "11110", "20250101", "20250614"),
            today()
        ));
        // Open-ended end never excludes on end-date grounds.
        assert!(in_active_window(
            &policy("P2", "11110", "20250101", "00000000"),
            today()
        ));
        // Starts two months out → excluded.
        assert!(!in_active_window(
            &policy("P3", "11110", "20250815", "20251231"),
            today()
        ));
        // Starts within a month → included.
        assert!(in_active_window(
            &policy("P4", "11110", "20250710", "20251231"),
            today()
        ));
        // Unreadable dates exclude the candidate instead of raising.
        assert!(!in_active_window(
            &policy("P5", "11110", "상시", "20251231"),
            today()
        ));
    }

    #[test]
    fn loose_mode_matches_on_province_prefix_only() {
        let seoul = policy("P1", "11110,11140", "20250101", "20251231");
        let busan = policy("P2", "26110", "20250101", "20251231");
        let ranked =
            recommend_policies(&profile(), &[seoul, busan], today(), RegionMatchMode::Loose);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].item.policy_no, "P1");
        assert_eq!(ranked[0].item.region.as_deref(), Some("서울특별시"));
    }

    #[test]
    fn strict_mode_rejects_multi_province_policies() {
        let multi = policy("P1", "11110,41110", "20250101", "20251231");
        let single = policy("P2", "11110", "20250101", "20251231");
        let ranked = recommend_policies(
            &profile(),
            &[multi, single],
            today(),
            RegionMatchMode::Strict,
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].item.policy_no, "P2");
        assert!(ranked[0].reason.contains("거주 지역 대상 정책"));
    }

    #[test]
    fn age_outside_range_scores_by_distance() {
        let mut profile = profile();
        profile.age = Some(40);
        let ranked = recommend_policies(
            &profile,
            &[policy("P1", "11110", "20250101", "20251231")],
            today(),
            RegionMatchMode::Loose,
        );
        // 40 vs max 34 → 6 years over, on top of the loose-region and
        // income-match components.
        assert_eq!(ranked[0].score, REGION_LOOSE + 6.0);
        assert!(!ranked[0].reason.contains("신청 가능 연령"));
    }

    #[test]
    fn missing_profile_fields_degrade_scores() {
        let blank = UserProfile::default();
        let ranked = recommend_policies(
            &blank,
            &[policy("P1", "11110", "20250101", "00000000")],
            today(),
            RegionMatchMode::Loose,
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(
            ranked[0].score,
            REGION_UNKNOWN + AGE_UNKNOWN + INCOME_UNKNOWN
        );
        assert!(ranked[0].reason.contains("상시 모집"));
    }

    #[test]
    fn ties_break_by_start_date_descending() {
        let early = policy("P1", "11110", "20250201", "20251231");
        let late = policy("P2", "11110", "20250601", "20251231");
        let ranked =
            recommend_policies(&profile(), &[early, late], today(), RegionMatchMode::Loose);
        assert_eq!(ranked[0].item.policy_no, "P2");
    }

    #[test]
    fn results_cap_at_ten() {
        let policies: Vec<YouthPolicy> = (0..15)
            .map(|i| policy(&format!("P{i:03}"), "11110", "20250101", "20251231"))
            .collect();
        let ranked = recommend_policies(&profile(), &policies, today(), RegionMatchMode::Loose);
        assert_eq!(ranked.len(), MAX_RESULTS);
    }
}
