//! Deposit/saving product ranking: multiplicative score over the headline
//! rate, minimum deposit, and the user's age and income band. Lower score =
//! higher rank; products without a headline rate are excluded.

use serde::Serialize;
use ybh_core::{FinanceProduct, FinanceProductKind, Product, UserProfile};

use crate::{Scored, MAX_RESULTS};

#[derive(Debug, Clone, Serialize)]
pub struct FinanceProjection {
    pub name: String,
    pub provider: String,
    pub kind: FinanceProductKind,
    pub interest_rate: f64,
    pub min_deposit: Option<i64>,
    pub join_condition: Option<String>,
    pub detail_url: Option<String>,
}

fn age_factor(age: Option<u32>) -> f64 {
    match age {
        Some(age) if age <= 34 => 0.8,
        Some(age) if age <= 50 => 1.0,
        Some(_) => 1.2,
        None => 1.0,
    }
}

fn income_factor(income_band: Option<&str>) -> f64 {
    let Some(band) = income_band else {
        return 1.0;
    };
    match band.replace(' ', "").as_str() {
        "중위소득100%이하" => 0.7,
        "중위소득150%이하" => 0.85,
        "중위소득200%이하" => 1.0,
        "중위소득300%이하" => 1.1,
        _ => 1.0,
    }
}

fn deposit_factor(min_deposit: Option<i64>) -> f64 {
    match min_deposit {
        Some(won) if won > 0 => ((won as f64 / 100_000.0) + 1.0).ln().max(f64::MIN_POSITIVE),
        _ => 1.0,
    }
}

fn build_reason(profile: &UserProfile, projection: &FinanceProjection) -> String {
    let mut parts = Vec::new();
    parts.push(format!("금리 {}%", projection.interest_rate));
    if let Some(won) = projection.min_deposit {
        parts.push(format!("최소 예치금 {won}원"));
    }
    match profile.age {
        Some(age) if age <= 34 => parts.push("청년층 우대 가능".to_string()),
        Some(age) if age >= 50 => parts.push("안정형 투자에 적합".to_string()),
        _ => {}
    }
    match profile
        .income_band
        .as_deref()
        .map(|b| b.replace(' ', ""))
        .as_deref()
    {
        Some("중위소득100%이하") => parts.push("저소득층 혜택 상품".to_string()),
        Some("중위소득150%이하") => parts.push("중저소득층 추천 상품".to_string()),
        Some("중위소득200%이하") => parts.push("일반 소득층 상품".to_string()),
        Some("중위소득300%이하") => parts.push("고소득층 고금리 상품".to_string()),
        _ => {}
    }
    parts.push(
        match projection.kind {
            FinanceProductKind::Saving => "적금 상품",
            _ => "예금 상품",
        }
        .to_string(),
    );
    parts.join(", ")
}

pub fn recommend_deposit_or_saving(
    profile: &UserProfile,
    products: &[(FinanceProduct, Product)],
    kind: FinanceProductKind,
) -> Vec<Scored<FinanceProjection>> {
    let mut scored: Vec<Scored<FinanceProjection>> = products
        .iter()
        .filter(|(fp, _)| fp.kind == kind)
        .filter_map(|(fp, product)| {
            let rate = fp.interest_rate.filter(|r| *r > 0.0)?;
            let projection = FinanceProjection {
                name: product.name.clone(),
                provider: product.provider.clone(),
                kind: fp.kind,
                interest_rate: rate,
                min_deposit: fp.min_deposit,
                join_condition: fp.join_condition.clone(),
                detail_url: product.detail_url.clone(),
            };
            // Higher rate → smaller inverse factor → better rank.
            let score = (10.0 / rate)
                * deposit_factor(fp.min_deposit)
                * age_factor(profile.age)
                * income_factor(profile.income_band.as_deref());
            let reason = build_reason(profile, &projection);
            Some(Scored {
                item: projection,
                score,
                reason,
            })
        })
        .collect();

    scored.sort_by(|a, b| {
        a.score
            .partial_cmp(&b.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(MAX_RESULTS);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use ybh_core::ProductKind;

    fn entry(name: &str, rate: Option<f64>, min_deposit: Option<i64>) -> (FinanceProduct, Product) {
        (
            FinanceProduct {
                id: Some(1),
                product_id: 1,
                company_code: "0010001".to_string(),
                kind: FinanceProductKind::Deposit,
                join_condition: None,
                interest_rate: rate,
                min_deposit,
            },
            Product {
                id: Some(1),
                kind: ProductKind::Finance,
                name: name.to_string(),
                provider: "우리은행".to_string(),
                detail_url: None,
            },
        )
    }

    fn profile() -> UserProfile {
        UserProfile {
            age: Some(29),
            region: Some("서울특별시".to_string()),
            income_band: Some("중위소득 100% 이하".to_string()),
        }
    }

    #[test]
    fn higher_rate_ranks_first_and_rateless_products_drop() {
        let products = vec![
            entry("저금리 예금", Some(2.0), None),
            entry("고금리 예금", Some(4.2), None),
            entry("금리 미공시", None, None),
        ];
        let ranked = recommend_deposit_or_saving(&profile(), &products, FinanceProductKind::Deposit);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].item.name, "고금리 예금");
        assert!(ranked[0].reason.contains("금리 4.2%"));
        assert!(ranked[0].reason.contains("청년층 우대 가능"));
        assert!(ranked[0].reason.contains("저소득층 혜택 상품"));
    }

    #[test]
    fn large_minimum_deposit_worsens_the_score() {
        let products = vec![
            entry("소액 예금", Some(3.0), Some(100_000)),
            entry("거액 예금", Some(3.0), Some(50_000_000)),
        ];
        let ranked = recommend_deposit_or_saving(&profile(), &products, FinanceProductKind::Deposit);
        assert_eq!(ranked[0].item.name, "소액 예금");
    }

    #[test]
    fn kind_filter_separates_deposit_from_saving() {
        let mut saving = entry("적금", Some(3.0), None);
        saving.0.kind = FinanceProductKind::Saving;
        let products = vec![entry("예금", Some(3.0), None), saving];
        let ranked = recommend_deposit_or_saving(&profile(), &products, FinanceProductKind::Saving);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].item.name, "적금");
        assert!(ranked[0].reason.ends_with("적금 상품"));
    }
}
