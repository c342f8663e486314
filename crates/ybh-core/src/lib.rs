//! Core domain model shared by the ingestion pipelines and the
//! recommendation engine: normalized entities, natural keys, and the
//! date/region conventions both sides must agree on.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub mod dates;
pub mod region;

pub const CRATE_NAME: &str = "ybh-core";

/// Listing domain of a normalized product row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductKind {
    Housing,
    Finance,
    Policy,
}

impl ProductKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductKind::Housing => "HOUSING",
            ProductKind::Finance => "FINANCE",
            ProductKind::Policy => "POLICY",
        }
    }
}

/// Common row for any listing. Owned by the ingestion pipeline that created
/// it; domain detail entities reference it by id and never share it.
///
/// For finance the natural key is (kind, name, provider); housing and policy
/// rows are created 1:1 from their owning detail record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Option<i64>,
    pub kind: ProductKind,
    pub name: String,
    pub provider: String,
    pub detail_url: Option<String>,
}

impl Product {
    pub fn new(kind: ProductKind, name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            id: None,
            kind,
            name: name.into(),
            provider: provider.into(),
            detail_url: None,
        }
    }

    pub fn with_detail_url(mut self, url: Option<String>) -> Self {
        self.detail_url = url;
        self
    }
}

/// Registered-user attributes the engines score against. All fields are
/// optional: a partial profile degrades scores, it never fails a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub age: Option<u32>,
    pub region: Option<String>,
    pub income_band: Option<String>,
}

/* ------------------------- finance entities ------------------------- */

/// Finance product subtype as served by the rate catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinanceProductKind {
    Deposit,
    Saving,
    MortgageLoan,
    RentLoan,
    CreditLoan,
}

impl FinanceProductKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinanceProductKind::Deposit => "DEPOSIT",
            FinanceProductKind::Saving => "SAVING",
            FinanceProductKind::MortgageLoan => "MORTGAGE_LOAN",
            FinanceProductKind::RentLoan => "RENT_LOAN",
            FinanceProductKind::CreditLoan => "CREDIT_LOAN",
        }
    }

    pub fn is_loan(&self) -> bool {
        matches!(
            self,
            FinanceProductKind::MortgageLoan
                | FinanceProductKind::RentLoan
                | FinanceProductKind::CreditLoan
        )
    }
}

/// Financial institution, upserted by its external company code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinanceCompany {
    pub id: Option<i64>,
    pub company_code: String,
    pub name: Option<String>,
    pub homepage: Option<String>,
    pub contact: Option<String>,
}

/// Company codes arrive with non-breaking spaces from the provider.
pub fn normalize_company_code(raw: &str) -> String {
    raw.replace('\u{00A0}', " ").trim().to_string()
}

/// Per-company finance product. Natural key: (product, company code).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinanceProduct {
    pub id: Option<i64>,
    pub product_id: i64,
    pub company_code: String,
    pub kind: FinanceProductKind,
    pub join_condition: Option<String>,
    /// Representative ("headline") interest rate for display.
    pub interest_rate: Option<f64>,
    pub min_deposit: Option<i64>,
}

/// Credit-grade rate table carried by credit-loan options (8 grade bands).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreditGradeRates {
    pub grade_1: Option<f64>,
    pub grade_4: Option<f64>,
    pub grade_5: Option<f64>,
    pub grade_6: Option<f64>,
    pub grade_10: Option<f64>,
    pub grade_11: Option<f64>,
    pub grade_12: Option<f64>,
    pub grade_13: Option<f64>,
    pub grade_avg: Option<f64>,
}

/// Rate option attached to a loan product (N:1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinanceLoanOption {
    pub id: Option<i64>,
    pub finance_product_id: i64,
    pub lend_rate_min: Option<f64>,
    pub lend_rate_avg: Option<f64>,
    pub lend_rate_max: Option<f64>,
    pub repay_type_name: Option<String>,
    pub rate_type_name: Option<String>,
    pub collateral_type_name: Option<String>,
    pub credit_rate_type: Option<String>,
    pub credit_rate_type_name: Option<String>,
    pub credit_grades: CreditGradeRates,
}

impl FinanceLoanOption {
    /// Change-detection key: an incoming option with the same triple merges
    /// into the existing row instead of inserting a duplicate.
    pub fn option_key(&self) -> LoanOptionKey {
        LoanOptionKey {
            repay_type_name: self.repay_type_name.clone(),
            rate_type_name: self.rate_type_name.clone(),
            collateral_type_name: self.collateral_type_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoanOptionKey {
    pub repay_type_name: Option<String>,
    pub rate_type_name: Option<String>,
    pub collateral_type_name: Option<String>,
}

/* ------------------------- housing entities ------------------------- */

/// Housing-authority A notice (public-data portal API).
/// Natural key: (title, notice-date string).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LhNotice {
    pub id: Option<i64>,
    pub product_id: i64,
    /// Top-level notice kind, e.g. 임대공고 / 분양공고.
    pub notice_kind: Option<String>,
    /// Detailed kind, e.g. 국민임대, 행복주택.
    pub notice_detail_kind: Option<String>,
    pub title: String,
    pub region_name: Option<String>,
    pub status: Option<String>,
    /// Posting date as published by the provider (`yyyy-MM-dd` or
    /// `yyyy.MM.dd`); part of the natural key, so kept verbatim.
    pub notice_date: String,
    pub close_date: Option<String>,
    pub detail_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecruitStatus {
    Now,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShCategory {
    #[serde(rename = "주택임대")]
    Rent,
    #[serde(rename = "주택분양")]
    Sale,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub url: String,
}

/// Housing-authority B announcement (crawled board).
/// Natural key: (source, external id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShAnnouncement {
    pub id: Option<i64>,
    pub product_id: i64,
    pub source: String,
    pub external_id: String,
    pub title: String,
    pub department: Option<String>,
    pub post_date: Option<NaiveDate>,
    pub views: Option<i32>,
    pub recruit_status: RecruitStatus,
    pub supply_type: Option<String>,
    pub category: ShCategory,
    pub region: Option<String>,
    pub content_html: Option<String>,
    pub attachments: Vec<Attachment>,
    pub detail_url: Option<String>,
    pub crawled_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/* -------------------------- policy entities ------------------------- */

/// Youth-policy catalog entry. Natural key: external policy number.
/// Start/end dates are 8-digit `yyyyMMdd` strings; the literal
/// [`dates::OPEN_ENDED`] end value means the policy never closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YouthPolicy {
    pub id: Option<i64>,
    pub product_id: i64,
    pub policy_no: String,
    pub name: String,
    pub description: Option<String>,
    pub keyword: Option<String>,
    pub category_large: Option<String>,
    pub category_middle: Option<String>,
    pub agency: Option<String>,
    pub apply_url: Option<String>,
    /// 5-digit administrative codes, comma-separated for multi-region
    /// policies; the first 2 digits are the province/metro-city prefix.
    pub region_code: Option<String>,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub support_content: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub created_at: DateTime<Utc>,
}
