//! Finance-rate catalog adapter (FSS open API).
//!
//! All endpoints share the `result.baseList` / `result.optionList` envelope;
//! deposit-style and loan-style endpoints differ only in the option schema.
//! Unknown fields are ignored throughout.

use async_trait::async_trait;
use serde::Deserialize;
use ybh_core::FinanceProductKind;
use ybh_storage::HttpFetcher;

use crate::{AdapterError, FetchOutcome};

/// Institution-group codes the sync iterates: banks and savings banks.
pub const INSTITUTION_GROUPS: [&str; 2] = ["020000", "030300"];

#[derive(Debug, Clone, Deserialize)]
pub struct FinlifeCompany {
    #[serde(default)]
    pub fin_co_no: String,
    #[serde(default)]
    pub kor_co_nm: Option<String>,
    #[serde(default)]
    pub homp_url: Option<String>,
    #[serde(default)]
    pub cal_tel: Option<String>,
}

/// Base record shared by every product endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct FinlifeBase {
    #[serde(default)]
    pub fin_prdt_cd: String,
    #[serde(default)]
    pub fin_co_no: String,
    #[serde(default)]
    pub fin_prdt_nm: String,
    #[serde(default)]
    pub kor_co_nm: String,
    #[serde(default)]
    pub join_way: Option<String>,
    #[serde(default)]
    pub join_member: Option<String>,
    #[serde(default)]
    pub etc_note: Option<String>,
    #[serde(default)]
    pub dcls_url: Option<String>,
}

/// Deposit/saving option row: base rate plus an optional bonus rate.
#[derive(Debug, Clone, Deserialize)]
pub struct DepositOption {
    #[serde(default)]
    pub fin_prdt_cd: String,
    #[serde(default)]
    pub fin_co_no: String,
    #[serde(default)]
    pub save_trm: Option<String>,
    #[serde(default)]
    pub intr_rate: Option<f64>,
    #[serde(default)]
    pub intr_rate2: Option<f64>,
}

/// Loan option row; the credit-loan endpoint additionally fills the
/// grade-band fields, the collateral endpoints fill `mrtg_type_nm`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoanOption {
    #[serde(default)]
    pub fin_prdt_cd: String,
    #[serde(default)]
    pub fin_co_no: String,
    #[serde(default)]
    pub lend_rate_min: Option<f64>,
    #[serde(default)]
    pub lend_rate_avg: Option<f64>,
    #[serde(default)]
    pub lend_rate_max: Option<f64>,
    #[serde(default)]
    pub rpay_type_nm: Option<String>,
    #[serde(default)]
    pub lend_rate_type_nm: Option<String>,
    #[serde(default)]
    pub mrtg_type_nm: Option<String>,
    #[serde(default)]
    pub crdt_lend_rate_type: Option<String>,
    #[serde(default)]
    pub crdt_lend_rate_type_nm: Option<String>,
    #[serde(default)]
    pub crdt_grad_1: Option<f64>,
    #[serde(default)]
    pub crdt_grad_4: Option<f64>,
    #[serde(default)]
    pub crdt_grad_5: Option<f64>,
    #[serde(default)]
    pub crdt_grad_6: Option<f64>,
    #[serde(default)]
    pub crdt_grad_10: Option<f64>,
    #[serde(default)]
    pub crdt_grad_11: Option<f64>,
    #[serde(default)]
    pub crdt_grad_12: Option<f64>,
    #[serde(default)]
    pub crdt_grad_13: Option<f64>,
    #[serde(default)]
    pub crdt_grad_avg: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct DepositPage {
    pub bases: Vec<FinlifeBase>,
    pub options: Vec<DepositOption>,
}

#[derive(Debug, Clone)]
pub struct LoanPage {
    pub bases: Vec<FinlifeBase>,
    pub options: Vec<LoanOption>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "B: Deserialize<'de>, O: Deserialize<'de>"))]
struct Envelope<B, O> {
    #[serde(default)]
    result: Option<EnvelopeResult<B, O>>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "B: Deserialize<'de>, O: Deserialize<'de>"))]
struct EnvelopeResult<B, O> {
    #[serde(rename = "baseList", default)]
    base_list: Option<Vec<B>>,
    #[serde(rename = "optionList", default)]
    option_list: Option<Vec<O>>,
}

#[async_trait]
pub trait FinanceCatalog: Send + Sync {
    async fn companies(&self, group: &str, page: u32) -> FetchOutcome<Vec<FinlifeCompany>>;
    async fn deposit_page(
        &self,
        kind: FinanceProductKind,
        group: &str,
        page: u32,
    ) -> FetchOutcome<DepositPage>;
    async fn loan_page(
        &self,
        kind: FinanceProductKind,
        group: &str,
        page: u32,
    ) -> FetchOutcome<LoanPage>;
}

#[derive(Debug, Clone)]
pub struct FinlifeClient {
    fetcher: HttpFetcher,
    base_url: String,
    auth: String,
}

impl FinlifeClient {
    pub fn new(fetcher: HttpFetcher, base_url: impl Into<String>, auth: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            auth: auth.into(),
        }
    }

    fn endpoint(kind: FinanceProductKind) -> &'static str {
        match kind {
            FinanceProductKind::Deposit => "depositProductsSearch",
            FinanceProductKind::Saving => "savingProductsSearch",
            FinanceProductKind::MortgageLoan => "mortgageLoanProductsSearch",
            FinanceProductKind::RentLoan => "rentHouseLoanProductsSearch",
            FinanceProductKind::CreditLoan => "creditLoanProductsSearch",
        }
    }

    fn url(&self, endpoint: &str, group: &str, page: u32) -> String {
        format!(
            "{}/{}.json?auth={}&topFinGrpNo={}&pageNo={}",
            self.base_url, endpoint, self.auth, group, page
        )
    }

    async fn fetch_envelope<B, O>(&self, url: &str) -> FetchOutcome<(Vec<B>, Vec<O>)>
    where
        B: serde::de::DeserializeOwned,
        O: serde::de::DeserializeOwned,
    {
        match self.fetcher.get_json::<Envelope<B, O>>(url).await {
            Ok(envelope) => {
                let Some(result) = envelope.result else {
                    return FetchOutcome::Empty;
                };
                let bases = result.base_list.unwrap_or_default();
                if bases.is_empty() {
                    return FetchOutcome::Empty;
                }
                FetchOutcome::Page((bases, result.option_list.unwrap_or_default()))
            }
            Err(err) => FetchOutcome::Failed(AdapterError::Fetch(err)),
        }
    }
}

#[async_trait]
impl FinanceCatalog for FinlifeClient {
    async fn companies(&self, group: &str, page: u32) -> FetchOutcome<Vec<FinlifeCompany>> {
        let url = self.url("companySearch", group, page);
        self.fetch_envelope::<FinlifeCompany, serde_json::Value>(&url)
            .await
            .map(|(bases, _)| bases)
    }

    async fn deposit_page(
        &self,
        kind: FinanceProductKind,
        group: &str,
        page: u32,
    ) -> FetchOutcome<DepositPage> {
        let url = self.url(Self::endpoint(kind), group, page);
        self.fetch_envelope::<FinlifeBase, DepositOption>(&url)
            .await
            .map(|(bases, options)| DepositPage { bases, options })
    }

    async fn loan_page(
        &self,
        kind: FinanceProductKind,
        group: &str,
        page: u32,
    ) -> FetchOutcome<LoanPage> {
        let url = self.url(Self::endpoint(kind), group, page);
        self.fetch_envelope::<FinlifeBase, LoanOption>(&url)
            .await
            .map(|(bases, options)| LoanPage { bases, options })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPOSIT_PAGE: &str = r#"{
        "result": {
            "prdt_div": "D",
            "baseList": [{
                "fin_prdt_cd": "WR0001B",
                "fin_co_no": "0010001",
                "fin_prdt_nm": "우리 첫거래 정기예금",
                "kor_co_nm": "우리은행",
                "join_way": "영업점,인터넷,스마트폰",
                "join_member": "실명의 개인",
                "etc_note": "우대조건 충족 시",
                "dcls_url": null,
                "unexpected_field": 1
            }],
            "optionList": [
                {"fin_prdt_cd": "WR0001B", "fin_co_no": "0010001", "save_trm": "12", "intr_rate": 3.0, "intr_rate2": 3.55},
                {"fin_prdt_cd": "WR0001B", "fin_co_no": "0010001", "save_trm": "24", "intr_rate": 2.8, "intr_rate2": null}
            ]
        }
    }"#;

    #[test]
    fn deposit_envelope_parses_and_ignores_unknown_fields() {
        let envelope: Envelope<FinlifeBase, DepositOption> =
            serde_json::from_str(DEPOSIT_PAGE).unwrap();
        let result = envelope.result.unwrap();
        let bases = result.base_list.unwrap();
        let options = result.option_list.unwrap();
        assert_eq!(bases.len(), 1);
        assert_eq!(bases[0].fin_prdt_nm, "우리 첫거래 정기예금");
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].intr_rate2, Some(3.55));
        assert_eq!(options[1].intr_rate2, None);
    }

    #[test]
    fn missing_base_list_reads_as_exhausted_shape() {
        let envelope: Envelope<FinlifeBase, DepositOption> =
            serde_json::from_str(r#"{"result": {"baseList": null, "optionList": null}}"#).unwrap();
        let result = envelope.result.unwrap();
        assert!(result.base_list.is_none());
    }

    #[test]
    fn credit_loan_options_carry_grade_bands() {
        let raw = r#"{"fin_prdt_cd": "C1", "fin_co_no": "0010002",
                      "crdt_lend_rate_type_nm": "대출금리",
                      "crdt_grad_1": 5.1, "crdt_grad_13": 13.9, "crdt_grad_avg": 7.2}"#;
        let option: LoanOption = serde_json::from_str(raw).unwrap();
        assert_eq!(option.crdt_grad_1, Some(5.1));
        assert_eq!(option.crdt_grad_13, Some(13.9));
        assert_eq!(option.crdt_grad_avg, Some(7.2));
        assert_eq!(option.mrtg_type_nm, None);
    }
}
