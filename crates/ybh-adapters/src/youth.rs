//! Youth-policy catalog adapter. JSON shape: `result.youthPolicyList` plus
//! `result.pagging` metadata; record fields are camelCase abbreviations.

use async_trait::async_trait;
use serde::Deserialize;
use ybh_storage::HttpFetcher;

use crate::{encode_query_component, AdapterError, FetchOutcome};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YouthPolicyRaw {
    #[serde(default)]
    pub plcy_no: String,
    #[serde(default)]
    pub plcy_nm: String,
    #[serde(default)]
    pub plcy_kywd_nm: Option<String>,
    #[serde(default)]
    pub plcy_expln_cn: Option<String>,
    #[serde(default)]
    pub lclsf_nm: Option<String>,
    #[serde(default)]
    pub mclsf_nm: Option<String>,
    #[serde(default)]
    pub sprvsn_inst_cd_nm: Option<String>,
    #[serde(default)]
    pub aply_url_addr: Option<String>,
    #[serde(default)]
    pub zip_cd: Option<String>,
    #[serde(default)]
    pub sprt_trgt_min_age: Option<String>,
    #[serde(default)]
    pub sprt_trgt_max_age: Option<String>,
    #[serde(default)]
    pub plcy_sprt_cn: Option<String>,
    #[serde(default)]
    pub biz_prd_bgng_ymd: Option<String>,
    #[serde(default)]
    pub biz_prd_end_ymd: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    result: Option<EnvelopeResult>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeResult {
    #[serde(rename = "youthPolicyList", default)]
    youth_policy_list: Option<Vec<YouthPolicyRaw>>,
}

#[async_trait]
pub trait PolicyCatalog: Send + Sync {
    async fn policies(&self, page: u32, page_size: u32) -> FetchOutcome<Vec<YouthPolicyRaw>>;
}

#[derive(Debug, Clone)]
pub struct YouthClient {
    fetcher: HttpFetcher,
    base_url: String,
    api_key: String,
    keyword: Option<String>,
    region_code: Option<String>,
}

impl YouthClient {
    pub fn new(
        fetcher: HttpFetcher,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            api_key: api_key.into(),
            keyword: None,
            region_code: None,
        }
    }

    /// Optional source-specific filters forwarded as query parameters.
    pub fn with_filters(mut self, keyword: Option<String>, region_code: Option<String>) -> Self {
        self.keyword = keyword;
        self.region_code = region_code;
        self
    }
}

#[async_trait]
impl PolicyCatalog for YouthClient {
    async fn policies(&self, page: u32, page_size: u32) -> FetchOutcome<Vec<YouthPolicyRaw>> {
        let url = format!(
            "{}?apiKeyNm={}&rtnType=json&pageNum={}&pageSize={}&plcyKywdNm={}&zipCd={}",
            self.base_url,
            self.api_key,
            page,
            page_size,
            encode_query_component(self.keyword.as_deref().unwrap_or("")),
            encode_query_component(self.region_code.as_deref().unwrap_or(""))
        );
        match self.fetcher.get_json::<Envelope>(&url).await {
            Ok(envelope) => {
                let records = envelope
                    .result
                    .and_then(|r| r.youth_policy_list)
                    .unwrap_or_default();
                if records.is_empty() {
                    FetchOutcome::Empty
                } else {
                    FetchOutcome::Page(records)
                }
            }
            Err(err) => FetchOutcome::Failed(AdapterError::Fetch(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY_PAGE: &str = r#"{
        "resultCode": 200,
        "resultMessage": "success",
        "result": {
            "pagging": {"totCount": 2, "pageNum": 1, "pageSize": 100},
            "youthPolicyList": [{
                "plcyNo": "R2025030100001",
                "plcyNm": "청년 월세 한시 특별지원",
                "plcyKywdNm": "소득,주거지원",
                "plcyExplnCn": "무주택 청년의 월세 부담 경감",
                "lclsfNm": "주거",
                "mclsfNm": "주거비지원",
                "sprvsnInstCdNm": "국토교통부",
                "aplyUrlAddr": "https://www.bokjiro.go.kr",
                "zipCd": "11110,11140",
                "sprtTrgtMinAge": "19",
                "sprtTrgtMaxAge": "34",
                "plcySprtCn": "월 최대 20만원 지원",
                "bizPrdBgngYmd": "20250301",
                "bizPrdEndYmd": "20251231"
            }, {
                "plcyNo": "R2025030100002",
                "plcyNm": "상시 운영 정책",
                "bizPrdBgngYmd": "20250101",
                "bizPrdEndYmd": "00000000"
            }]
        }
    }"#;

    #[test]
    fn policy_envelope_parses_camel_case_fields() {
        let envelope: Envelope = serde_json::from_str(POLICY_PAGE).unwrap();
        let records = envelope.result.unwrap().youth_policy_list.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].plcy_no, "R2025030100001");
        assert_eq!(records[0].zip_cd.as_deref(), Some("11110,11140"));
        assert_eq!(records[0].sprt_trgt_min_age.as_deref(), Some("19"));
        assert_eq!(records[1].biz_prd_end_ymd.as_deref(), Some("00000000"));
    }

    #[test]
    fn empty_result_has_no_records() {
        let envelope: Envelope =
            serde_json::from_str(r#"{"resultCode": 200, "result": {"pagging": null}}"#).unwrap();
        assert!(envelope
            .result
            .unwrap()
            .youth_policy_list
            .unwrap_or_default()
            .is_empty());
    }
}
