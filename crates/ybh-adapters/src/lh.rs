//! Housing-authority A adapter: the lease-notice API on the public-data
//! portal. The response root is an array of fragments, one of which carries
//! the `dsList` record array.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use ybh_storage::HttpFetcher;

use crate::{encode_query_component, AdapterError, FetchOutcome};

/// Only notices still open for application are ingested.
pub const STATUS_OPEN: &str = "공고중";

#[derive(Debug, Clone, Deserialize)]
pub struct LhNoticeRaw {
    #[serde(rename = "PAN_NM", default)]
    pub title: String,
    #[serde(rename = "PAN_NT_ST_DT", default)]
    pub notice_date: String,
    #[serde(rename = "CNP_CD_NM", default)]
    pub region_name: Option<String>,
    #[serde(rename = "PAN_SS", default)]
    pub status: Option<String>,
    #[serde(rename = "CLSG_DT", default)]
    pub close_date: Option<String>,
    #[serde(rename = "DTL_URL", default)]
    pub detail_url: Option<String>,
    #[serde(rename = "UPP_AIS_TP_NM", default)]
    pub notice_kind: Option<String>,
    #[serde(rename = "AIS_TP_CD_NM", default)]
    pub notice_detail_kind: Option<String>,
}

#[async_trait]
pub trait LhNoticePages: Send + Sync {
    async fn notices(&self, page: u32, page_size: u32) -> FetchOutcome<Vec<LhNoticeRaw>>;
}

#[derive(Debug, Clone)]
pub struct LhClient {
    fetcher: HttpFetcher,
    base_url: String,
    service_key: String,
}

impl LhClient {
    pub fn new(
        fetcher: HttpFetcher,
        base_url: impl Into<String>,
        service_key: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            service_key: service_key.into(),
        }
    }
}

/// Pull the `dsList` records out of the array-shaped response root.
pub fn extract_ds_list(root: &JsonValue) -> Result<Vec<LhNoticeRaw>, AdapterError> {
    let fragments = root
        .as_array()
        .ok_or_else(|| AdapterError::Message("lease-notice response root is not an array".into()))?;
    let Some(ds_list) = fragments.iter().find_map(|f| f.get("dsList")) else {
        return Ok(Vec::new());
    };
    if ds_list.is_null() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_value(ds_list.clone())?)
}

#[async_trait]
impl LhNoticePages for LhClient {
    async fn notices(&self, page: u32, page_size: u32) -> FetchOutcome<Vec<LhNoticeRaw>> {
        let url = format!(
            "{}?ServiceKey={}&PG_SZ={}&PAGE={}&_type=json&PAN_SS={}",
            self.base_url,
            self.service_key,
            page_size,
            page,
            encode_query_component(STATUS_OPEN)
        );
        let root = match self.fetcher.get_json::<JsonValue>(&url).await {
            Ok(root) => root,
            Err(err) => return FetchOutcome::Failed(AdapterError::Fetch(err)),
        };
        match extract_ds_list(&root) {
            Ok(records) if records.is_empty() => FetchOutcome::Empty,
            Ok(records) => FetchOutcome::Page(records),
            Err(err) => FetchOutcome::Failed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ds_list_is_found_in_any_fragment() {
        let root: JsonValue = serde_json::from_str(
            r#"[
                {"resHeader": [{"RS_DTTM": "20251120"}]},
                {"dsList": [{
                    "PAN_NM": "2025년 행복주택 입주자 모집공고",
                    "PAN_NT_ST_DT": "2025-11-20",
                    "CNP_CD_NM": "서울특별시",
                    "PAN_SS": "공고중",
                    "CLSG_DT": "2025-11-30",
                    "DTL_URL": "https://apply.lh.or.kr/1",
                    "UPP_AIS_TP_NM": "임대주택",
                    "AIS_TP_CD_NM": "행복주택"
                }]}
            ]"#,
        )
        .unwrap();
        let records = extract_ds_list(&root).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "2025년 행복주택 입주자 모집공고");
        assert_eq!(records[0].notice_date, "2025-11-20");
        assert_eq!(records[0].region_name.as_deref(), Some("서울특별시"));
    }

    #[test]
    fn missing_or_null_ds_list_means_exhausted() {
        let root: JsonValue =
            serde_json::from_str(r#"[{"resHeader": [{"SS_CODE": "Y"}]}]"#).unwrap();
        assert!(extract_ds_list(&root).unwrap().is_empty());

        let root: JsonValue = serde_json::from_str(r#"[{"dsList": null}]"#).unwrap();
        assert!(extract_ds_list(&root).unwrap().is_empty());
    }

    #[test]
    fn non_array_root_is_a_decode_failure() {
        let root: JsonValue = serde_json::from_str(r#"{"dsList": []}"#).unwrap();
        assert!(extract_ds_list(&root).is_err());
    }
}
