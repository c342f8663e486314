//! Housing-authority B adapter: the i-SH announcement board crawler.
//!
//! The board has no JSON API; list pages are fetched per supply-type code
//! and parsed out of the HTML table. Each row's `onclick` carries the
//! sequence id that keys the detail page and serves as the external id.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use ybh_core::{Attachment, ShCategory};
use ybh_storage::HttpFetcher;

use crate::{AdapterError, FetchOutcome};

pub const SOURCE_ID: &str = "i-sh";

/// Supply-type codes per board, code → display name.
pub const RENT_SUPPLY_TYPES: [(&str, &str); 7] = [
    ("10", "청년안심주택"),
    ("07", "행복주택"),
    ("12", "사회주택"),
    ("11", "두레주택"),
    ("13", "도시형생활주택"),
    ("05", "장기안심주택"),
    ("04", "매입임대주택"),
];

pub const SALE_SUPPLY_TYPES: [(&str, &str); 5] = [
    ("01", "일반분양"),
    ("02", "신혼희망타운"),
    ("03", "특별공급"),
    ("04", "공공분양"),
    ("05", "토지분양"),
];

pub fn supply_types(category: ShCategory) -> &'static [(&'static str, &'static str)] {
    match category {
        ShCategory::Rent => &RENT_SUPPLY_TYPES,
        ShCategory::Sale => &SALE_SUPPLY_TYPES,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BoardConfig {
    pub list_path: &'static str,
    pub multi_seq: &'static str,
}

pub fn board(category: ShCategory) -> BoardConfig {
    match category {
        ShCategory::Rent => BoardConfig {
            list_path: "/main/lay2/program/S1T297C4476/www/brd/m_247/list.do",
            multi_seq: "2",
        },
        ShCategory::Sale => BoardConfig {
            list_path: "/main/lay2/program/S1T294C296/www/brd/m_244/list.do",
            multi_seq: "1",
        },
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShListingRaw {
    pub title: String,
    pub external_id: String,
    pub department: Option<String>,
    pub post_date: Option<String>,
    pub views: Option<String>,
    pub detail_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct ShDetailRaw {
    pub content_html: Option<String>,
    pub attachments: Vec<Attachment>,
}

#[async_trait]
pub trait ShBoard: Send + Sync {
    async fn listing(
        &self,
        category: ShCategory,
        supply_code: &str,
        page: u32,
    ) -> FetchOutcome<Vec<ShListingRaw>>;

    /// Detail fetch is best-effort; the caller keeps the listing row even
    /// when the detail page cannot be read.
    async fn detail(&self, url: &str) -> FetchOutcome<ShDetailRaw>;
}

#[derive(Debug, Clone)]
pub struct ShClient {
    fetcher: HttpFetcher,
    base_url: String,
}

impl ShClient {
    pub fn new(fetcher: HttpFetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ShBoard for ShClient {
    async fn listing(
        &self,
        category: ShCategory,
        supply_code: &str,
        page: u32,
    ) -> FetchOutcome<Vec<ShListingRaw>> {
        let config = board(category);
        let url = format!("{}{}", self.base_url, config.list_path);
        let page_param = page.to_string();
        let form = [
            ("page", page_param.as_str()),
            ("multi_itm_seq", config.multi_seq),
            ("splyTy", supply_code),
            ("recrnotiState", "now"),
        ];
        let html = match self.fetcher.post_form_text(&url, &form).await {
            Ok(html) => html,
            Err(err) => return FetchOutcome::Failed(AdapterError::Fetch(err)),
        };
        match parse_listing_html(&html, &self.base_url, config) {
            Ok(rows) if rows.is_empty() => FetchOutcome::Empty,
            Ok(rows) => FetchOutcome::Page(rows),
            Err(err) => FetchOutcome::Failed(err),
        }
    }

    async fn detail(&self, url: &str) -> FetchOutcome<ShDetailRaw> {
        match self.fetcher.get_text(url).await {
            Ok(html) => match parse_detail_html(&html, &self.base_url) {
                Ok(detail) => FetchOutcome::Page(detail),
                Err(err) => FetchOutcome::Failed(err),
            },
            Err(err) => FetchOutcome::Failed(AdapterError::Fetch(err)),
        }
    }
}

fn selector(css: &str) -> Result<Selector, AdapterError> {
    Selector::parse(css).map_err(|e| AdapterError::Message(e.to_string()))
}

fn element_text(node: ElementRef<'_>) -> String {
    node.text().collect::<String>().trim().to_string()
}

fn text_or_none(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Sequence id out of `getDetailView('12345')`-style onclick handlers.
pub fn extract_seq(onclick: &str) -> Option<String> {
    let start = onclick.find("getDetailView(")? + "getDetailView(".len();
    let digits: String = onclick[start..]
        .chars()
        .take_while(|c| *c != ')')
        .filter(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

pub fn parse_listing_html(
    html: &str,
    base_url: &str,
    config: BoardConfig,
) -> Result<Vec<ShListingRaw>, AdapterError> {
    let document = Html::parse_document(html);
    let row_sel = selector("#listTb tbody tr")?;
    let link_sel = selector("td.txtL a")?;
    let cell_sel = selector("td")?;
    let num_sel = selector("td.num")?;

    let mut rows = Vec::new();
    for tr in document.select(&row_sel) {
        let Some(link) = tr
            .select(&link_sel)
            .find(|a| a.value().attr("onclick").is_some_and(|v| v.contains("getDetailView")))
        else {
            continue;
        };
        let Some(external_id) = link.value().attr("onclick").and_then(extract_seq) else {
            continue;
        };
        let title = element_text(link);
        if title.is_empty() {
            continue;
        }

        let cells: Vec<ElementRef<'_>> = tr.select(&cell_sel).collect();
        let department = cells.get(2).map(|c| element_text(*c)).and_then(text_or_none);
        let nums: Vec<ElementRef<'_>> = tr.select(&num_sel).collect();
        let post_date = nums.first().map(|c| element_text(*c)).and_then(text_or_none);
        let views = nums.get(1).map(|c| element_text(*c)).and_then(text_or_none);

        let detail_url = format!(
            "{}{}?seq={}&multi_itm_seq={}",
            base_url,
            config.list_path.replace("list.do", "view.do"),
            external_id,
            config.multi_seq
        );

        rows.push(ShListingRaw {
            title,
            external_id,
            department,
            post_date,
            views,
            detail_url,
        });
    }
    Ok(rows)
}

pub fn parse_detail_html(html: &str, base_url: &str) -> Result<ShDetailRaw, AdapterError> {
    let document = Html::parse_document(html);
    let content_sel = selector(".board_view, .viewCont, #contents")?;
    let file_sel = selector(".attach a, .file a, .down a")?;

    let content_html = document
        .select(&content_sel)
        .next()
        .map(|node| node.html());

    let mut attachments = Vec::new();
    for file in document.select(&file_sel) {
        let Some(href) = file.value().attr("href") else {
            continue;
        };
        let name = element_text(file);
        if name.is_empty() {
            continue;
        }
        let url = if href.starts_with("http") {
            href.to_string()
        } else {
            format!("{base_url}{href}")
        };
        attachments.push(Attachment { name, url });
    }

    Ok(ShDetailRaw {
        content_html,
        attachments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST_HTML: &str = r##"
        <table id="listTb"><tbody>
          <tr>
            <td class="num">128</td>
            <td class="txtL"><a href="#" onclick="getDetailView('45821'); return false;">강남 청년안심주택 입주자 모집공고</a></td>
            <td>맞춤주택부</td>
            <td class="num">2025-11-18</td>
            <td class="num">1,204</td>
          </tr>
          <tr>
            <td class="num">127</td>
            <td class="txtL"><a href="#" onclick="getDetailView(45799)">은평 행복주택 추가모집</a></td>
            <td>공급기획부</td>
            <td class="num">2025-11-12</td>
            <td class="num">350</td>
          </tr>
          <tr><td colspan="5">공지</td></tr>
        </tbody></table>
    "##;

    #[test]
    fn listing_rows_parse_title_seq_and_columns() {
        let rows =
            parse_listing_html(LIST_HTML, "https://www.i-sh.co.kr", board(ShCategory::Rent))
                .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title, "강남 청년안심주택 입주자 모집공고");
        assert_eq!(rows[0].external_id, "45821");
        assert_eq!(rows[0].department.as_deref(), Some("맞춤주택부"));
        assert_eq!(rows[0].post_date.as_deref(), Some("2025-11-18"));
        assert_eq!(rows[0].views.as_deref(), Some("1,204"));
        assert!(rows[0].detail_url.contains("view.do?seq=45821&multi_itm_seq=2"));
        assert_eq!(rows[1].external_id, "45799");
    }

    #[test]
    fn rows_without_detail_links_are_skipped() {
        let rows = parse_listing_html(
            "<table id=\"listTb\"><tbody><tr><td>none</td></tr></tbody></table>",
            "https://www.i-sh.co.kr",
            board(ShCategory::Rent),
        )
        .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn detail_page_yields_content_and_absolute_attachment_urls() {
        let html = r#"
            <div class="board_view"><p>모집 개요</p></div>
            <div class="attach">
              <a href="/cmn/file/12.pdf">공고문.pdf</a>
              <a href="https://cdn.i-sh.co.kr/13.hwp">신청서.hwp</a>
            </div>
        "#;
        let detail = parse_detail_html(html, "https://www.i-sh.co.kr").unwrap();
        assert!(detail.content_html.unwrap().contains("모집 개요"));
        assert_eq!(detail.attachments.len(), 2);
        assert_eq!(detail.attachments[0].url, "https://www.i-sh.co.kr/cmn/file/12.pdf");
        assert_eq!(detail.attachments[1].url, "https://cdn.i-sh.co.kr/13.hwp");
    }

    #[test]
    fn seq_extraction_tolerates_quote_styles() {
        assert_eq!(extract_seq("getDetailView('123')"), Some("123".into()));
        assert_eq!(extract_seq("getDetailView(456); return false;"), Some("456".into()));
        assert_eq!(extract_seq("openOther(1)"), None);
    }
}
