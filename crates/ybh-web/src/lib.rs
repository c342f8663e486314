//! Axum JSON API: recommendation endpoints, the merged recent-notice feed,
//! and the manual ingest triggers that share orchestrator logic with the
//! cron jobs. Pagination and richer filtering live with the API consumers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::info;
use ybh_core::{FinanceProductKind, UserProfile};
use ybh_recommend::housing::HousingCandidate;
use ybh_recommend::policy::RegionMatchMode;
use ybh_recommend::{finance, housing, policy, recent};
use ybh_storage::Store;
use ybh_sync::{finance as finance_sync, lh as lh_sync, sh as sh_sync, youth as youth_sync};
use ybh_sync::SyncContext;

pub const CRATE_NAME: &str = "ybh-web";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Absent in store-only deployments; ingest triggers answer 503 then.
    pub sync: Option<Arc<SyncContext>>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, sync: Option<Arc<SyncContext>>) -> Self {
        Self { store, sync }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/recommendations/housing", get(housing_handler))
        .route("/recommendations/policies", get(policies_handler))
        .route("/recommendations/finance", get(finance_handler))
        .route("/notices/recent", get(recent_handler))
        .route("/admin/ingest/finlife", post(ingest_finlife_handler))
        .route("/admin/ingest/lh", post(ingest_lh_handler))
        .route("/admin/ingest/sh", post(ingest_sh_handler))
        .route("/admin/ingest/youth", post(ingest_youth_handler))
        .route("/admin/ingest/all", post(ingest_all_handler))
        .with_state(Arc::new(state))
}

pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "web api listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

/* ------------------------------ queries ------------------------------- */

#[derive(Debug, Default, Deserialize)]
struct ProfileQuery {
    age: Option<u32>,
    region: Option<String>,
    income_band: Option<String>,
    strict: Option<bool>,
    kind: Option<String>,
}

impl ProfileQuery {
    fn profile(&self) -> UserProfile {
        UserProfile {
            age: self.age,
            region: self.region.clone(),
            income_band: self.income_band.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct IngestQuery {
    max_pages: Option<u32>,
}

/* ------------------------------ handlers ------------------------------ */

async fn health_handler() -> Response {
    Json(serde_json::json!({"status": "ok"})).into_response()
}

async fn housing_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProfileQuery>,
) -> Response {
    let lh = match state.store.list_lh_notices().await {
        Ok(rows) => rows,
        Err(err) => return server_error(err.into()),
    };
    let sh = match state.store.list_sh_announcements().await {
        Ok(rows) => rows,
        Err(err) => return server_error(err.into()),
    };
    let candidates: Vec<HousingCandidate> = lh
        .iter()
        .map(HousingCandidate::from_lh)
        .chain(sh.iter().map(HousingCandidate::from_sh))
        .collect();
    let ranked = housing::recommend_housing(
        &query.profile(),
        &candidates,
        Utc::now().date_naive(),
    );
    Json(ranked).into_response()
}

async fn policies_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProfileQuery>,
) -> Response {
    let policies = match state.store.list_policies().await {
        Ok(rows) => rows,
        Err(err) => return server_error(err.into()),
    };
    let mode = if query.strict.unwrap_or(false) {
        RegionMatchMode::Strict
    } else {
        RegionMatchMode::Loose
    };
    let ranked = policy::recommend_policies(
        &query.profile(),
        &policies,
        Utc::now().date_naive(),
        mode,
    );
    Json(ranked).into_response()
}

async fn finance_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProfileQuery>,
) -> Response {
    let kind = match query.kind.as_deref() {
        None | Some("deposit") => FinanceProductKind::Deposit,
        Some("saving") => FinanceProductKind::Saving,
        Some(other) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": format!("unsupported kind {other}")})),
            )
                .into_response()
        }
    };
    let products = match state.store.list_finance_products(kind).await {
        Ok(rows) => rows,
        Err(err) => return server_error(err.into()),
    };
    let ranked = finance::recommend_deposit_or_saving(&query.profile(), &products, kind);
    Json(ranked).into_response()
}

async fn recent_handler(State(state): State<Arc<AppState>>) -> Response {
    let now = Utc::now();
    let today = now.date_naive();
    let today_compact = today.format("%Y%m%d").to_string();

    let lh = match state.store.recent_lh_notices(20).await {
        Ok(rows) => rows,
        Err(err) => return server_error(err.into()),
    };
    let sh = match state.store.recent_sh_announcements(20).await {
        Ok(rows) => rows,
        Err(err) => return server_error(err.into()),
    };
    let policies = match state.store.recent_active_policies(&today_compact, 100).await {
        Ok(rows) => rows,
        Err(err) => return server_error(err.into()),
    };
    Json(recent::build_feed(&lh, &sh, &policies, today, now)).into_response()
}

/* --------------------------- ingest triggers -------------------------- */

fn sync_context(state: &AppState) -> Result<Arc<SyncContext>, Response> {
    state.sync.clone().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"error": "ingest is not configured on this instance"})),
        )
            .into_response()
    })
}

async fn ingest_finlife_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IngestQuery>,
) -> Response {
    let ctx = match sync_context(&state) {
        Ok(ctx) => ctx,
        Err(resp) => return resp,
    };
    let catalog = ctx.finance.as_ref();
    let store = ctx.store.as_ref();
    let mut reports = Vec::new();
    for result in [
        finance_sync::sync_companies(
            catalog,
            store,
            query.max_pages.unwrap_or(ctx.config.company_pages),
        )
        .await,
        finance_sync::sync_deposit_and_saving(
            catalog,
            store,
            query.max_pages.unwrap_or(ctx.config.product_pages),
        )
        .await,
        finance_sync::sync_loans(catalog, store, query.max_pages.unwrap_or(ctx.config.loan_pages))
            .await,
    ] {
        match result {
            Ok(report) => reports.push(report),
            Err(err) => return server_error(err),
        }
    }
    Json(reports).into_response()
}

async fn ingest_lh_handler(State(state): State<Arc<AppState>>) -> Response {
    let ctx = match sync_context(&state) {
        Ok(ctx) => ctx,
        Err(resp) => return resp,
    };
    match lh_sync::sync_lh_notices(ctx.lh.as_ref(), ctx.store.as_ref(), ctx.config.lh_page_size)
        .await
    {
        Ok(report) => Json(report).into_response(),
        Err(err) => server_error(err),
    }
}

async fn ingest_sh_handler(State(state): State<Arc<AppState>>) -> Response {
    let ctx = match sync_context(&state) {
        Ok(ctx) => ctx,
        Err(resp) => return resp,
    };
    match sh_sync::sync_sh_announcements(ctx.sh.as_ref(), ctx.store.as_ref()).await {
        Ok(report) => Json(report).into_response(),
        Err(err) => server_error(err),
    }
}

async fn ingest_youth_handler(State(state): State<Arc<AppState>>) -> Response {
    let ctx = match sync_context(&state) {
        Ok(ctx) => ctx,
        Err(resp) => return resp,
    };
    match youth_sync::sync_policies(
        ctx.youth.as_ref(),
        ctx.store.as_ref(),
        ctx.config.policy_page_size,
    )
    .await
    {
        Ok(report) => Json(report).into_response(),
        Err(err) => server_error(err),
    }
}

async fn ingest_all_handler(State(state): State<Arc<AppState>>) -> Response {
    let ctx = match sync_context(&state) {
        Ok(ctx) => ctx,
        Err(resp) => return resp,
    };
    let summary = ctx.run_all().await;
    Json(summary).into_response()
}

fn server_error(err: anyhow::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": err.to_string()})),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use ybh_core::{LhNotice, Product, ProductKind, YouthPolicy};
    use ybh_storage::{HousingStore, MemoryStore, PolicyStore};

    async fn seeded_state() -> AppState {
        let store = Arc::new(MemoryStore::new());
        let today = Utc::now().date_naive();
        let close = today + chrono::Duration::days(5);

        let product = Product::new(ProductKind::Housing, "행복주택 모집", "LH 한국토지주택공사");
        let notice = LhNotice {
            id: None,
            product_id: 0,
            notice_kind: Some("임대주택".to_string()),
            notice_detail_kind: None,
            title: "행복주택 모집".to_string(),
            region_name: Some("서울특별시".to_string()),
            status: Some("공고중".to_string()),
            notice_date: today.format("%Y-%m-%d").to_string(),
            close_date: Some(close.format("%Y-%m-%d").to_string()),
            detail_url: None,
            created_at: Utc::now(),
        };
        store.insert_lh_notice(product, notice).await.unwrap();

        let product = Product::new(ProductKind::Policy, "청년 월세 지원", "온통청년");
        let policy = YouthPolicy {
            id: None,
            product_id: 0,
            policy_no: "P001".to_string(),
            name: "청년 월세 지원".to_string(),
            description: None,
            keyword: Some("소득,지원".to_string()),
            category_large: None,
            category_middle: None,
            agency: None,
            apply_url: None,
            region_code: Some("11110".to_string()),
            min_age: Some(19),
            max_age: Some(34),
            support_content: None,
            start_date: Some("20250101".to_string()),
            end_date: Some("00000000".to_string()),
            created_at: Utc::now(),
        };
        store.insert_policy(product, policy).await.unwrap();

        AppState::new(store, None)
    }

    async fn body_text(resp: Response) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn housing_recommendations_return_ranked_json() {
        let app = app(seeded_state().await);
        let resp = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/recommendations/housing?age=29&region=%EC%84%9C%EC%9A%B8%ED%8A%B9%EB%B3%84%EC%8B%9C")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let text = body_text(resp).await;
        assert!(text.contains("행복주택 모집"));
        assert!(text.contains("score"));
        assert!(text.contains("reason"));
    }

    #[tokio::test]
    async fn policy_recommendations_respect_loose_mode() {
        let app = app(seeded_state().await);
        let resp = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/recommendations/policies?age=29&region=%EC%84%9C%EC%9A%B8%ED%8A%B9%EB%B3%84%EC%8B%9C")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let text = body_text(resp).await;
        assert!(text.contains("청년 월세 지원"));
    }

    #[tokio::test]
    async fn recent_feed_merges_sources() {
        let app = app(seeded_state().await);
        let resp = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/notices/recent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let text = body_text(resp).await;
        assert!(text.contains("housing"));
        assert!(text.contains("policy"));
        assert!(text.contains("행복주택 모집"));
    }

    #[tokio::test]
    async fn finance_kind_validation_rejects_unknown() {
        let app = app(seeded_state().await);
        let resp = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/recommendations/finance?kind=bond")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn ingest_triggers_need_a_sync_context() {
        let app = app(seeded_state().await);
        let resp = app
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/admin/ingest/youth")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
