use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use scholarship_eligibility::questionnaire::{
    session_router, EligibilitySessionService, SessionRegistry,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Catalog summary served alongside the session API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CatalogSummary {
    pub(crate) version: String,
    pub(crate) scholarships: usize,
    pub(crate) tiers: Vec<TierSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TierSummary {
    pub(crate) tier_id: String,
    pub(crate) tier_name: String,
    pub(crate) questions: usize,
}

pub(crate) fn with_session_routes<R>(service: Arc<EligibilitySessionService<R>>) -> axum::Router
where
    R: SessionRegistry + 'static,
{
    let summary = catalog_summary(&service);

    session_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/eligibility/catalog",
            axum::routing::get(move || {
                let summary = summary.clone();
                async move { Json(summary) }
            }),
        )
}

fn catalog_summary<R>(service: &EligibilitySessionService<R>) -> CatalogSummary
where
    R: SessionRegistry + 'static,
{
    let catalog = service.catalog();
    CatalogSummary {
        version: catalog.metadata().version.clone(),
        scholarships: catalog.scholarships().len(),
        tiers: catalog
            .tiers()
            .iter()
            .map(|tier| TierSummary {
                tier_id: tier.tier_id.clone(),
                tier_name: tier.tier_name.clone(),
                questions: tier.question_count(),
            })
            .collect(),
    }
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Acquire);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
