use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemorySessionRegistry};
use crate::routes::with_session_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use scholarship_eligibility::config::AppConfig;
use scholarship_eligibility::error::AppError;
use scholarship_eligibility::questionnaire::{EligibilityCatalog, EligibilitySessionService};
use scholarship_eligibility::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(data) = args.data.take() {
        config.catalog.data_path = data;
    }

    telemetry::init(&config.telemetry)?;

    let catalog = Arc::new(EligibilityCatalog::from_path(&config.catalog.data_path)?);

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let sessions = Arc::new(InMemorySessionRegistry::default());
    let session_service = Arc::new(EligibilitySessionService::new(catalog, sessions));

    let app = with_session_routes(session_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "scholarship eligibility service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
