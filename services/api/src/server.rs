use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryBackoffice};
use crate::routes::with_lending_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use lender_desk::config::AppConfig;
use lender_desk::error::AppError;
use lender_desk::telemetry;
use lender_desk::workflows::lending::LendingService;
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

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let backoffice = InMemoryBackoffice::seeded();
    let service = Arc::new(LendingService::new(
        backoffice.gateways(),
        config.workflow.clone(),
    ));

    let app = with_lending_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        submission_stage = %config.workflow.submission_stage,
        "lender desk ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
