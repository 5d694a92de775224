use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemorySessionRepository, OutboxDispatcher};
use crate::routes::with_survey_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use mupai_survey::config::AppConfig;
use mupai_survey::error::AppError;
use mupai_survey::telemetry;
use mupai_survey::workflows::survey::SurveyService;
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

    let survey_service = Arc::new(SurveyService::new(
        Arc::new(InMemorySessionRepository::new(config.sessions.clone())),
        Arc::new(OutboxDispatcher::default()),
        &config.mail,
    ));

    let app = with_survey_routes(survey_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        mail_timeout_secs = config.mail.send_timeout.as_secs(),
        session_capacity = config.sessions.capacity,
        session_idle_secs = config.sessions.idle_ttl.as_secs(),
        "dietary survey service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
