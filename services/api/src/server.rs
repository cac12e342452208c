use crate::cli::ServeArgs;
use crate::infra::{load_store, AppState};
use crate::routes::with_eligibility_routes;
use art_eligibility::config::AppConfig;
use art_eligibility::eligibility::{EligibilityEngine, EligibilityService};
use art_eligibility::error::AppError;
use art_eligibility::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
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
    if let Some(subjects) = args.subjects.take() {
        config.evaluation.subjects_csv = Some(subjects);
    }
    if let Some(observations) = args.observations.take() {
        config.evaluation.observations_csv = Some(observations);
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = load_store(
        config.evaluation.subjects_csv.clone(),
        config.evaluation.observations_csv.clone(),
    )?;
    let subjects = store.len();
    let service = Arc::new(EligibilityService::new(
        Arc::new(store),
        EligibilityEngine::standard(),
        config.evaluation.horizon_months,
    ));

    let app = with_eligibility_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        subjects,
        horizon_months = ?config.evaluation.horizon_months,
        "eligibility service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
