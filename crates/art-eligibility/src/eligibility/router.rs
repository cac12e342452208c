use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::SubjectId;
use super::import::parse_datetime;
use super::service::{
    CohortReport, EligibilityService, EligibilityServiceError, EvaluationRequest,
};
use super::sources::ClinicalDataSource;

/// JSON body accepted by the cohort evaluation endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EvaluateBody {
    pub subject_ids: Option<Vec<String>>,
    pub reference_date: Option<String>,
    pub horizon_months: Option<u32>,
}

/// Router builder exposing cohort and single-subject eligibility endpoints.
pub fn eligibility_router<S>(service: Arc<EligibilityService<S>>) -> Router
where
    S: ClinicalDataSource + 'static,
{
    Router::new()
        .route("/api/v1/eligibility/evaluate", post(evaluate_handler::<S>))
        .route(
            "/api/v1/eligibility/subjects/:subject_id",
            get(subject_handler::<S>),
        )
        .with_state(service)
}

pub(crate) async fn evaluate_handler<S>(
    State(service): State<Arc<EligibilityService<S>>>,
    axum::Json(body): axum::Json<EvaluateBody>,
) -> Response
where
    S: ClinicalDataSource + 'static,
{
    let reference_date = match body.reference_date.as_deref() {
        None => None,
        Some(raw) => match parse_datetime(raw) {
            Some(parsed) => Some(parsed),
            None => {
                let payload = json!({
                    "error": format!("reference_date '{raw}' is not a date"),
                });
                return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
            }
        },
    };

    let request = EvaluationRequest {
        subject_ids: body
            .subject_ids
            .map(|ids| ids.into_iter().map(SubjectId).collect()),
        reference_date,
        horizon_months: body.horizon_months,
    };

    // The rayon pass is CPU-bound; keep it off the async workers.
    match tokio::task::spawn_blocking(move || service.evaluate(request)).await {
        Ok(evaluation) => {
            (StatusCode::OK, axum::Json(CohortReport::from(&evaluation))).into_response()
        }
        Err(err) => {
            error!(error = %err, "cohort evaluation task failed");
            let payload = json!({ "error": "cohort evaluation failed" });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn subject_handler<S>(
    State(service): State<Arc<EligibilityService<S>>>,
    Path(subject_id): Path<String>,
) -> Response
where
    S: ClinicalDataSource + 'static,
{
    let id = SubjectId(subject_id);
    match service.subject(&id) {
        Ok(evaluation) => (StatusCode::OK, axum::Json(evaluation)).into_response(),
        Err(EligibilityServiceError::UnknownSubject(_)) => {
            let payload = json!({
                "subject_id": id.0,
                "error": "subject not found",
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
    }
}
