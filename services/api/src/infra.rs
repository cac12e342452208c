use art_eligibility::eligibility::import::parse_datetime;
use art_eligibility::eligibility::{ClinicalRecordStore, CohortImporter};
use art_eligibility::error::AppError;
use chrono::NaiveDateTime;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn parse_reference_date(raw: &str) -> Result<NaiveDateTime, String> {
    parse_datetime(raw)
        .ok_or_else(|| format!("failed to parse '{raw}' as YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS"))
}

/// Hydrate the record store from a pair of exports; without both an empty store is served.
pub(crate) fn load_store(
    subjects: Option<PathBuf>,
    observations: Option<PathBuf>,
) -> Result<ClinicalRecordStore, AppError> {
    match (subjects, observations) {
        (Some(subjects), Some(observations)) => {
            CohortImporter::from_paths(subjects, observations).map_err(AppError::from)
        }
        (None, None) => Ok(ClinicalRecordStore::new()),
        (subjects, observations) => {
            warn!(
                ?subjects,
                ?observations,
                "both subjects and observations exports are required; serving an empty cohort"
            );
            Ok(ClinicalRecordStore::new())
        }
    }
}
