use std::sync::Arc;

use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::eligibility::domain::{
    ClinicalType, ConceptCode, Enrollment, Observation, ObservationMode, ObservationValue,
    Program, Sex, SubjectId, SubjectRecord,
};
use crate::eligibility::evaluation::{EligibilityEngine, EligibilityRules};
use crate::eligibility::sources::{
    AgeLookup, ClinicalDataSource, EnrollmentLookup, LookupError, ObservationLookup,
    ProgramMembership, SexLookup, TreatmentStartDateLookup,
};
use crate::eligibility::store::{ClinicalRecordStore, SubjectEntry};
use crate::eligibility::{eligibility_router, EligibilityService};

pub(super) const HORIZON: u32 = 6;

pub(super) fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .expect("valid date")
        .and_hms_opt(0, 0, 0)
        .expect("valid time")
}

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(super) fn engine() -> EligibilityEngine {
    EligibilityEngine::standard()
}

pub(super) fn rules() -> EligibilityRules {
    EligibilityRules::default()
}

pub(super) fn enrollment() -> NaiveDateTime {
    at(2020, 1, 1)
}

pub(super) fn cd4(observed_at: NaiveDateTime, count: f64) -> Observation {
    Observation {
        subject_id: "subject".into(),
        kind: ClinicalType::Cd4Count,
        observed_at,
        value: ObservationValue::Numeric(count),
    }
}

pub(super) fn coded(kind: ClinicalType, observed_at: NaiveDateTime, code: &str) -> Observation {
    Observation {
        subject_id: "subject".into(),
        kind,
        observed_at,
        value: ObservationValue::Coded(ConceptCode::from(code)),
    }
}

pub(super) fn who_stage(observed_at: NaiveDateTime, stage: u8) -> Observation {
    coded(
        ClinicalType::WhoStage,
        observed_at,
        &format!("WHO_STAGE_{stage}_ADULT"),
    )
}

/// Enrolled subject with no observations and no treatment start.
pub(super) fn enrolled_record(age_months: u32) -> SubjectRecord {
    let mut record = SubjectRecord::new("subject".into(), age_months);
    record.in_hiv_program = true;
    record.hiv_enrolled_on = Some(enrollment());
    record
}

pub(super) fn observation_for(subject: &str, mut observation: Observation) -> Observation {
    observation.subject_id = subject.into();
    observation
}

/// Store with one subject per interesting path, all enrolled in HIV care on 2020-01-01.
///
/// - `p-preg`: adult woman, pregnant on 2020-02-01
/// - `p-treated`: same as `p-preg` with treatment started 2020-01-15
/// - `p-cd4`: adult man with a CD4 of 480 on 2020-03-01
/// - `p-child`: eight years old at enrollment
/// - `p-outside`: never enrolled
/// - `p-male-preg`: man with a pregnancy observation and a CD4 of 300 on 2020-04-01
pub(super) fn cohort_store() -> ClinicalRecordStore {
    let mut store = ClinicalRecordStore::new();

    store.insert_subject(
        "p-preg".into(),
        SubjectEntry::new(date(1990, 5, 1), Sex::Female).enrolled(Program::Hiv, enrollment()),
    );
    store.insert_observation(observation_for(
        "p-preg",
        coded(ClinicalType::PregnancyStatus, at(2020, 2, 1), "YES"),
    ));

    store.insert_subject(
        "p-treated".into(),
        SubjectEntry::new(date(1991, 7, 12), Sex::Female)
            .enrolled(Program::Hiv, enrollment())
            .with_treatment_start(at(2020, 1, 15)),
    );
    store.insert_observation(observation_for(
        "p-treated",
        coded(ClinicalType::PregnancyStatus, at(2020, 2, 1), "YES"),
    ));

    store.insert_subject(
        "p-cd4".into(),
        SubjectEntry::new(date(1980, 2, 2), Sex::Male).enrolled(Program::Hiv, enrollment()),
    );
    store.insert_observation(observation_for("p-cd4", cd4(at(2020, 3, 1), 480.0)));

    store.insert_subject(
        "p-child".into(),
        SubjectEntry::new(date(2012, 1, 1), Sex::Female).enrolled(Program::Hiv, enrollment()),
    );

    store.insert_subject(
        "p-outside".into(),
        SubjectEntry::new(date(1975, 9, 30), Sex::Female),
    );
    store.insert_observation(observation_for(
        "p-outside",
        coded(ClinicalType::PregnancyStatus, at(2020, 2, 1), "YES"),
    ));

    store.insert_subject(
        "p-male-preg".into(),
        SubjectEntry::new(date(1985, 3, 3), Sex::Male).enrolled(Program::Hiv, enrollment()),
    );
    store.insert_observation(observation_for(
        "p-male-preg",
        coded(ClinicalType::PregnancyStatus, at(2020, 2, 1), "YES"),
    ));
    store.insert_observation(observation_for("p-male-preg", cd4(at(2020, 4, 1), 300.0)));

    store
}

pub(super) fn build_service(
    store: ClinicalRecordStore,
) -> Arc<EligibilityService<ClinicalRecordStore>> {
    Arc::new(EligibilityService::new(
        Arc::new(store),
        engine(),
        Some(HORIZON),
    ))
}

pub(super) fn router_with_service(
    service: Arc<EligibilityService<ClinicalRecordStore>>,
) -> axum::Router {
    eligibility_router(service)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("body readable");
    serde_json::from_slice(&body).expect("valid json")
}

/// Delegates to a store but fails the treatment-start lookup for one subject.
pub(super) struct FailingTreatmentSource {
    pub(super) inner: ClinicalRecordStore,
    pub(super) failing: SubjectId,
}

impl AgeLookup for FailingTreatmentSource {
    fn age_in_months(&self, subject: &SubjectId, as_of: NaiveDateTime) -> Result<u32, LookupError> {
        self.inner.age_in_months(subject, as_of)
    }
}

impl SexLookup for FailingTreatmentSource {
    fn sex(&self, subject: &SubjectId) -> Result<Sex, LookupError> {
        self.inner.sex(subject)
    }
}

impl EnrollmentLookup for FailingTreatmentSource {
    fn first_enrollment(
        &self,
        subject: &SubjectId,
        program: Program,
    ) -> Result<Option<Enrollment>, LookupError> {
        self.inner.first_enrollment(subject, program)
    }
}

impl ProgramMembership for FailingTreatmentSource {
    fn is_enrolled(
        &self,
        subject: &SubjectId,
        program: Program,
        as_of: NaiveDateTime,
    ) -> Result<bool, LookupError> {
        self.inner.is_enrolled(subject, program, as_of)
    }
}

impl ObservationLookup for FailingTreatmentSource {
    fn observations(
        &self,
        subject: &SubjectId,
        kind: ClinicalType,
        mode: ObservationMode,
        as_of: NaiveDateTime,
    ) -> Result<Vec<Observation>, LookupError> {
        self.inner.observations(subject, kind, mode, as_of)
    }
}

impl TreatmentStartDateLookup for FailingTreatmentSource {
    fn treatment_start(&self, subject: &SubjectId) -> Result<Option<NaiveDateTime>, LookupError> {
        if subject == &self.failing {
            return Err(LookupError::Upstream(
                "treatment start calculation timed out".to_string(),
            ));
        }
        self.inner.treatment_start(subject)
    }
}

impl ClinicalDataSource for FailingTreatmentSource {
    fn subject_ids(&self) -> Vec<SubjectId> {
        self.inner.subject_ids()
    }
}
