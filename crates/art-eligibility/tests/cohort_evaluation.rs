use std::sync::Arc;

use art_eligibility::eligibility::{
    CohortImporter, DiagnosticKind, EligibilityEngine, EligibilityReason, EligibilityService,
    EvaluationRequest, SubjectId,
};
use chrono::{NaiveDate, NaiveDateTime};

fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .expect("valid date")
        .and_hms_opt(0, 0, 0)
        .expect("valid time")
}

fn fixture_service() -> EligibilityService<art_eligibility::eligibility::ClinicalRecordStore> {
    let store = CohortImporter::from_readers(
        &include_bytes!("../fixtures/subjects.csv")[..],
        &include_bytes!("../fixtures/observations.csv")[..],
    )
    .expect("fixtures import");
    EligibilityService::new(Arc::new(store), EligibilityEngine::standard(), Some(6))
}

fn request() -> EvaluationRequest {
    EvaluationRequest {
        subject_ids: None,
        reference_date: Some(at(2020, 6, 1)),
        horizon_months: None,
    }
}

#[test]
fn fixture_cohort_covers_every_criterion() {
    let service = fixture_service();
    let evaluation = service.evaluate(request());

    let expected = [
        ("p-001", Some(EligibilityReason::PregnantOrBreastfeeding), at(2020, 2, 1)),
        ("p-002", None, at(2020, 1, 15)),
        (
            "p-003",
            Some(EligibilityReason::Cd4Count),
            at(2020, 3, 10) + chrono::Duration::minutes(570),
        ),
        ("p-005", Some(EligibilityReason::WhoStage), at(2020, 4, 20)),
        ("p-006", Some(EligibilityReason::TbCoinfection), at(2020, 1, 25)),
        ("p-007", Some(EligibilityReason::HepatitisCoinfection), at(2020, 3, 3)),
        ("p-008", Some(EligibilityReason::DiscordantCouple), at(2020, 2, 14)),
        ("p-009", Some(EligibilityReason::AgeTenAndBelow), at(2020, 1, 1)),
    ];

    for (subject, reason, date) in expected {
        let result = evaluation
            .result(&SubjectId::from(subject))
            .unwrap_or_else(|| panic!("{subject} should be eligible"));
        assert_eq!(result.reason, reason, "reason for {subject}");
        assert_eq!(result.date, date, "date for {subject}");
    }

    assert!(evaluation.result(&"p-004".into()).is_none());
    assert!(evaluation.result(&"p-010".into()).is_none());
    assert_eq!(evaluation.results.len(), 10);
    assert_eq!(evaluation.eligible_count(), 8);
}

#[test]
fn subject_outside_the_program_only_produces_an_informational_diagnostic() {
    let service = fixture_service();
    let evaluation = service.evaluate(EvaluationRequest {
        subject_ids: Some(vec!["p-004".into()]),
        ..request()
    });

    let diagnostics: Vec<_> = evaluation.diagnostics.iter().collect();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::MissingEnrollment);
    assert!(diagnostics[0].kind.is_informational());
}

#[test]
fn zero_month_horizon_narrows_the_window_to_enrollment_day() {
    let service = fixture_service();
    let evaluation = service.evaluate(EvaluationRequest {
        subject_ids: Some(vec!["p-001".into(), "p-005".into()]),
        horizon_months: Some(0),
        ..request()
    });

    assert!(evaluation.result(&"p-001".into()).is_none());
    assert!(evaluation.result(&"p-005".into()).is_none());
    assert_eq!(evaluation.context.reference_time(), at(2020, 6, 1));
}

#[test]
fn later_reference_date_does_not_move_first_eligibility() {
    let service = fixture_service();
    let june = service.evaluate(request());
    let next_year = service.evaluate(EvaluationRequest {
        reference_date: Some(at(2021, 6, 1)),
        ..request()
    });

    assert_eq!(
        june.result(&"p-001".into()),
        next_year.result(&"p-001".into())
    );
    assert!(next_year.result(&"p-010".into()).is_none());
}
