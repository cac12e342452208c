use super::common::*;

use crate::eligibility::domain::EligibilityReason;
use crate::eligibility::evaluation::{AgeBand, DecisionRule, Determination};

#[test]
fn age_bands_split_at_ten_and_fifteen_years() {
    let rules = rules();
    assert_eq!(AgeBand::classify(0, &rules), AgeBand::Child);
    assert_eq!(AgeBand::classify(120, &rules), AgeBand::Child);
    assert_eq!(AgeBand::classify(121, &rules), AgeBand::Adolescent);
    assert_eq!(AgeBand::classify(180, &rules), AgeBand::Adolescent);
    assert_eq!(AgeBand::classify(181, &rules), AgeBand::Adult);
}

#[test]
fn child_is_eligible_from_enrollment() {
    let outcome = engine().evaluate(&enrolled_record(120), HORIZON);
    assert_eq!(outcome.rule, DecisionRule::AgeBand(AgeBand::Child));
    assert_eq!(
        outcome.determination,
        Determination::Criterion {
            reason: EligibilityReason::AgeTenAndBelow,
            date: enrollment(),
        }
    );
}

#[test]
fn adolescent_without_who_stage_or_treatment_is_undetermined() {
    let mut record = enrolled_record(121);
    record.cd4 = vec![cd4(at(2020, 2, 1), 100.0)];
    let outcome = engine().evaluate(&record, HORIZON);
    assert_eq!(outcome.rule, DecisionRule::AgeBand(AgeBand::Adolescent));
    assert_eq!(outcome.determination, Determination::Undetermined);
    assert!(outcome.result().is_none());
}

#[test]
fn adolescent_who_stage_four_on_enrollment_qualifies() {
    let mut record = enrolled_record(150);
    record.who_stage = vec![who_stage(enrollment(), 4)];
    let result = engine()
        .evaluate(&record, HORIZON)
        .result()
        .expect("eligible");
    assert_eq!(result.reason, Some(EligibilityReason::WhoStage));
    assert_eq!(result.date, enrollment());
}

#[test]
fn adolescent_treatment_before_who_stage_wins() {
    let mut record = enrolled_record(150);
    record.who_stage = vec![who_stage(at(2020, 3, 1), 3)];
    record.treatment_start = Some(at(2020, 2, 1));
    assert_eq!(
        engine().evaluate(&record, HORIZON).determination,
        Determination::OnTreatment(at(2020, 2, 1))
    );
}

#[test]
fn adolescent_treatment_on_or_after_who_stage_keeps_the_criterion() {
    for start in [at(2020, 3, 1), at(2020, 4, 1)] {
        let mut record = enrolled_record(150);
        record.who_stage = vec![who_stage(at(2020, 3, 1), 3)];
        record.treatment_start = Some(start);
        assert_eq!(
            engine().evaluate(&record, HORIZON).determination,
            Determination::Criterion {
                reason: EligibilityReason::WhoStage,
                date: at(2020, 3, 1),
            }
        );
    }
}

#[test]
fn adolescent_treatment_without_who_stage_uses_treatment_date() {
    let mut record = enrolled_record(150);
    record.treatment_start = Some(at(2020, 2, 1));
    let result = engine()
        .evaluate(&record, HORIZON)
        .result()
        .expect("eligible");
    assert_eq!(result.reason, None);
    assert_eq!(result.date, at(2020, 2, 1));
}

#[test]
fn treatment_after_the_window_without_clinical_dates_is_undetermined() {
    let mut record = enrolled_record(250);
    record.treatment_start = Some(at(2021, 1, 1));
    assert_eq!(
        engine().evaluate(&record, HORIZON).determination,
        Determination::Undetermined
    );
}

#[test]
fn adult_cd4_in_window_qualifies() {
    let mut record = enrolled_record(200);
    record.cd4 = vec![cd4(at(2020, 3, 1), 480.0)];
    let result = engine()
        .evaluate(&record, HORIZON)
        .result()
        .expect("eligible");
    assert_eq!(result.reason, Some(EligibilityReason::Cd4Count));
    assert_eq!(result.reason_label(), "CD4 count<=500");
    assert_eq!(result.date, at(2020, 3, 1));
}

#[test]
fn adult_treatment_before_every_clinical_date_drops_the_reason() {
    let mut record = enrolled_record(200);
    record.cd4 = vec![cd4(at(2020, 3, 1), 200.0)];
    record.who_stage = vec![who_stage(at(2020, 4, 1), 4)];
    record.treatment_start = Some(at(2019, 12, 1));
    let result = engine()
        .evaluate(&record, HORIZON)
        .result()
        .expect("eligible");
    assert_eq!(result.reason, None);
    assert_eq!(result.date, at(2019, 12, 1));
}

#[test]
fn adult_ignores_who_stage_for_the_criterion() {
    let mut record = enrolled_record(200);
    record.who_stage = vec![who_stage(at(2020, 2, 1), 4)];
    assert_eq!(
        engine().evaluate(&record, HORIZON).determination,
        Determination::Undetermined
    );
}
