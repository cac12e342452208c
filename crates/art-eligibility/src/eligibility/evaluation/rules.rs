use chrono::NaiveDateTime;

use super::super::concepts::{CodedAnswer, ConceptDecoder};
use super::super::context::window_end;
use super::super::domain::{EligibilityReason, Observation, SubjectRecord};
use super::age_band::{select_by_age, AgeBand};
use super::config::EligibilityRules;
use super::window::QualifyingDates;
use super::{DecisionRule, Determination, EvaluationOutcome, Inconsistency};

pub(crate) fn evaluate_record(
    record: &SubjectRecord,
    horizon_months: u32,
    rules: &EligibilityRules,
    decoder: &dyn ConceptDecoder,
) -> EvaluationOutcome {
    let mut inconsistencies = Vec::new();

    let enrolled_on = match record.hiv_enrolled_on {
        Some(enrolled_on) if record.in_hiv_program => enrolled_on,
        _ => {
            return EvaluationOutcome {
                determination: Determination::Undetermined,
                rule: DecisionRule::NotEnrolled,
                inconsistencies,
            }
        }
    };
    let window_end = window_end(enrolled_on, horizon_months);
    let treatment_start = record.treatment_start;

    if let Some(observed_at) = coded_match(
        record.pregnancy.as_ref(),
        &[CodedAnswer::Yes],
        window_end,
        decoder,
    ) {
        return matched(
            DecisionRule::PregnantOrBreastfeeding,
            EligibilityReason::PregnantOrBreastfeeding,
            observed_at,
            treatment_start,
            inconsistencies,
        );
    }

    if let Some(observed_at) = coded_match(
        record.hepatitis.as_ref(),
        &[CodedAnswer::HepatitisB],
        window_end,
        decoder,
    ) {
        return matched(
            DecisionRule::HepatitisCoinfection,
            EligibilityReason::HepatitisCoinfection,
            observed_at,
            treatment_start,
            inconsistencies,
        );
    }

    let tb_positive = record
        .tb_status
        .as_ref()
        .and_then(|observation| decode(observation, decoder))
        .is_some_and(|answer| {
            matches!(
                answer,
                CodedAnswer::DiseaseDiagnosed | CodedAnswer::OnTreatmentForDisease
            )
        });
    if record.in_tb_program || tb_positive {
        match &record.tb_status {
            Some(status) if status.observed_at < window_end => {
                return matched(
                    DecisionRule::TbCoinfection,
                    EligibilityReason::TbCoinfection,
                    status.observed_at,
                    treatment_start,
                    inconsistencies,
                );
            }
            Some(_) => {}
            None => inconsistencies.push(Inconsistency::TbProgramWithoutStatus),
        }
    }

    if let Some(observed_at) = coded_match(
        record.risk_factor.as_ref(),
        &[CodedAnswer::DiscordantCouple],
        window_end,
        decoder,
    ) {
        return matched(
            DecisionRule::DiscordantCouple,
            EligibilityReason::DiscordantCouple,
            observed_at,
            treatment_start,
            inconsistencies,
        );
    }

    let band = AgeBand::classify(record.age_months, rules);
    let dates = QualifyingDates::new(
        &record.cd4,
        &record.who_stage,
        enrolled_on,
        horizon_months,
        rules,
        decoder,
    );

    EvaluationOutcome {
        determination: select_by_age(band, &dates, treatment_start),
        rule: DecisionRule::AgeBand(band),
        inconsistencies,
    }
}

fn decode(observation: &Observation, decoder: &dyn ConceptDecoder) -> Option<CodedAnswer> {
    observation.coded().and_then(|code| decoder.answer(code))
}

/// Timestamp of `observation` when it carries one of `accepted` before the window end.
fn coded_match(
    observation: Option<&Observation>,
    accepted: &[CodedAnswer],
    window_end: NaiveDateTime,
    decoder: &dyn ConceptDecoder,
) -> Option<NaiveDateTime> {
    let observation = observation?;
    let answer = decode(observation, decoder)?;
    (accepted.contains(&answer) && observation.observed_at < window_end)
        .then_some(observation.observed_at)
}

/// A treatment start strictly before the matched observation suppresses the clinical reason.
fn matched(
    rule: DecisionRule,
    reason: EligibilityReason,
    observed_at: NaiveDateTime,
    treatment_start: Option<NaiveDateTime>,
    inconsistencies: Vec<Inconsistency>,
) -> EvaluationOutcome {
    let determination = match treatment_start {
        Some(start) if observed_at > start => Determination::OnTreatment(start),
        _ => Determination::Criterion {
            reason,
            date: observed_at,
        },
    };

    EvaluationOutcome {
        determination,
        rule,
        inconsistencies,
    }
}
