use std::cell::OnceCell;

use chrono::NaiveDateTime;

use super::super::concepts::ConceptDecoder;
use super::super::context::ObservationWindow;
use super::super::domain::Observation;
use super::config::EligibilityRules;

/// Timestamp of the first observation, in input order, inside `window` that satisfies
/// `predicate`. Input is expected in ascending time order and is not re-sorted.
pub fn select_earliest<'a, I, P>(
    observations: I,
    window: &ObservationWindow,
    predicate: P,
) -> Option<NaiveDateTime>
where
    I: IntoIterator<Item = &'a Observation>,
    P: Fn(&Observation) -> bool,
{
    observations
        .into_iter()
        .find(|observation| window.contains(observation.observed_at) && predicate(*observation))
        .map(|observation| observation.observed_at)
}

/// First CD4 count at or below the threshold after the day before enrollment.
pub fn earliest_cd4(
    observations: &[Observation],
    enrolled_on: NaiveDateTime,
    horizon_months: u32,
    rules: &EligibilityRules,
) -> Option<NaiveDateTime> {
    let window = ObservationWindow::cd4(enrolled_on, horizon_months);
    select_earliest(observations, &window, |observation| {
        observation
            .numeric()
            .is_some_and(|count| count <= rules.cd4_threshold)
    })
}

/// First WHO stage 3/4 observation on or after enrollment.
pub fn earliest_who_stage(
    observations: &[Observation],
    enrolled_on: NaiveDateTime,
    horizon_months: u32,
    rules: &EligibilityRules,
    decoder: &dyn ConceptDecoder,
) -> Option<NaiveDateTime> {
    let window = ObservationWindow::who_stage(enrolled_on, horizon_months);
    select_earliest(observations, &window, |observation| {
        observation
            .coded()
            .and_then(|code| decoder.who_stage(code))
            .is_some_and(|stage| rules.qualifying_who_stages.contains(&stage))
    })
}

/// Per-subject memo of the window-filtered dates; each is computed at most once.
pub(crate) struct QualifyingDates<'a> {
    cd4_observations: &'a [Observation],
    who_observations: &'a [Observation],
    enrolled_on: NaiveDateTime,
    horizon_months: u32,
    rules: &'a EligibilityRules,
    decoder: &'a dyn ConceptDecoder,
    cd4: OnceCell<Option<NaiveDateTime>>,
    who_stage: OnceCell<Option<NaiveDateTime>>,
}

impl<'a> QualifyingDates<'a> {
    pub(crate) fn new(
        cd4_observations: &'a [Observation],
        who_observations: &'a [Observation],
        enrolled_on: NaiveDateTime,
        horizon_months: u32,
        rules: &'a EligibilityRules,
        decoder: &'a dyn ConceptDecoder,
    ) -> Self {
        Self {
            cd4_observations,
            who_observations,
            enrolled_on,
            horizon_months,
            rules,
            decoder,
            cd4: OnceCell::new(),
            who_stage: OnceCell::new(),
        }
    }

    pub(crate) fn enrolled_on(&self) -> NaiveDateTime {
        self.enrolled_on
    }

    pub(crate) fn horizon_months(&self) -> u32 {
        self.horizon_months
    }

    pub(crate) fn cd4(&self) -> Option<NaiveDateTime> {
        *self.cd4.get_or_init(|| {
            earliest_cd4(
                self.cd4_observations,
                self.enrolled_on,
                self.horizon_months,
                self.rules,
            )
        })
    }

    pub(crate) fn who_stage(&self) -> Option<NaiveDateTime> {
        *self.who_stage.get_or_init(|| {
            earliest_who_stage(
                self.who_observations,
                self.enrolled_on,
                self.horizon_months,
                self.rules,
                self.decoder,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::NaiveDate;

    use super::*;
    use crate::eligibility::concepts::{CodedAnswer, DictionaryDecoder};
    use crate::eligibility::domain::{ClinicalType, ConceptCode, ObservationValue};

    struct CountingDecoder {
        inner: DictionaryDecoder,
        stage_calls: AtomicUsize,
    }

    impl ConceptDecoder for CountingDecoder {
        fn answer(&self, code: &ConceptCode) -> Option<CodedAnswer> {
            self.inner.answer(code)
        }

        fn who_stage(&self, code: &ConceptCode) -> Option<u8> {
            self.stage_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.who_stage(code)
        }
    }

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .expect("valid date")
            .and_hms_opt(0, 0, 0)
            .expect("valid time")
    }

    fn stage(observed_at: NaiveDateTime, code: &str) -> Observation {
        Observation {
            subject_id: "p-1".into(),
            kind: ClinicalType::WhoStage,
            observed_at,
            value: ObservationValue::Coded(code.into()),
        }
    }

    #[test]
    fn qualifying_dates_are_computed_once_per_subject() {
        let decoder = CountingDecoder {
            inner: DictionaryDecoder::standard(),
            stage_calls: AtomicUsize::new(0),
        };
        let rules = EligibilityRules::default();
        let who = vec![
            stage(at(2020, 1, 10), "WHO_STAGE_2_ADULT"),
            stage(at(2020, 2, 10), "WHO_STAGE_4_ADULT"),
        ];
        let dates = QualifyingDates::new(&[], &who, at(2020, 1, 1), 6, &rules, &decoder);

        assert_eq!(dates.who_stage(), Some(at(2020, 2, 10)));
        assert_eq!(dates.who_stage(), Some(at(2020, 2, 10)));
        assert_eq!(decoder.stage_calls.load(Ordering::SeqCst), 2);
        assert_eq!(dates.cd4(), None);
    }
}
