use chrono::NaiveDateTime;
use serde::Serialize;

use super::super::context::window_end;

/// Whether the treatment start date is the first basis for eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "date", rename_all = "snake_case")]
pub enum Precedence {
    TreatmentFirst(NaiveDateTime),
    ClinicalFirst,
    NoTreatmentDate,
}

impl Precedence {
    pub fn treatment_date(self) -> Option<NaiveDateTime> {
        match self {
            Precedence::TreatmentFirst(date) => Some(date),
            Precedence::ClinicalFirst | Precedence::NoTreatmentDate => None,
        }
    }
}

/// Compare the treatment start date against the window-filtered CD4 and WHO dates.
///
/// When both clinical dates exist the start date only has to precede them; the window end
/// is not re-checked in that case.
pub fn resolve_precedence(
    treatment_start: Option<NaiveDateTime>,
    cd4_date: Option<NaiveDateTime>,
    who_date: Option<NaiveDateTime>,
    enrolled_on: NaiveDateTime,
    horizon_months: u32,
) -> Precedence {
    let Some(start) = treatment_start else {
        return Precedence::NoTreatmentDate;
    };
    let upper = window_end(enrolled_on, horizon_months);

    let first = match (cd4_date, who_date) {
        (None, None) => start < upper,
        (None, Some(who)) => start < who && start < upper,
        (Some(cd4), None) => start < cd4 && start < upper,
        (Some(cd4), Some(who)) => start < cd4 && start < who,
    };

    if first {
        Precedence::TreatmentFirst(start)
    } else {
        Precedence::ClinicalFirst
    }
}
