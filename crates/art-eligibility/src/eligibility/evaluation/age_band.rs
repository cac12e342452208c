use chrono::NaiveDateTime;
use serde::Serialize;

use super::super::domain::EligibilityReason;
use super::config::EligibilityRules;
use super::precedence::{resolve_precedence, Precedence};
use super::window::QualifyingDates;
use super::Determination;

/// Age bands driving the fallback criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeBand {
    /// Ten years and below.
    Child,
    /// Over ten, up to fifteen years; judged on WHO stage.
    Adolescent,
    /// Over fifteen years; judged on CD4 count.
    Adult,
}

impl AgeBand {
    pub fn classify(age_months: u32, rules: &EligibilityRules) -> Self {
        if age_months <= rules.child_max_age_months {
            AgeBand::Child
        } else if age_months <= rules.adolescent_max_age_months {
            AgeBand::Adolescent
        } else {
            AgeBand::Adult
        }
    }
}

pub(crate) fn select_by_age(
    band: AgeBand,
    dates: &QualifyingDates<'_>,
    treatment_start: Option<NaiveDateTime>,
) -> Determination {
    if band == AgeBand::Child {
        return Determination::Criterion {
            reason: EligibilityReason::AgeTenAndBelow,
            date: dates.enrolled_on(),
        };
    }

    let precedence = resolve_precedence(
        treatment_start,
        dates.cd4(),
        dates.who_stage(),
        dates.enrolled_on(),
        dates.horizon_months(),
    );

    match band {
        AgeBand::Adolescent => decide(precedence, dates.who_stage(), EligibilityReason::WhoStage),
        _ => decide(precedence, dates.cd4(), EligibilityReason::Cd4Count),
    }
}

/// Decision table shared by the adolescent and adult bands.
pub(crate) fn decide(
    precedence: Precedence,
    clinical_date: Option<NaiveDateTime>,
    reason: EligibilityReason,
) -> Determination {
    match (precedence.treatment_date(), clinical_date) {
        (Some(start), Some(date)) if start < date => Determination::OnTreatment(start),
        (_, Some(date)) => Determination::Criterion { reason, date },
        (Some(start), None) => Determination::OnTreatment(start),
        (None, None) => Determination::Undetermined,
    }
}
