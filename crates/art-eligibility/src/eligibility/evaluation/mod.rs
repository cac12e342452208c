mod age_band;
mod config;
mod precedence;
mod rules;
mod window;

pub use age_band::AgeBand;
pub use config::EligibilityRules;
pub use precedence::{resolve_precedence, Precedence};
pub use window::{earliest_cd4, earliest_who_stage, select_earliest};

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::concepts::{ConceptDecoder, DictionaryDecoder};
use super::domain::{EligibilityReason, EligibilityResult, SubjectRecord};

/// Stateless evaluator applying the priority rules to one subject at a time.
#[derive(Clone)]
pub struct EligibilityEngine {
    rules: EligibilityRules,
    decoder: Arc<dyn ConceptDecoder>,
}

impl EligibilityEngine {
    pub fn new(rules: EligibilityRules, decoder: Arc<dyn ConceptDecoder>) -> Self {
        Self { rules, decoder }
    }

    /// Guideline thresholds with the symbolic concept dictionary.
    pub fn standard() -> Self {
        Self::new(
            EligibilityRules::default(),
            Arc::new(DictionaryDecoder::standard()),
        )
    }

    pub fn rules(&self) -> &EligibilityRules {
        &self.rules
    }

    pub fn decoder(&self) -> &dyn ConceptDecoder {
        self.decoder.as_ref()
    }

    pub fn evaluate(&self, record: &SubjectRecord, horizon_months: u32) -> EvaluationOutcome {
        rules::evaluate_record(record, horizon_months, &self.rules, self.decoder.as_ref())
    }
}

impl std::fmt::Debug for EligibilityEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EligibilityEngine")
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

/// Tagged outcome of a decision table; every input combination lands on one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Determination {
    Criterion {
        reason: EligibilityReason,
        date: NaiveDateTime,
    },
    /// Treatment started before any criterion was met.
    OnTreatment(NaiveDateTime),
    Undetermined,
}

impl Determination {
    pub fn into_result(self) -> Option<EligibilityResult> {
        match self {
            Determination::Criterion { reason, date } => {
                Some(EligibilityResult::criterion(reason, date))
            }
            Determination::OnTreatment(start) => Some(EligibilityResult::on_treatment(start)),
            Determination::Undetermined => None,
        }
    }
}

/// Rule that produced a determination, kept for audit logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionRule {
    NotEnrolled,
    PregnantOrBreastfeeding,
    HepatitisCoinfection,
    TbCoinfection,
    DiscordantCouple,
    AgeBand(AgeBand),
}

/// Input combinations the rules skipped instead of failing on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Inconsistency {
    /// TB program membership without a TB status observation to date the co-infection.
    TbProgramWithoutStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationOutcome {
    pub determination: Determination,
    pub rule: DecisionRule,
    pub inconsistencies: Vec<Inconsistency>,
}

impl EvaluationOutcome {
    pub fn result(&self) -> Option<EligibilityResult> {
        self.determination.into_result()
    }
}
