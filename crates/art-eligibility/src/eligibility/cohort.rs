use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use super::context::EvaluationContext;
use super::domain::{
    ClinicalType, EligibilityResult, Observation, ObservationMode, Program, Sex, SubjectId,
    SubjectRecord,
};
use super::evaluation::{DecisionRule, EligibilityEngine, Inconsistency};
use super::sources::{ClinicalDataSource, LookupError};

/// Per-subject note explaining a degraded or skipped determination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectDiagnostic {
    pub subject_id: SubjectId,
    pub kind: DiagnosticKind,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    MissingEnrollment,
    TbProgramWithoutStatus,
    TreatmentStartUnavailable,
    LookupFailed,
}

impl DiagnosticKind {
    /// Kinds that describe expected data shapes rather than faults.
    pub fn is_informational(self) -> bool {
        matches!(self, DiagnosticKind::MissingEnrollment)
    }
}

/// Determination for one subject plus whatever went wrong fetching its inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectOutcome {
    pub result: Option<EligibilityResult>,
    pub rule: Option<DecisionRule>,
    pub diagnostics: Vec<SubjectDiagnostic>,
}

/// Results of one cohort pass keyed by subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortEvaluation {
    pub context: EvaluationContext,
    pub results: BTreeMap<SubjectId, Option<EligibilityResult>>,
    pub diagnostics: Vec<SubjectDiagnostic>,
}

impl CohortEvaluation {
    pub fn result(&self, subject: &SubjectId) -> Option<&EligibilityResult> {
        self.results.get(subject).and_then(Option::as_ref)
    }

    pub fn eligible_count(&self) -> usize {
        self.results.values().filter(|result| result.is_some()).count()
    }

    pub fn diagnostics_for<'a>(
        &'a self,
        subject: &'a SubjectId,
    ) -> impl Iterator<Item = &'a SubjectDiagnostic> + 'a {
        self.diagnostics
            .iter()
            .filter(move |diagnostic| &diagnostic.subject_id == subject)
    }
}

/// Drives the priority rules across a cohort, one independent evaluation per subject.
pub struct CohortEvaluator<S> {
    source: Arc<S>,
    engine: EligibilityEngine,
}

impl<S> CohortEvaluator<S>
where
    S: ClinicalDataSource + 'static,
{
    pub fn new(source: Arc<S>, engine: EligibilityEngine) -> Self {
        Self { source, engine }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn engine(&self) -> &EligibilityEngine {
        &self.engine
    }

    /// Evaluate every subject in `cohort` in parallel. A fault in one subject's inputs only
    /// degrades that subject's result.
    pub fn evaluate(&self, cohort: &[SubjectId], context: &EvaluationContext) -> CohortEvaluation {
        let span = info_span!(
            "cohort_evaluation",
            subjects = cohort.len(),
            horizon_months = ?context.horizon_months(),
            reference_time = %context.reference_time(),
        );
        let _entered = span.enter();

        // Rayon workers do not inherit the caller's span.
        let outcomes: Vec<(SubjectId, SubjectOutcome)> = cohort
            .par_iter()
            .map(|subject| {
                let _worker = span.enter();
                (subject.clone(), self.evaluate_subject(subject, context))
            })
            .collect();

        let mut results = BTreeMap::new();
        let mut diagnostics = Vec::new();
        for (subject, outcome) in outcomes {
            results.insert(subject, outcome.result);
            diagnostics.extend(outcome.diagnostics);
        }

        let evaluation = CohortEvaluation {
            context: *context,
            results,
            diagnostics,
        };
        info!(
            evaluated = evaluation.results.len(),
            eligible = evaluation.eligible_count(),
            diagnostics = evaluation.diagnostics.len(),
            "cohort evaluation complete"
        );
        evaluation
    }

    pub fn evaluate_subject(
        &self,
        subject: &SubjectId,
        context: &EvaluationContext,
    ) -> SubjectOutcome {
        let mut diagnostics = Vec::new();

        let record = match self.load_record(subject, context, &mut diagnostics) {
            Ok(record) => record,
            Err(err) => {
                record_diagnostic(
                    &mut diagnostics,
                    subject,
                    DiagnosticKind::LookupFailed,
                    err.to_string(),
                );
                return SubjectOutcome {
                    result: None,
                    rule: None,
                    diagnostics,
                };
            }
        };

        let outcome = self.engine.evaluate(&record, context.window_months());

        if outcome.rule == DecisionRule::NotEnrolled {
            record_diagnostic(
                &mut diagnostics,
                subject,
                DiagnosticKind::MissingEnrollment,
                "no active HIV program enrollment with a recorded enrollment date".to_string(),
            );
        }
        for inconsistency in &outcome.inconsistencies {
            match inconsistency {
                Inconsistency::TbProgramWithoutStatus => record_diagnostic(
                    &mut diagnostics,
                    subject,
                    DiagnosticKind::TbProgramWithoutStatus,
                    "TB program member without a TB disease status observation; rule skipped"
                        .to_string(),
                ),
            }
        }

        let result = outcome.result();
        debug!(
            subject = %subject,
            rule = ?outcome.rule,
            reason = result.map(|result| result.reason_label()),
            date = ?result.map(|result| result.date),
            "eligibility determined"
        );

        SubjectOutcome {
            result,
            rule: Some(outcome.rule),
            diagnostics,
        }
    }

    /// Fetch the inputs the priority rules read; observation streams are skipped for subjects
    /// outside the HIV program.
    fn load_record(
        &self,
        subject: &SubjectId,
        context: &EvaluationContext,
        diagnostics: &mut Vec<SubjectDiagnostic>,
    ) -> Result<SubjectRecord, LookupError> {
        let source = self.source.as_ref();
        let as_of = context.reference_time();

        // Membership is read at the unshifted now; ages and history at the reference time.
        let in_hiv_program = source.is_enrolled(subject, Program::Hiv, context.now())?;
        let hiv_enrolled_on = source
            .first_enrollment(subject, Program::Hiv)?
            .map(|enrollment| enrollment.enrolled_on);

        if !in_hiv_program || hiv_enrolled_on.is_none() {
            let mut record = SubjectRecord::new(subject.clone(), 0);
            record.in_hiv_program = in_hiv_program;
            record.hiv_enrolled_on = hiv_enrolled_on;
            return Ok(record);
        }

        let mut record = SubjectRecord::new(subject.clone(), source.age_in_months(subject, as_of)?);
        record.in_hiv_program = in_hiv_program;
        record.hiv_enrolled_on = hiv_enrolled_on;
        record.in_tb_program = source.is_enrolled(subject, Program::Tb, context.now())?;

        if source.sex(subject)? == Sex::Female {
            record.pregnancy = self.most_recent(subject, ClinicalType::PregnancyStatus, context)?;
        }
        record.hepatitis = self.most_recent(subject, ClinicalType::ProblemAdded, context)?;
        record.risk_factor = self.most_recent(subject, ClinicalType::HivRiskFactor, context)?;
        record.tb_status = self.most_recent(subject, ClinicalType::TbDiseaseStatus, context)?;
        record.cd4 =
            source.observations(subject, ClinicalType::Cd4Count, ObservationMode::All, as_of)?;
        record.who_stage =
            source.observations(subject, ClinicalType::WhoStage, ObservationMode::All, as_of)?;

        record.treatment_start = match source.treatment_start(subject) {
            Ok(start) => start,
            Err(err) => {
                record_diagnostic(
                    diagnostics,
                    subject,
                    DiagnosticKind::TreatmentStartUnavailable,
                    err.to_string(),
                );
                None
            }
        };

        Ok(record)
    }

    fn most_recent(
        &self,
        subject: &SubjectId,
        kind: ClinicalType,
        context: &EvaluationContext,
    ) -> Result<Option<Observation>, LookupError> {
        let observations = self.source.observations(
            subject,
            kind,
            ObservationMode::MostRecent,
            context.reference_time(),
        )?;
        Ok(observations.into_iter().last())
    }
}

fn record_diagnostic(
    diagnostics: &mut Vec<SubjectDiagnostic>,
    subject: &SubjectId,
    kind: DiagnosticKind,
    detail: String,
) {
    if kind.is_informational() {
        debug!(subject = %subject, ?kind, %detail, "subject skipped");
    } else {
        warn!(subject = %subject, ?kind, %detail, "subject evaluation degraded");
    }
    diagnostics.push(SubjectDiagnostic {
        subject_id: subject.clone(),
        kind,
        detail,
    });
}
