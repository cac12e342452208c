use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use serde::Serialize;

use super::cohort::{CohortEvaluation, CohortEvaluator, SubjectDiagnostic, SubjectOutcome};
use super::context::EvaluationContext;
use super::domain::{EligibilityResult, SubjectId};
use super::evaluation::{DecisionRule, EligibilityEngine};
use super::sources::ClinicalDataSource;

/// Parameters for one cohort pass. Missing fields fall back to the service defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationRequest {
    /// Subjects to evaluate; `None` or an empty list evaluates every known subject.
    pub subject_ids: Option<Vec<SubjectId>>,
    pub reference_date: Option<NaiveDateTime>,
    pub horizon_months: Option<u32>,
}

/// Service composing the data source, the rule engine and the configured horizon.
pub struct EligibilityService<S> {
    evaluator: CohortEvaluator<S>,
    default_horizon: Option<u32>,
}

impl<S> EligibilityService<S>
where
    S: ClinicalDataSource + 'static,
{
    pub fn new(source: Arc<S>, engine: EligibilityEngine, default_horizon: Option<u32>) -> Self {
        Self {
            evaluator: CohortEvaluator::new(source, engine),
            default_horizon,
        }
    }

    pub fn default_horizon(&self) -> Option<u32> {
        self.default_horizon
    }

    pub fn evaluator(&self) -> &CohortEvaluator<S> {
        &self.evaluator
    }

    pub fn context(
        &self,
        reference_date: Option<NaiveDateTime>,
        horizon_months: Option<u32>,
    ) -> EvaluationContext {
        EvaluationContext::new(
            reference_date.unwrap_or_else(|| Utc::now().naive_utc()),
            horizon_months.or(self.default_horizon),
        )
    }

    /// Evaluate the requested cohort.
    pub fn evaluate(&self, request: EvaluationRequest) -> CohortEvaluation {
        let context = self.context(request.reference_date, request.horizon_months);
        let cohort = match request.subject_ids {
            Some(subjects) if !subjects.is_empty() => subjects,
            _ => self.evaluator.source().subject_ids(),
        };
        self.evaluator.evaluate(&cohort, &context)
    }

    /// Evaluate one subject as of now with the default horizon.
    pub fn subject(
        &self,
        subject: &SubjectId,
    ) -> Result<SubjectEvaluation, EligibilityServiceError> {
        if !self.evaluator.source().contains_subject(subject) {
            return Err(EligibilityServiceError::UnknownSubject(subject.clone()));
        }

        let context = self.context(None, None);
        let outcome = self.evaluator.evaluate_subject(subject, &context);
        Ok(SubjectEvaluation::new(subject.clone(), &context, outcome))
    }
}

/// Wire view of a single determination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EligibilityView {
    pub subject_id: SubjectId,
    pub eligible: bool,
    pub reason: Option<&'static str>,
    pub date: Option<NaiveDateTime>,
}

impl EligibilityView {
    pub fn new(subject_id: SubjectId, result: Option<&EligibilityResult>) -> Self {
        Self {
            subject_id,
            eligible: result.is_some(),
            reason: result.and_then(|result| result.reason.map(|reason| reason.label())),
            date: result.map(|result| result.date),
        }
    }
}

/// Response body for a cohort pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CohortReport {
    pub reference_time: NaiveDateTime,
    pub horizon_months: Option<u32>,
    pub eligible: usize,
    pub results: Vec<EligibilityView>,
    pub diagnostics: Vec<SubjectDiagnostic>,
}

impl From<&CohortEvaluation> for CohortReport {
    fn from(evaluation: &CohortEvaluation) -> Self {
        Self {
            reference_time: evaluation.context.reference_time(),
            horizon_months: evaluation.context.horizon_months(),
            eligible: evaluation.eligible_count(),
            results: evaluation
                .results
                .iter()
                .map(|(subject, result)| EligibilityView::new(subject.clone(), result.as_ref()))
                .collect(),
            diagnostics: evaluation.diagnostics.clone(),
        }
    }
}

/// Response body for a single-subject lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectEvaluation {
    #[serde(flatten)]
    pub view: EligibilityView,
    pub reference_time: NaiveDateTime,
    pub rule: Option<DecisionRule>,
    pub diagnostics: Vec<SubjectDiagnostic>,
}

impl SubjectEvaluation {
    fn new(subject: SubjectId, context: &EvaluationContext, outcome: SubjectOutcome) -> Self {
        Self {
            view: EligibilityView::new(subject, outcome.result.as_ref()),
            reference_time: context.reference_time(),
            rule: outcome.rule,
            diagnostics: outcome.diagnostics,
        }
    }
}

/// Error raised by the eligibility service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EligibilityServiceError {
    #[error("subject {0} is not known to the data source")]
    UnknownSubject(SubjectId),
}
