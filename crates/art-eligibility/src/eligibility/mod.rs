//! Temporal ART eligibility rules.
//!
//! A subject enrolled in HIV care is checked against a fixed priority list of clinical
//! criteria (pregnancy, hepatitis B, TB, discordant partner) before falling back to an
//! age-banded criterion judged on WHO stage or CD4 count inside an observation window
//! anchored on the enrollment date. Each determination is weighed against the date the
//! subject actually started treatment.

pub mod cohort;
pub mod concepts;
pub mod context;
pub mod domain;
pub mod evaluation;
pub mod import;
pub mod router;
pub mod service;
pub mod sources;
pub mod store;

#[cfg(test)]
mod tests;

pub use cohort::{
    CohortEvaluation, CohortEvaluator, DiagnosticKind, SubjectDiagnostic, SubjectOutcome,
};
pub use concepts::{CodedAnswer, ConceptDecoder, DictionaryDecoder};
pub use context::{window_end, EvaluationContext, ObservationWindow};
pub use domain::{
    ClinicalType, ConceptCode, EligibilityReason, EligibilityResult, Enrollment, Observation,
    ObservationMode, ObservationValue, Program, Sex, SubjectId, SubjectRecord,
};
pub use evaluation::{
    AgeBand, DecisionRule, Determination, EligibilityEngine, EligibilityRules, EvaluationOutcome,
    Inconsistency, Precedence,
};
pub use import::{CohortImportError, CohortImporter};
pub use router::eligibility_router;
pub use service::{
    CohortReport, EligibilityService, EligibilityServiceError, EligibilityView, EvaluationRequest,
    SubjectEvaluation,
};
pub use sources::{
    AgeLookup, ClinicalDataSource, EnrollmentLookup, LookupError, ObservationLookup,
    ProgramMembership, SexLookup, TreatmentStartDateLookup,
};
pub use store::{ClinicalRecordStore, SubjectEntry};
