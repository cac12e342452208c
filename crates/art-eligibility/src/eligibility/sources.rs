use chrono::NaiveDateTime;

use super::domain::{
    ClinicalType, Enrollment, Observation, ObservationMode, Program, Sex, SubjectId,
};

/// Age in full months at `as_of`.
pub trait AgeLookup: Send + Sync {
    fn age_in_months(&self, subject: &SubjectId, as_of: NaiveDateTime) -> Result<u32, LookupError>;
}

pub trait SexLookup: Send + Sync {
    fn sex(&self, subject: &SubjectId) -> Result<Sex, LookupError>;
}

/// First enrollment of a subject in a program, if any.
pub trait EnrollmentLookup: Send + Sync {
    fn first_enrollment(
        &self,
        subject: &SubjectId,
        program: Program,
    ) -> Result<Option<Enrollment>, LookupError>;
}

/// Whether the subject holds an enrollment in `program` active at `as_of`.
pub trait ProgramMembership: Send + Sync {
    fn is_enrolled(
        &self,
        subject: &SubjectId,
        program: Program,
        as_of: NaiveDateTime,
    ) -> Result<bool, LookupError>;
}

/// Observations of one clinical type recorded at or before `as_of`, ascending by time.
/// `MostRecent` yields at most the latest entry.
pub trait ObservationLookup: Send + Sync {
    fn observations(
        &self,
        subject: &SubjectId,
        kind: ClinicalType,
        mode: ObservationMode,
        as_of: NaiveDateTime,
    ) -> Result<Vec<Observation>, LookupError>;
}

/// Treatment start date computed by an upstream calculation.
pub trait TreatmentStartDateLookup: Send + Sync {
    fn treatment_start(&self, subject: &SubjectId) -> Result<Option<NaiveDateTime>, LookupError>;
}

/// Every collaborator the cohort driver reads from.
pub trait ClinicalDataSource:
    AgeLookup
    + SexLookup
    + EnrollmentLookup
    + ProgramMembership
    + ObservationLookup
    + TreatmentStartDateLookup
{
    /// Subjects known to the source, used when a caller does not name a cohort.
    fn subject_ids(&self) -> Vec<SubjectId>;

    fn contains_subject(&self, subject: &SubjectId) -> bool {
        self.subject_ids().contains(subject)
    }
}

/// Error enumeration for collaborator failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("subject {0} not found")]
    UnknownSubject(SubjectId),
    #[error("upstream calculation failed: {0}")]
    Upstream(String),
    #[error("data source unavailable: {0}")]
    Unavailable(String),
}
