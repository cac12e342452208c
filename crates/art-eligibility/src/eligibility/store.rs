use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::domain::{
    full_months_between, ClinicalType, Enrollment, Observation, ObservationMode, Program, Sex,
    SubjectId,
};
use super::sources::{
    AgeLookup, ClinicalDataSource, EnrollmentLookup, LookupError, ObservationLookup,
    ProgramMembership, SexLookup, TreatmentStartDateLookup,
};

/// Demographics and program history for one subject.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectEntry {
    pub birth_date: NaiveDate,
    pub sex: Sex,
    pub enrollments: Vec<Enrollment>,
    pub treatment_start: Option<NaiveDateTime>,
}

impl SubjectEntry {
    pub fn new(birth_date: NaiveDate, sex: Sex) -> Self {
        Self {
            birth_date,
            sex,
            enrollments: Vec::new(),
            treatment_start: None,
        }
    }

    pub fn enrolled(mut self, program: Program, enrolled_on: NaiveDateTime) -> Self {
        self.enrollments.push(Enrollment {
            program,
            enrolled_on,
            completed_on: None,
        });
        self
    }

    pub fn with_treatment_start(mut self, treatment_start: NaiveDateTime) -> Self {
        self.treatment_start = Some(treatment_start);
        self
    }
}

/// Read-only, in-memory implementation of every collaborator lookup.
#[derive(Debug, Clone, Default)]
pub struct ClinicalRecordStore {
    subjects: BTreeMap<SubjectId, SubjectEntry>,
    observations: HashMap<(SubjectId, ClinicalType), Vec<Observation>>,
}

impl ClinicalRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_subject(&mut self, subject: SubjectId, entry: SubjectEntry) {
        self.subjects.insert(subject, entry);
    }

    /// Streams are kept ascending by time; equal timestamps keep insertion order.
    pub fn insert_observation(&mut self, observation: Observation) {
        let stream = self
            .observations
            .entry((observation.subject_id.clone(), observation.kind))
            .or_default();
        let position =
            stream.partition_point(|existing| existing.observed_at <= observation.observed_at);
        stream.insert(position, observation);
    }

    pub fn subject(&self, subject: &SubjectId) -> Option<&SubjectEntry> {
        self.subjects.get(subject)
    }

    pub fn contains(&self, subject: &SubjectId) -> bool {
        self.subjects.contains_key(subject)
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn observation_count(&self) -> usize {
        self.observations.values().map(Vec::len).sum()
    }

    fn entry(&self, subject: &SubjectId) -> Result<&SubjectEntry, LookupError> {
        self.subjects
            .get(subject)
            .ok_or_else(|| LookupError::UnknownSubject(subject.clone()))
    }
}

impl AgeLookup for ClinicalRecordStore {
    fn age_in_months(&self, subject: &SubjectId, as_of: NaiveDateTime) -> Result<u32, LookupError> {
        let entry = self.entry(subject)?;
        Ok(full_months_between(entry.birth_date.and_time(NaiveTime::default()), as_of))
    }
}

impl SexLookup for ClinicalRecordStore {
    fn sex(&self, subject: &SubjectId) -> Result<Sex, LookupError> {
        Ok(self.entry(subject)?.sex)
    }
}

impl EnrollmentLookup for ClinicalRecordStore {
    fn first_enrollment(
        &self,
        subject: &SubjectId,
        program: Program,
    ) -> Result<Option<Enrollment>, LookupError> {
        Ok(self
            .entry(subject)?
            .enrollments
            .iter()
            .filter(|enrollment| enrollment.program == program)
            .min_by_key(|enrollment| enrollment.enrolled_on)
            .copied())
    }
}

impl ProgramMembership for ClinicalRecordStore {
    fn is_enrolled(
        &self,
        subject: &SubjectId,
        program: Program,
        as_of: NaiveDateTime,
    ) -> Result<bool, LookupError> {
        Ok(self
            .entry(subject)?
            .enrollments
            .iter()
            .any(|enrollment| enrollment.program == program && enrollment.is_active_at(as_of)))
    }
}

impl ObservationLookup for ClinicalRecordStore {
    fn observations(
        &self,
        subject: &SubjectId,
        kind: ClinicalType,
        mode: ObservationMode,
        as_of: NaiveDateTime,
    ) -> Result<Vec<Observation>, LookupError> {
        self.entry(subject)?;
        let Some(stream) = self.observations.get(&(subject.clone(), kind)) else {
            return Ok(Vec::new());
        };

        let recorded = stream.partition_point(|observation| observation.observed_at <= as_of);
        let visible = &stream[..recorded];
        Ok(match mode {
            ObservationMode::All => visible.to_vec(),
            ObservationMode::MostRecent => visible.last().cloned().into_iter().collect(),
        })
    }
}

impl TreatmentStartDateLookup for ClinicalRecordStore {
    fn treatment_start(&self, subject: &SubjectId) -> Result<Option<NaiveDateTime>, LookupError> {
        Ok(self.entry(subject)?.treatment_start)
    }
}

impl ClinicalDataSource for ClinicalRecordStore {
    fn subject_ids(&self) -> Vec<SubjectId> {
        self.subjects.keys().cloned().collect()
    }

    fn contains_subject(&self, subject: &SubjectId) -> bool {
        self.contains(subject)
    }
}
