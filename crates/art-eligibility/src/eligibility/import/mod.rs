mod parser;

pub use parser::parse_datetime;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{info, warn};

use super::domain::{
    ClinicalType, ConceptCode, Enrollment, Observation, ObservationValue, Program, Sex, SubjectId,
};
use super::store::{ClinicalRecordStore, SubjectEntry};
use parser::{parse_rows, ObservationRow, SubjectRow};

#[derive(Debug)]
pub enum CohortImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow {
        file: &'static str,
        row: usize,
        message: String,
    },
}

impl std::fmt::Display for CohortImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CohortImportError::Io(err) => write!(f, "failed to read cohort export: {}", err),
            CohortImportError::Csv(err) => write!(f, "invalid cohort CSV data: {}", err),
            CohortImportError::InvalidRow { file, row, message } => {
                write!(f, "{} row {}: {}", file, row, message)
            }
        }
    }
}

impl std::error::Error for CohortImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CohortImportError::Io(err) => Some(err),
            CohortImportError::Csv(err) => Some(err),
            CohortImportError::InvalidRow { .. } => None,
        }
    }
}

impl From<std::io::Error> for CohortImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for CohortImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

const SUBJECTS: &str = "subjects";
const OBSERVATIONS: &str = "observations";

/// Builds a [`ClinicalRecordStore`] from a subjects export and an observations export.
pub struct CohortImporter;

impl CohortImporter {
    pub fn from_paths<P: AsRef<Path>, Q: AsRef<Path>>(
        subjects: P,
        observations: Q,
    ) -> Result<ClinicalRecordStore, CohortImportError> {
        let subjects = File::open(subjects)?;
        let observations = File::open(observations)?;
        Self::from_readers(subjects, observations)
    }

    pub fn from_readers<R: Read, O: Read>(
        subjects: R,
        observations: O,
    ) -> Result<ClinicalRecordStore, CohortImportError> {
        let mut store = ClinicalRecordStore::new();

        for (row, subject) in parse_rows::<_, SubjectRow>(subjects)? {
            let (id, entry) = subject_entry(row, subject)?;
            store.insert_subject(id, entry);
        }

        let mut orphaned = 0usize;
        for (row, record) in parse_rows::<_, ObservationRow>(observations)? {
            let observation = observation(row, record)?;
            if !store.contains(&observation.subject_id) {
                orphaned += 1;
                continue;
            }
            store.insert_observation(observation);
        }

        if orphaned > 0 {
            warn!(orphaned, "skipped observations for subjects missing from the subjects export");
        }
        info!(
            subjects = store.len(),
            observations = store.observation_count(),
            "cohort export imported"
        );

        Ok(store)
    }
}

fn subject_entry(
    row: usize,
    record: SubjectRow,
) -> Result<(SubjectId, SubjectEntry), CohortImportError> {
    let birth_date = required_datetime(SUBJECTS, row, "birth_date", &record.birth_date)?.date();
    let sex = match record.sex.as_deref() {
        None => Sex::Unknown,
        Some(raw) => parse_sex(raw)
            .ok_or_else(|| invalid(SUBJECTS, row, format!("unknown sex '{raw}'")))?,
    };

    let mut entry = SubjectEntry::new(birth_date, sex);
    for (program, enrolled, completed) in [
        (Program::Hiv, &record.hiv_enrolled_on, &record.hiv_completed_on),
        (Program::Tb, &record.tb_enrolled_on, &record.tb_completed_on),
    ] {
        let Some(enrolled) = enrolled else {
            continue;
        };
        let column = match program {
            Program::Hiv => "hiv_enrolled_on",
            Program::Tb => "tb_enrolled_on",
        };
        entry.enrollments.push(Enrollment {
            program,
            enrolled_on: required_datetime(SUBJECTS, row, column, enrolled)?,
            completed_on: optional_datetime(SUBJECTS, row, completed.as_deref())?,
        });
    }
    entry.treatment_start = optional_datetime(SUBJECTS, row, record.art_start_date.as_deref())?;

    Ok((SubjectId(record.subject_id), entry))
}

fn observation(row: usize, record: ObservationRow) -> Result<Observation, CohortImportError> {
    let kind = ClinicalType::from_label(&record.concept).ok_or_else(|| {
        invalid(OBSERVATIONS, row, format!("unknown concept '{}'", record.concept))
    })?;
    let observed_at = required_datetime(OBSERVATIONS, row, "obs_datetime", &record.obs_datetime)?;

    let value = if kind == ClinicalType::Cd4Count {
        let count = record.value.parse::<f64>().map_err(|_| {
            invalid(OBSERVATIONS, row, format!("CD4 value '{}' is not numeric", record.value))
        })?;
        ObservationValue::Numeric(count)
    } else if record.value.is_empty() {
        return Err(invalid(OBSERVATIONS, row, "missing coded value".to_string()));
    } else {
        ObservationValue::Coded(ConceptCode(record.value))
    };

    Ok(Observation {
        subject_id: SubjectId(record.subject_id),
        kind,
        observed_at,
        value,
    })
}

fn parse_sex(raw: &str) -> Option<Sex> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "f" | "female" => Some(Sex::Female),
        "m" | "male" => Some(Sex::Male),
        "u" | "unknown" => Some(Sex::Unknown),
        _ => None,
    }
}

fn required_datetime(
    file: &'static str,
    row: usize,
    column: &str,
    raw: &str,
) -> Result<chrono::NaiveDateTime, CohortImportError> {
    parse_datetime(raw).ok_or_else(|| invalid(file, row, format!("{column} '{raw}' is not a date")))
}

fn optional_datetime(
    file: &'static str,
    row: usize,
    raw: Option<&str>,
) -> Result<Option<chrono::NaiveDateTime>, CohortImportError> {
    raw.map(|value| {
        parse_datetime(value).ok_or_else(|| invalid(file, row, format!("'{value}' is not a date")))
    })
    .transpose()
}

fn invalid(file: &'static str, row: usize, message: String) -> CohortImportError {
    CohortImportError::InvalidRow { file, row, message }
}
