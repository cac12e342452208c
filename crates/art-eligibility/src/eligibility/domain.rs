use std::fmt;

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for subjects in the monitored program.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubjectId(pub String);

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Programs a subject can be enrolled in. HIV care is the primary program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Program {
    Hiv,
    Tb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Female,
    Male,
    #[default]
    Unknown,
}

/// Clinical observation streams consumed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicalType {
    WhoStage,
    Cd4Count,
    PregnancyStatus,
    /// Problem list entries; hepatitis B co-infection is recorded here.
    ProblemAdded,
    HivRiskFactor,
    TbDiseaseStatus,
}

impl ClinicalType {
    pub const ALL: [ClinicalType; 6] = [
        ClinicalType::WhoStage,
        ClinicalType::Cd4Count,
        ClinicalType::PregnancyStatus,
        ClinicalType::ProblemAdded,
        ClinicalType::HivRiskFactor,
        ClinicalType::TbDiseaseStatus,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ClinicalType::WhoStage => "who_stage",
            ClinicalType::Cd4Count => "cd4_count",
            ClinicalType::PregnancyStatus => "pregnancy_status",
            ClinicalType::ProblemAdded => "problem_added",
            ClinicalType::HivRiskFactor => "hiv_risk_factor",
            ClinicalType::TbDiseaseStatus => "tb_disease_status",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.label() == normalized)
    }
}

/// Opaque concept code carried by coded observations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConceptCode(pub String);

impl From<&str> for ConceptCode {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationValue {
    Coded(ConceptCode),
    Numeric(f64),
}

/// A single time-stamped clinical observation for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub subject_id: SubjectId,
    pub kind: ClinicalType,
    pub observed_at: NaiveDateTime,
    pub value: ObservationValue,
}

impl Observation {
    pub fn coded(&self) -> Option<&ConceptCode> {
        match &self.value {
            ObservationValue::Coded(code) => Some(code),
            ObservationValue::Numeric(_) => None,
        }
    }

    pub fn numeric(&self) -> Option<f64> {
        match self.value {
            ObservationValue::Numeric(value) => Some(value),
            ObservationValue::Coded(_) => None,
        }
    }
}

/// Whether an observation lookup returns the full history or only the latest entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationMode {
    All,
    MostRecent,
}

/// First enrollment of a subject in a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub program: Program,
    pub enrolled_on: NaiveDateTime,
    pub completed_on: Option<NaiveDateTime>,
}

impl Enrollment {
    /// Active when enrolled on or before `as_of` and not yet completed at that instant.
    pub fn is_active_at(&self, as_of: NaiveDateTime) -> bool {
        self.enrolled_on <= as_of && self.completed_on.map_or(true, |end| end > as_of)
    }
}

/// Closed set of clinical criteria that can justify eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EligibilityReason {
    #[serde(rename = "Pregnant or breastfeeding")]
    PregnantOrBreastfeeding,
    #[serde(rename = "HPV/HIV coinfection")]
    HepatitisCoinfection,
    #[serde(rename = "TB/HIV co infection")]
    TbCoinfection,
    #[serde(rename = "Discordant couple (HIV-negative partner)")]
    DiscordantCouple,
    #[serde(rename = "Age 10 years and below")]
    AgeTenAndBelow,
    #[serde(rename = "WHO stage = Stage IV")]
    WhoStage,
    #[serde(rename = "CD4 count<=500")]
    Cd4Count,
}

impl EligibilityReason {
    pub const fn label(self) -> &'static str {
        match self {
            EligibilityReason::PregnantOrBreastfeeding => "Pregnant or breastfeeding",
            EligibilityReason::HepatitisCoinfection => "HPV/HIV coinfection",
            EligibilityReason::TbCoinfection => "TB/HIV co infection",
            EligibilityReason::DiscordantCouple => "Discordant couple (HIV-negative partner)",
            EligibilityReason::AgeTenAndBelow => "Age 10 years and below",
            EligibilityReason::WhoStage => "WHO stage = Stage IV",
            EligibilityReason::Cd4Count => "CD4 count<=500",
        }
    }
}

impl fmt::Display for EligibilityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Date and reason a subject first became medically eligible.
///
/// An absent `reason` means the subject was already on treatment before any criterion
/// applied; `date` is then the treatment start date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub reason: Option<EligibilityReason>,
    pub date: NaiveDateTime,
}

impl EligibilityResult {
    pub fn criterion(reason: EligibilityReason, date: NaiveDateTime) -> Self {
        Self {
            reason: Some(reason),
            date,
        }
    }

    pub fn on_treatment(treatment_start: NaiveDateTime) -> Self {
        Self {
            reason: None,
            date: treatment_start,
        }
    }

    pub fn reason_label(&self) -> &'static str {
        self.reason.map_or("", EligibilityReason::label)
    }
}

/// Everything the priority rules read for one subject, fetched once per evaluation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectRecord {
    pub subject_id: SubjectId,
    pub age_months: u32,
    pub in_hiv_program: bool,
    pub hiv_enrolled_on: Option<NaiveDateTime>,
    pub in_tb_program: bool,
    pub pregnancy: Option<Observation>,
    pub hepatitis: Option<Observation>,
    pub risk_factor: Option<Observation>,
    pub tb_status: Option<Observation>,
    pub cd4: Vec<Observation>,
    pub who_stage: Vec<Observation>,
    pub treatment_start: Option<NaiveDateTime>,
}

impl SubjectRecord {
    pub fn new(subject_id: SubjectId, age_months: u32) -> Self {
        Self {
            subject_id,
            age_months,
            in_hiv_program: false,
            hiv_enrolled_on: None,
            in_tb_program: false,
            pregnancy: None,
            hepatitis: None,
            risk_factor: None,
            tb_status: None,
            cd4: Vec::new(),
            who_stage: Vec::new(),
            treatment_start: None,
        }
    }
}

/// Completed months between two instants, zero when `to` precedes `from`.
pub fn full_months_between(from: NaiveDateTime, to: NaiveDateTime) -> u32 {
    if to <= from {
        return 0;
    }
    let mut months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    if (to.day(), to.time()) < (from.day(), from.time()) {
        months -= 1;
    }
    months.max(0) as u32
}
