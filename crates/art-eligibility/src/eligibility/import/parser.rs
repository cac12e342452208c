use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use std::io::Read;

use super::CohortImportError;

#[derive(Debug, Deserialize)]
pub(crate) struct SubjectRow {
    pub(crate) subject_id: String,
    pub(crate) birth_date: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) sex: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) hiv_enrolled_on: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) hiv_completed_on: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) tb_enrolled_on: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) tb_completed_on: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) art_start_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ObservationRow {
    pub(crate) subject_id: String,
    pub(crate) concept: String,
    pub(crate) obs_datetime: String,
    pub(crate) value: String,
}

/// Deserialize every row, pairing it with its 1-based data row number.
pub(crate) fn parse_rows<R, T>(reader: R) -> Result<Vec<(usize, T)>, CohortImportError>
where
    R: Read,
    T: for<'de> Deserialize<'de>,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();

    for (index, record) in csv_reader.deserialize::<T>().enumerate() {
        rows.push((index + 1, record?));
    }

    Ok(rows)
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD HH:MM:SS` and plain dates (midnight).
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    None
}
