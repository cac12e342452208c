use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::domain::ConceptCode;

/// Coded answers the priority rules compare observation values against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodedAnswer {
    Yes,
    No,
    HepatitisB,
    DiseaseDiagnosed,
    OnTreatmentForDisease,
    DiscordantCouple,
}

/// Translates concept codes into the values the rules understand.
pub trait ConceptDecoder: Send + Sync {
    fn answer(&self, code: &ConceptCode) -> Option<CodedAnswer>;

    /// Integer WHO stage (1-4) for adult and paediatric stage concepts.
    fn who_stage(&self, code: &ConceptCode) -> Option<u8>;
}

/// Table-backed decoder over a concept dictionary.
#[derive(Debug, Clone, Default)]
pub struct DictionaryDecoder {
    answers: HashMap<String, CodedAnswer>,
    stages: HashMap<String, u8>,
}

impl DictionaryDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Symbolic dictionary used by the CSV exports and the bundled fixtures.
    pub fn standard() -> Self {
        let mut decoder = Self::new()
            .with_answer("YES", CodedAnswer::Yes)
            .with_answer("NO", CodedAnswer::No)
            .with_answer("HEPATITIS_B", CodedAnswer::HepatitisB)
            .with_answer("DISEASE_DIAGNOSED", CodedAnswer::DiseaseDiagnosed)
            .with_answer("ON_TREATMENT_FOR_DISEASE", CodedAnswer::OnTreatmentForDisease)
            .with_answer("DISCORDANT_COUPLE", CodedAnswer::DiscordantCouple);

        for stage in 1..=4u8 {
            decoder = decoder
                .with_stage(&format!("WHO_STAGE_{stage}_ADULT"), stage)
                .with_stage(&format!("WHO_STAGE_{stage}_PEDS"), stage);
        }
        decoder
    }

    pub fn with_answer(mut self, code: &str, answer: CodedAnswer) -> Self {
        self.answers.insert(normalize(code), answer);
        self
    }

    pub fn with_stage(mut self, code: &str, stage: u8) -> Self {
        self.stages.insert(normalize(code), stage);
        self
    }
}

impl ConceptDecoder for DictionaryDecoder {
    fn answer(&self, code: &ConceptCode) -> Option<CodedAnswer> {
        self.answers.get(&normalize(&code.0)).copied()
    }

    fn who_stage(&self, code: &ConceptCode) -> Option<u8> {
        self.stages.get(&normalize(&code.0)).copied()
    }
}

fn normalize(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
