use serde::{Deserialize, Serialize};

/// Clinical thresholds applied by the age-banded criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityRules {
    /// Subjects at or below this age are eligible from enrollment.
    pub child_max_age_months: u32,
    /// Upper bound of the band judged on WHO stage; older subjects are judged on CD4.
    pub adolescent_max_age_months: u32,
    pub cd4_threshold: f64,
    pub qualifying_who_stages: Vec<u8>,
}

impl Default for EligibilityRules {
    fn default() -> Self {
        Self {
            child_max_age_months: 120,
            adolescent_max_age_months: 180,
            cd4_threshold: 500.0,
            qualifying_who_stages: vec![3, 4],
        }
    }
}
