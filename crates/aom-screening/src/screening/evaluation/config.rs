use serde::{Deserialize, Serialize};

/// Thresholds the eligibility gate applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningPolicy {
    pub obesity_threshold: f64,
    pub comorbidity_threshold: f64,
    /// Post-operative months that must have *passed* (strictly) before the bariatric route opens.
    pub bariatric_min_months: u32,
}

impl Default for ScreeningPolicy {
    fn default() -> Self {
        Self {
            obesity_threshold: 30.0,
            comorbidity_threshold: 27.0,
            bariatric_min_months: 6,
        }
    }
}
