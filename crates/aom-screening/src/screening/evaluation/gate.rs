use serde::{Deserialize, Serialize};

use super::super::bmi::BmiReading;
use super::super::domain::{join_labels, BariatricSurgeryStatus, ClinicalProfile};
use super::config::ScreeningPolicy;

/// Which rule admitted the patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionRoute {
    Obesity,
    WeightRelatedComorbidity,
    BariatricPlateau,
}

/// Why the gate turned the patient away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    BelowComorbidityThreshold,
    NoQualifyingComorbidity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateDecision {
    Eligible(AdmissionRoute),
    NotEligible(RejectionReason),
}

impl GateDecision {
    pub fn is_eligible(&self) -> bool {
        matches!(self, GateDecision::Eligible(_))
    }

    pub(crate) fn message(
        &self,
        profile: &ClinicalProfile,
        bmi: &BmiReading,
        policy: &ScreeningPolicy,
    ) -> String {
        let value = bmi.value();
        match self {
            GateDecision::Eligible(AdmissionRoute::Obesity) => format!(
                "Eligible: BMI {value:.2} meets the obesity threshold of {:.1}",
                policy.obesity_threshold
            ),
            GateDecision::Eligible(AdmissionRoute::WeightRelatedComorbidity) => format!(
                "Eligible: BMI {value:.2} with weight-related comorbidity ({})",
                join_labels(profile.qualifying_comorbidities())
            ),
            GateDecision::Eligible(AdmissionRoute::BariatricPlateau) => {
                let months = profile
                    .bariatric_follow_up
                    .map(|follow_up| follow_up.months_since_surgery)
                    .unwrap_or_default();
                format!(
                    "Eligible via bariatric pathway: documented weight plateau {months} months after surgery"
                )
            }
            GateDecision::NotEligible(RejectionReason::NoQualifyingComorbidity) => format!(
                "Not eligible: BMI {value:.2} is between {:.1} and {:.1} but no weight-related comorbidity was reported",
                policy.comorbidity_threshold, policy.obesity_threshold
            ),
            GateDecision::NotEligible(RejectionReason::BelowComorbidityThreshold) => format!(
                "Not eligible: BMI {value:.2} is below {:.1} (or {:.1} with a weight-related comorbidity)",
                policy.obesity_threshold, policy.comorbidity_threshold
            ),
        }
    }
}

/// First matching rule wins: obesity, then comorbidity bracket, then the bariatric route.
pub(crate) fn decide(
    profile: &ClinicalProfile,
    bmi: &BmiReading,
    policy: &ScreeningPolicy,
) -> GateDecision {
    let value = bmi.value();

    if value >= policy.obesity_threshold {
        return GateDecision::Eligible(AdmissionRoute::Obesity);
    }

    let in_comorbidity_bracket = value >= policy.comorbidity_threshold;
    if in_comorbidity_bracket && !profile.qualifying_comorbidities().is_empty() {
        return GateDecision::Eligible(AdmissionRoute::WeightRelatedComorbidity);
    }

    if profile.bariatric_surgery_status == BariatricSurgeryStatus::Yes {
        if let Some(follow_up) = profile.bariatric_follow_up {
            if follow_up.months_since_surgery > policy.bariatric_min_months
                && follow_up.weight_plateau
            {
                return GateDecision::Eligible(AdmissionRoute::BariatricPlateau);
            }
        }
    }

    if in_comorbidity_bracket {
        GateDecision::NotEligible(RejectionReason::NoQualifyingComorbidity)
    } else {
        GateDecision::NotEligible(RejectionReason::BelowComorbidityThreshold)
    }
}
