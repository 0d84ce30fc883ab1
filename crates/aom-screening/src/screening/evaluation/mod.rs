pub(crate) mod assembler;
mod config;
pub(crate) mod contraindications;
pub(crate) mod gate;
pub(crate) mod prioritizer;
mod trace;

pub use assembler::{assemble, reconcile, verify, ConsistencyError, OutcomeParts};
pub use config::ScreeningPolicy;
pub use contraindications::DrugClassification;
pub use gate::{AdmissionRoute, GateDecision, RejectionReason};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::bmi;
use super::catalog::DrugCatalog;
use super::domain::{ClinicalProfile, ConditionKey, Gender};
use trace::TraceBuilder;

const LIFESTYLE_GUIDANCE: &str = "Continue lifestyle modification: diet and physical activity with behavioral support; re-screen if weight or health status changes";
const LIFESTYLE_ADJUNCT: &str = "Pharmacotherapy is an adjunct to lifestyle modification; pair any medication with a diet and activity plan";
const MEDICAL_EVALUATION: &str =
    "A medical evaluation is recommended before any anti-obesity medication is issued";
const PREGNANCY_SAFETY: &str = "Pregnancy or breastfeeding reported: weight-loss medications are not recommended during pregnancy or lactation; confirm status before prescribing";
const NOTHING_SURVIVED: &str =
    "No medication passed contraindication screening; refer for specialist review";

/// Stateless evaluator that applies the gate policy and a catalog to a profile.
#[derive(Debug, Clone, Default)]
pub struct ScreeningEngine {
    policy: ScreeningPolicy,
}

impl ScreeningEngine {
    pub fn new(policy: ScreeningPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ScreeningPolicy {
        &self.policy
    }

    /// Pure and deterministic: the same profile and catalog always yield the same outcome.
    pub fn evaluate(&self, profile: &ClinicalProfile, catalog: &DrugCatalog) -> ScreeningOutcome {
        let reading = bmi::for_profile(profile);
        let mut trace = TraceBuilder::default();
        trace.record_bmi(&reading);

        let decision = gate::decide(profile, &reading, &self.policy);
        let eligibility_message = decision.message(profile, &reading, &self.policy);
        trace.record_gate(&eligibility_message);
        debug!(
            ?decision,
            bmi_category = reading.category().label(),
            "eligibility gate evaluated"
        );

        let mut warnings = profile_warnings(profile, catalog);
        let mut recommended_drugs = Vec::new();
        let mut absolute_exclusions = BTreeMap::new();
        let mut relative_warnings = BTreeMap::new();

        if decision.is_eligible() {
            let classified =
                contraindications::classify_catalog(catalog, &profile.health_conditions);
            for entry in &classified {
                trace.record_drug(entry);
                match &entry.classification {
                    DrugClassification::AbsoluteExcluded { .. } => {
                        if let Some(reason) = entry.classification.reason() {
                            absolute_exclusions.insert(entry.drug.name.clone(), reason);
                        }
                    }
                    DrugClassification::RelativeCaution { .. } => {
                        if let Some(reason) = entry.classification.reason() {
                            relative_warnings.insert(entry.drug.name.clone(), reason);
                        }
                    }
                    DrugClassification::Clean => {}
                }
            }
            trace.record_quarantine(catalog.quarantined());

            recommended_drugs = prioritizer::rank(&classified, profile);
            trace.record_ordering(&recommended_drugs);
            if recommended_drugs.is_empty() {
                warnings.push(NOTHING_SURVIVED.to_string());
            }
        } else {
            warnings.push(LIFESTYLE_GUIDANCE.to_string());
        }

        info!(
            eligible = decision.is_eligible(),
            recommended = recommended_drugs.len(),
            excluded = absolute_exclusions.len(),
            cautioned = relative_warnings.len(),
            catalog_version = catalog.version(),
            "screening evaluated"
        );

        let parts = OutcomeParts {
            is_eligible: decision.is_eligible(),
            eligibility_message,
            age: profile.age,
            gender: profile.gender,
            is_childbearing_age_woman: profile.is_childbearing_age_woman,
            bmi_category: reading.category().label().to_string(),
            recommended_drugs,
            absolute_exclusions,
            relative_warnings,
            warnings,
            screening_logic: trace.finish(),
            catalog_version: catalog.version().to_string(),
        };

        if let Err(defect) = verify(&parts, catalog) {
            error!(error = %defect, "screening outcome failed consistency check; reconciling");
            return reconcile(parts, catalog);
        }
        parts.into_outcome()
    }
}

/// Evaluate with the default gate policy.
pub fn evaluate(profile: &ClinicalProfile, catalog: &DrugCatalog) -> ScreeningOutcome {
    ScreeningEngine::default().evaluate(profile, catalog)
}

/// Warnings that depend only on the profile and catalog, attached whether or not the gate passes.
fn profile_warnings(profile: &ClinicalProfile, catalog: &DrugCatalog) -> Vec<String> {
    let mut warnings = Vec::new();

    if profile.needs_contraception_counselling() {
        let teratogenic: Vec<&str> = catalog
            .drugs()
            .iter()
            .filter(|drug| drug.teratogenic)
            .map(|drug| drug.name.as_str())
            .collect();
        if teratogenic.is_empty() {
            warnings.push(
                "Reliable contraception is advised before starting any anti-obesity medication"
                    .to_string(),
            );
        } else {
            warnings.push(format!(
                "Reliable contraception is required before starting teratogenic medication ({})",
                teratogenic.join(", ")
            ));
        }
    }

    if profile
        .health_conditions
        .contains(&ConditionKey::PregnancyBreastfeeding)
    {
        warnings.push(PREGNANCY_SAFETY.to_string());
    }

    if !profile.has_medical_evaluation {
        warnings.push(MEDICAL_EVALUATION.to_string());
    }

    if !profile.attempted_lifestyle_modifications {
        warnings.push(LIFESTYLE_ADJUNCT.to_string());
    }

    if profile.has_drug_allergies {
        let count = profile.drug_allergies.len();
        let noun = if count == 1 { "allergy" } else { "allergies" };
        warnings.push(format!(
            "Patient reports {count} drug {noun}; clinician review required before prescribing"
        ));
    }

    for entry in catalog.quarantined() {
        warnings.push(format!(
            "Catalog entry '{}' is unavailable and was not evaluated: {}",
            entry.name, entry.problem
        ));
    }

    warnings
}

/// One recommended medication with its computed priority and explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationRecommendation {
    pub medication: String,
    pub priority: i32,
    pub reasoning: String,
}

/// A single decision point in the screening trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningStep {
    pub step: String,
    pub result: String,
}

/// Engine output. Field order is the serialized key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningOutcome {
    pub is_eligible: bool,
    pub eligibility_message: String,
    pub age: u32,
    pub gender: Gender,
    pub is_childbearing_age_woman: bool,
    pub bmi_category: String,
    pub recommended_drugs: Vec<MedicationRecommendation>,
    pub absolute_exclusions: BTreeMap<String, String>,
    pub relative_warnings: BTreeMap<String, String>,
    pub warnings: Vec<String>,
    pub screening_logic: Vec<ScreeningStep>,
    pub catalog_version: String,
}

impl ScreeningOutcome {
    pub fn recommends(&self, medication: &str) -> bool {
        self.recommended_drugs
            .iter()
            .any(|entry| entry.medication.eq_ignore_ascii_case(medication))
    }
}
