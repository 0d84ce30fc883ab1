use std::collections::{BTreeMap, BTreeSet};

use super::super::catalog::DrugCatalog;
use super::super::domain::Gender;
use super::{MedicationRecommendation, ScreeningOutcome, ScreeningStep};

/// Internal invariant violation caught while packaging an outcome. Logged, never serialized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsistencyError {
    #[error("drug '{0}' is both excluded and recommended")]
    ExcludedAndRecommended(String),
    #[error("drug '{0}' is both excluded and caution-listed")]
    ExcludedAndCautioned(String),
    #[error("drug '{0}' is caution-listed but not recommended")]
    CautionNotRecommended(String),
    #[error("recommended drug '{0}' is not in the catalog")]
    UnknownRecommendation(String),
    #[error("recommendations are not ordered by descending priority")]
    UnsortedRecommendations,
    #[error("ineligible outcome carries {0} recommendation(s)")]
    RecommendationsForIneligible(usize),
}

/// Everything the engine computed, before the invariants are re-checked.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeParts {
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

impl OutcomeParts {
    pub(crate) fn into_outcome(self) -> ScreeningOutcome {
        ScreeningOutcome {
            is_eligible: self.is_eligible,
            eligibility_message: self.eligibility_message,
            age: self.age,
            gender: self.gender,
            is_childbearing_age_woman: self.is_childbearing_age_woman,
            bmi_category: self.bmi_category,
            recommended_drugs: self.recommended_drugs,
            absolute_exclusions: self.absolute_exclusions,
            relative_warnings: self.relative_warnings,
            warnings: self.warnings,
            screening_logic: self.screening_logic,
            catalog_version: self.catalog_version,
        }
    }
}

/// Re-check the cross-field invariants, reporting the first violation found.
pub fn verify(parts: &OutcomeParts, catalog: &DrugCatalog) -> Result<(), ConsistencyError> {
    if !parts.is_eligible && !parts.recommended_drugs.is_empty() {
        return Err(ConsistencyError::RecommendationsForIneligible(
            parts.recommended_drugs.len(),
        ));
    }

    for recommendation in &parts.recommended_drugs {
        if parts.absolute_exclusions.contains_key(&recommendation.medication) {
            return Err(ConsistencyError::ExcludedAndRecommended(
                recommendation.medication.clone(),
            ));
        }
        if catalog.get(&recommendation.medication).is_none() {
            return Err(ConsistencyError::UnknownRecommendation(
                recommendation.medication.clone(),
            ));
        }
    }

    let recommended: BTreeSet<&str> = parts
        .recommended_drugs
        .iter()
        .map(|entry| entry.medication.as_str())
        .collect();
    for drug in parts.relative_warnings.keys() {
        if parts.absolute_exclusions.contains_key(drug) {
            return Err(ConsistencyError::ExcludedAndCautioned(drug.clone()));
        }
        if !recommended.contains(drug.as_str()) {
            return Err(ConsistencyError::CautionNotRecommended(drug.clone()));
        }
    }

    let sorted = parts
        .recommended_drugs
        .windows(2)
        .all(|pair| pair[0].priority >= pair[1].priority);
    if !sorted {
        return Err(ConsistencyError::UnsortedRecommendations);
    }

    Ok(())
}

pub fn assemble(
    parts: OutcomeParts,
    catalog: &DrugCatalog,
) -> Result<ScreeningOutcome, ConsistencyError> {
    verify(&parts, catalog)?;
    Ok(parts.into_outcome())
}

/// Repair a defective outcome so the safer classification wins.
///
/// Exclusion beats caution and recommendation. A caution entry with no matching
/// recommendation is demoted to a general warning rather than promoted to a recommendation.
pub fn reconcile(mut parts: OutcomeParts, catalog: &DrugCatalog) -> ScreeningOutcome {
    if !parts.is_eligible {
        parts.recommended_drugs.clear();
    }

    let excluded = parts.absolute_exclusions.clone();
    parts.recommended_drugs.retain(|entry| {
        !excluded.contains_key(&entry.medication) && catalog.get(&entry.medication).is_some()
    });
    parts
        .relative_warnings
        .retain(|drug, _| !excluded.contains_key(drug));

    let recommended: BTreeSet<String> = parts
        .recommended_drugs
        .iter()
        .map(|entry| entry.medication.clone())
        .collect();
    let orphaned: Vec<String> = parts
        .relative_warnings
        .keys()
        .filter(|drug| !recommended.contains(*drug))
        .cloned()
        .collect();
    for drug in orphaned {
        if let Some(reason) = parts.relative_warnings.remove(&drug) {
            parts.warnings.push(format!("{drug}: {reason}"));
        }
    }

    parts
        .recommended_drugs
        .sort_by(|left, right| right.priority.cmp(&left.priority));

    parts.into_outcome()
}
