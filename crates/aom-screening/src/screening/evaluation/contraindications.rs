use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::super::catalog::{DrugCandidate, DrugCatalog};
use super::super::domain::{join_labels, ConditionKey};

/// Exactly one classification per drug per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "classification", rename_all = "snake_case")]
pub enum DrugClassification {
    Clean,
    RelativeCaution { matched: Vec<ConditionKey> },
    AbsoluteExcluded { matched: Vec<ConditionKey> },
}

impl DrugClassification {
    pub fn label(&self) -> &'static str {
        match self {
            DrugClassification::Clean => "clean",
            DrugClassification::RelativeCaution { .. } => "relative caution",
            DrugClassification::AbsoluteExcluded { .. } => "absolute exclusion",
        }
    }

    pub fn matched(&self) -> &[ConditionKey] {
        match self {
            DrugClassification::Clean => &[],
            DrugClassification::RelativeCaution { matched }
            | DrugClassification::AbsoluteExcluded { matched } => matched,
        }
    }

    /// Reason text for the exclusion or caution maps. `None` for clean drugs.
    pub fn reason(&self) -> Option<String> {
        match self {
            DrugClassification::Clean => None,
            DrugClassification::RelativeCaution { matched } => Some(format!(
                "Caution: {} (clinical clearance required)",
                join_labels(matched.iter().copied())
            )),
            DrugClassification::AbsoluteExcluded { matched } => Some(format!(
                "Excluded: {}",
                join_labels(matched.iter().copied())
            )),
        }
    }
}

pub(crate) struct ClassifiedDrug<'a> {
    pub(crate) drug: &'a DrugCandidate,
    pub(crate) classification: DrugClassification,
}

/// The absolute list is consulted before the relative list; a hit there ends the check.
pub(crate) fn classify(
    drug: &DrugCandidate,
    health_conditions: &BTreeSet<ConditionKey>,
) -> DrugClassification {
    let absolute: Vec<ConditionKey> = health_conditions
        .intersection(&drug.absolute_contraindications)
        .copied()
        .collect();
    if !absolute.is_empty() {
        return DrugClassification::AbsoluteExcluded { matched: absolute };
    }

    let relative: Vec<ConditionKey> = health_conditions
        .intersection(&drug.relative_contraindications)
        .copied()
        .collect();
    if !relative.is_empty() {
        return DrugClassification::RelativeCaution { matched: relative };
    }

    DrugClassification::Clean
}

pub(crate) fn classify_catalog<'a>(
    catalog: &'a DrugCatalog,
    health_conditions: &BTreeSet<ConditionKey>,
) -> Vec<ClassifiedDrug<'a>> {
    catalog
        .drugs()
        .iter()
        .map(|drug| ClassifiedDrug {
            drug,
            classification: classify(drug, health_conditions),
        })
        .collect()
}
