use super::super::domain::{join_labels, ClinicalProfile};
use super::contraindications::{ClassifiedDrug, DrugClassification};
use super::MedicationRecommendation;

/// Score every drug that survived the contraindication check and order the result.
///
/// `Vec::sort_by` is stable, so equal scores keep catalog declaration order.
pub(crate) fn rank(
    classified: &[ClassifiedDrug<'_>],
    profile: &ClinicalProfile,
) -> Vec<MedicationRecommendation> {
    let present_conditions = profile.qualifying_comorbidities();
    let habit_pattern = profile.habit_pattern();

    let mut ranked: Vec<MedicationRecommendation> = classified
        .iter()
        .filter(|entry| {
            !matches!(
                entry.classification,
                DrugClassification::AbsoluteExcluded { .. }
            )
        })
        .map(|entry| {
            let drug = entry.drug;
            let mut priority = drug.base_priority;
            let mut tokens = Vec::new();

            for indication in &drug.indications {
                if present_conditions.contains(&indication.condition) {
                    priority = priority.saturating_add(indication.boost);
                    tokens.push(format!(
                        "indicated for {} (+{})",
                        indication.condition.label(),
                        indication.boost
                    ));
                }
            }

            for target in &drug.habit_targets {
                if habit_pattern == Some(target.pattern) {
                    priority = priority.saturating_add(target.boost);
                    tokens.push(format!("targets {} (+{})", target.pattern.label(), target.boost));
                }
            }

            match &entry.classification {
                DrugClassification::RelativeCaution { matched } => tokens.push(format!(
                    "use with caution: {} (clinical clearance required)",
                    join_labels(matched.iter().copied())
                )),
                _ => tokens.push("no contraindications identified".to_string()),
            }

            MedicationRecommendation {
                medication: drug.name.clone(),
                priority,
                reasoning: tokens.join("; "),
            }
        })
        .collect();

    ranked.sort_by(|left, right| right.priority.cmp(&left.priority));
    ranked
}
