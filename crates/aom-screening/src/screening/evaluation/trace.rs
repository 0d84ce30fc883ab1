use super::super::bmi::BmiReading;
use super::super::catalog::QuarantinedEntry;
use super::contraindications::ClassifiedDrug;
use super::{MedicationRecommendation, ScreeningStep};

/// Accumulates the ordered explanation of a single run.
#[derive(Debug, Default)]
pub(crate) struct TraceBuilder {
    steps: Vec<ScreeningStep>,
}

impl TraceBuilder {
    fn push(&mut self, step: impl Into<String>, result: impl Into<String>) {
        self.steps.push(ScreeningStep {
            step: step.into(),
            result: result.into(),
        });
    }

    pub(crate) fn record_bmi(&mut self, reading: &BmiReading) {
        self.push(
            "BMI Calculation",
            format!(
                "BMI = {:.2} ({})",
                reading.value(),
                reading.category().label()
            ),
        );
    }

    pub(crate) fn record_gate(&mut self, message: &str) {
        self.push("Eligibility Gate", message);
    }

    pub(crate) fn record_drug(&mut self, entry: &ClassifiedDrug<'_>) {
        let result = match entry.classification.reason() {
            Some(reason) => format!("{}: {reason}", entry.classification.label()),
            None => entry.classification.label().to_string(),
        };
        self.push(format!("Contraindication Check - {}", entry.drug.name), result);
    }

    pub(crate) fn record_quarantine(&mut self, quarantined: &[QuarantinedEntry]) {
        if quarantined.is_empty() {
            return;
        }
        let names: Vec<&str> = quarantined.iter().map(|entry| entry.name.as_str()).collect();
        self.push(
            "Catalog Quarantine",
            format!("not evaluated: {}", names.join(", ")),
        );
    }

    pub(crate) fn record_ordering(&mut self, recommendations: &[MedicationRecommendation]) {
        let result = if recommendations.is_empty() {
            "no medication passed contraindication screening".to_string()
        } else {
            recommendations
                .iter()
                .map(|entry| format!("{} ({})", entry.medication, entry.priority))
                .collect::<Vec<_>>()
                .join(" > ")
        };
        self.push("Priority Ordering", result);
    }

    pub(crate) fn finish(self) -> Vec<ScreeningStep> {
        self.steps
    }
}
