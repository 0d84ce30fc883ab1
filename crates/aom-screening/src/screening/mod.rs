//! Anti-obesity medication screening: intake, BMI, eligibility, contraindications, and ranking.
//!
//! The engine in [`evaluation`] is a pure function of a [`ClinicalProfile`] and a
//! [`DrugCatalog`]. Everything else in this module (storage traits, the lifecycle service,
//! HTTP routes) sits around it and only ever calls it through [`ScreeningEngine::evaluate`].

pub mod bmi;
pub mod catalog;
pub mod domain;
pub mod evaluation;
pub mod intake;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use bmi::{BmiCategory, BmiReading};
pub use catalog::{
    CatalogError, CatalogStore, DrugCandidate, DrugCatalog, HabitBoost, IndicationBoost,
    QuarantinedEntry, MAX_PRIORITY_MAGNITUDE, STANDARD_CATALOG_VERSION,
};
pub use domain::{
    Answer, BariatricFollowUp, BariatricSurgeryStatus, ClinicalProfile, ConditionKey, EatingHabit, Gender,
    HabitClass, HabitPattern, QuestionnaireId, QuestionnaireStatus, QuestionnaireSubmission,
};
pub use evaluation::{
    evaluate, AdmissionRoute, ConsistencyError, DrugClassification, GateDecision,
    MedicationRecommendation, RejectionReason, ScreeningEngine, ScreeningOutcome,
    ScreeningPolicy, ScreeningStep,
};
pub use intake::{FieldIssue, IntakeNormalizer, ValidationError};
pub use repository::{
    QuestionnaireRecord, QuestionnaireRepository, QuestionnaireStatusView, RepositoryError,
    ScreeningRecord, ScreeningResultRepository,
};
pub use router::screening_router;
pub use service::{DoctorApproval, ScreeningService, ScreeningServiceError};
