use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::catalog::CatalogStore;
use super::domain::{QuestionnaireId, QuestionnaireStatus, QuestionnaireSubmission};
use super::evaluation::ScreeningEngine;
use super::intake::{IntakeNormalizer, ValidationError};
use super::repository::{
    QuestionnaireRecord, QuestionnaireRepository, RepositoryError, ScreeningRecord,
    ScreeningResultRepository,
};

/// A doctor's final selection for a screened questionnaire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorApproval {
    pub selected_medication: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Service composing intake, the screening engine, the active catalog, and storage.
pub struct ScreeningService<Q, S> {
    normalizer: IntakeNormalizer,
    questionnaires: Arc<Q>,
    results: Arc<S>,
    engine: Arc<ScreeningEngine>,
    catalog: Arc<CatalogStore>,
    sequence: AtomicU64,
    run_locks: Mutex<HashMap<QuestionnaireId, Arc<Mutex<()>>>>,
}

impl<Q, S> ScreeningService<Q, S>
where
    Q: QuestionnaireRepository + 'static,
    S: ScreeningResultRepository + 'static,
{
    pub fn new(questionnaires: Arc<Q>, results: Arc<S>, catalog: Arc<CatalogStore>) -> Self {
        Self::with_engine(questionnaires, results, catalog, ScreeningEngine::default())
    }

    pub fn with_engine(
        questionnaires: Arc<Q>,
        results: Arc<S>,
        catalog: Arc<CatalogStore>,
        engine: ScreeningEngine,
    ) -> Self {
        Self {
            normalizer: IntakeNormalizer,
            questionnaires,
            results,
            engine: Arc::new(engine),
            catalog,
            sequence: AtomicU64::new(1),
            run_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &Arc<CatalogStore> {
        &self.catalog
    }

    fn next_questionnaire_id(&self) -> QuestionnaireId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        QuestionnaireId(format!("q-{id:06}"))
    }

    /// Store a new draft questionnaire.
    pub fn create(
        &self,
        submission: QuestionnaireSubmission,
    ) -> Result<QuestionnaireRecord, ScreeningServiceError> {
        let record = QuestionnaireRecord {
            id: self.next_questionnaire_id(),
            submission,
            profile: None,
            status: QuestionnaireStatus::Draft,
            created_at: Utc::now(),
            submitted_at: None,
            reviewed_at: None,
        };

        let stored = self.questionnaires.insert(record)?;
        info!(questionnaire_id = %stored.id, "questionnaire created");
        Ok(stored)
    }

    pub fn get(&self, id: &QuestionnaireId) -> Result<QuestionnaireRecord, ScreeningServiceError> {
        let record = self
            .questionnaires
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    /// Replace the answers of a draft.
    pub fn update(
        &self,
        id: &QuestionnaireId,
        submission: QuestionnaireSubmission,
    ) -> Result<QuestionnaireRecord, ScreeningServiceError> {
        let mut record = self.draft(id)?;
        record.submission = submission;
        self.questionnaires.update(record.clone())?;
        Ok(record)
    }

    pub fn delete(&self, id: &QuestionnaireId) -> Result<(), ScreeningServiceError> {
        self.draft(id)?;
        self.questionnaires.remove(id)?;
        info!(questionnaire_id = %id, "draft questionnaire deleted");
        Ok(())
    }

    /// Validate a draft and move it to `Submitted`. A rejected draft stays editable.
    pub fn submit(&self, id: &QuestionnaireId) -> Result<QuestionnaireRecord, ScreeningServiceError> {
        let mut record = self.draft(id)?;
        let profile = self.normalizer.normalize(&record.submission)?;

        record.profile = Some(profile);
        record.status = QuestionnaireStatus::Submitted;
        record.submitted_at = Some(Utc::now());
        self.questionnaires.update(record.clone())?;

        info!(questionnaire_id = %record.id, "questionnaire submitted");
        Ok(record)
    }

    /// Screen a submitted questionnaire once and persist the outcome.
    ///
    /// Runs for the same id are serialized, so two concurrent callers cannot both pass the
    /// already-screened check.
    pub fn run(&self, id: &QuestionnaireId) -> Result<ScreeningRecord, ScreeningServiceError> {
        let lock = self.run_lock(id);
        let outcome = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.screen(id)
        };
        self.release_run_lock(id, &lock);
        outcome
    }

    fn screen(&self, id: &QuestionnaireId) -> Result<ScreeningRecord, ScreeningServiceError> {
        let record = self.get(id)?;
        match record.status {
            QuestionnaireStatus::Draft => {
                return Err(ScreeningServiceError::NotSubmitted(id.clone()));
            }
            QuestionnaireStatus::Reviewed => {
                return Err(ScreeningServiceError::AlreadyScreened(id.clone()));
            }
            QuestionnaireStatus::Submitted => {}
        }
        if self.results.fetch(id)?.is_some() {
            return Err(ScreeningServiceError::AlreadyScreened(id.clone()));
        }
        let profile = record
            .profile
            .ok_or_else(|| ScreeningServiceError::NotSubmitted(id.clone()))?;

        let catalog = self.catalog.snapshot();
        let outcome = self.engine.evaluate(&profile, &catalog);
        let screening = ScreeningRecord {
            questionnaire_id: id.clone(),
            outcome,
            created_at: Utc::now(),
            doctor_selected_medication: None,
            doctor_notes: None,
            doctor_approved_at: None,
        };

        let stored = self.results.insert(screening).map_err(|err| match err {
            RepositoryError::Conflict => ScreeningServiceError::AlreadyScreened(id.clone()),
            other => ScreeningServiceError::Repository(other),
        })?;

        info!(
            questionnaire_id = %id,
            eligible = stored.outcome.is_eligible,
            catalog_version = %stored.outcome.catalog_version,
            "screening stored"
        );
        Ok(stored)
    }

    pub fn result(&self, id: &QuestionnaireId) -> Result<ScreeningRecord, ScreeningServiceError> {
        let record = self.results.fetch(id)?.ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    /// Results still waiting on a doctor's selection.
    pub fn pending(
        &self,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<ScreeningRecord>, ScreeningServiceError> {
        Ok(self.results.pending(skip, limit)?)
    }

    /// Record the doctor's selection. The medication must be one the engine recommended.
    pub fn approve(
        &self,
        id: &QuestionnaireId,
        approval: DoctorApproval,
    ) -> Result<ScreeningRecord, ScreeningServiceError> {
        let mut screening = self.result(id)?;
        let selected = approval.selected_medication.trim();
        let canonical = screening
            .outcome
            .recommended_drugs
            .iter()
            .find(|entry| entry.medication.eq_ignore_ascii_case(selected))
            .map(|entry| entry.medication.clone())
            .ok_or_else(|| ScreeningServiceError::MedicationNotRecommended {
                id: id.clone(),
                medication: selected.to_string(),
            })?;

        let now = Utc::now();
        screening.doctor_selected_medication = Some(canonical);
        screening.doctor_notes = approval
            .notes
            .map(|notes| notes.trim().to_string())
            .filter(|notes| !notes.is_empty());
        screening.doctor_approved_at = Some(now);
        self.results.update(screening.clone())?;

        if let Some(mut questionnaire) = self.questionnaires.fetch(id)? {
            questionnaire.status = QuestionnaireStatus::Reviewed;
            questionnaire.reviewed_at = Some(now);
            self.questionnaires.update(questionnaire)?;
        }

        info!(questionnaire_id = %id, "screening approved");
        Ok(screening)
    }

    fn draft(&self, id: &QuestionnaireId) -> Result<QuestionnaireRecord, ScreeningServiceError> {
        let record = self.get(id)?;
        if record.status != QuestionnaireStatus::Draft {
            return Err(ScreeningServiceError::NotDraft {
                id: id.clone(),
                status: record.status,
            });
        }
        Ok(record)
    }

    fn run_lock(&self, id: &QuestionnaireId) -> Arc<Mutex<()>> {
        let mut locks = self.run_locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the id's lock once no other caller holds or waits on it.
    fn release_run_lock(&self, id: &QuestionnaireId, lock: &Arc<Mutex<()>>) {
        let mut locks = self.run_locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference lives in the map and one with this caller.
        if Arc::strong_count(lock) <= 2 {
            locks.remove(id);
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked_run_locks(&self) -> usize {
        self.run_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Error raised by the screening service.
#[derive(Debug, thiserror::Error)]
pub enum ScreeningServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("questionnaire {id} is {} and can no longer be changed", status.label())]
    NotDraft {
        id: QuestionnaireId,
        status: QuestionnaireStatus,
    },
    #[error("questionnaire {0} must be submitted before screening")]
    NotSubmitted(QuestionnaireId),
    #[error("screening already performed for questionnaire {0}")]
    AlreadyScreened(QuestionnaireId),
    #[error("'{medication}' is not among the recommendations for questionnaire {id}")]
    MedicationNotRecommended {
        id: QuestionnaireId,
        medication: String,
    },
}
