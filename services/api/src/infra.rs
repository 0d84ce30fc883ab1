use aom_screening::screening::{
    CatalogStore, QuestionnaireId, QuestionnaireRecord, QuestionnaireRepository, RepositoryError,
    ScreeningRecord, ScreeningResultRepository,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) catalog: Arc<CatalogStore>,
    pub(crate) catalog_path: Option<PathBuf>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryQuestionnaireRepository {
    records: Arc<Mutex<HashMap<QuestionnaireId, QuestionnaireRecord>>>,
}

impl QuestionnaireRepository for InMemoryQuestionnaireRepository {
    fn insert(&self, record: QuestionnaireRecord) -> Result<QuestionnaireRecord, RepositoryError> {
        let mut guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: QuestionnaireRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.contains_key(&record.id) {
            guard.insert(record.id.clone(), record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &QuestionnaireId) -> Result<Option<QuestionnaireRecord>, RepositoryError> {
        let guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.get(id).cloned())
    }

    fn remove(&self, id: &QuestionnaireId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        guard.remove(id).map(|_| ()).ok_or(RepositoryError::NotFound)
    }
}

/// Results keyed in a `BTreeMap` so the pending queue comes back in questionnaire order.
#[derive(Default, Clone)]
pub(crate) struct InMemoryScreeningResultRepository {
    records: Arc<Mutex<BTreeMap<QuestionnaireId, ScreeningRecord>>>,
}

impl ScreeningResultRepository for InMemoryScreeningResultRepository {
    fn insert(&self, record: ScreeningRecord) -> Result<ScreeningRecord, RepositoryError> {
        let mut guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.contains_key(&record.questionnaire_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.questionnaire_id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: ScreeningRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.contains_key(&record.questionnaire_id) {
            guard.insert(record.questionnaire_id.clone(), record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &QuestionnaireId) -> Result<Option<ScreeningRecord>, RepositoryError> {
        let guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.get(id).cloned())
    }

    fn pending(&self, skip: usize, limit: usize) -> Result<Vec<ScreeningRecord>, RepositoryError> {
        let guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard
            .values()
            .filter(|record| record.is_pending_review())
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }
}
