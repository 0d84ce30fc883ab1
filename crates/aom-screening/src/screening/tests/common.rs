use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::screening::catalog::{CatalogStore, DrugCandidate, DrugCatalog};
use crate::screening::domain::{
    Answer, ClinicalProfile, ConditionKey, QuestionnaireId, QuestionnaireSubmission,
};
use crate::screening::intake::IntakeNormalizer;
use crate::screening::repository::{
    QuestionnaireRecord, QuestionnaireRepository, RepositoryError, ScreeningRecord,
    ScreeningResultRepository,
};
use crate::screening::{screening_router, ScreeningService};

/// 35 year old woman, 5'4", 200 lb (BMI 34.33), nothing else reported.
pub(super) fn submission() -> QuestionnaireSubmission {
    QuestionnaireSubmission {
        age: given(35),
        gender: given("female".to_string()),
        is_childbearing_age_woman: Some(true),
        has_reliable_contraception: Some(true),
        bariatric_surgery_status: Some("no".to_string()),
        months_since_bariatric_surgery: None,
        bariatric_weight_plateau: false,
        height_ft: given(5),
        height_in: given(4),
        weight_lb: given(200.0),
        comorbidities: Vec::new(),
        eating_habits: Vec::new(),
        health_conditions: Vec::new(),
        current_medications: vec!["Metformin".to_string()],
        has_drug_allergies: false,
        drug_allergies: Vec::new(),
        additional_remarks: None,
        has_medical_evaluation: true,
        attempted_lifestyle_modifications: true,
        previous_aom_history: None,
    }
}

pub(super) fn given<T>(value: T) -> Option<Answer<T>> {
    Some(Answer::Given(value))
}

pub(super) fn keys(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

pub(super) fn profile(submission: &QuestionnaireSubmission) -> ClinicalProfile {
    IntakeNormalizer
        .normalize(submission)
        .expect("fixture submission is valid")
}

/// Pregnant woman of childbearing age without contraception, BMI 34.33.
pub(super) fn scenario_a() -> ClinicalProfile {
    let mut submission = submission();
    submission.has_reliable_contraception = None;
    submission.health_conditions = keys(&["pregnancy_breastfeeding"]);
    profile(&submission)
}

/// BMI 25.0 with no comorbidities.
pub(super) fn scenario_b() -> ClinicalProfile {
    let mut submission = submission();
    submission.weight_lb = given(145.65);
    submission.comorbidities = keys(&["no_comorbidities"]);
    profile(&submission)
}

/// BMI 28.0 with diabetes and GERD.
pub(super) fn scenario_c() -> ClinicalProfile {
    let mut submission = submission();
    submission.weight_lb = given(163.1);
    submission.comorbidities = keys(&["diabetes"]);
    submission.health_conditions = keys(&["gerd"]);
    profile(&submission)
}

pub(super) fn drug(
    name: &str,
    base_priority: i32,
    absolute: &[ConditionKey],
    relative: &[ConditionKey],
) -> DrugCandidate {
    DrugCandidate {
        name: name.to_string(),
        base_priority,
        absolute_contraindications: absolute.iter().copied().collect(),
        relative_contraindications: relative.iter().copied().collect(),
        indications: Vec::new(),
        habit_targets: Vec::new(),
        teratogenic: false,
    }
}

pub(super) fn build_service() -> (
    ScreeningService<MemoryQuestionnaires, MemoryResults>,
    Arc<MemoryQuestionnaires>,
    Arc<MemoryResults>,
) {
    let questionnaires = Arc::new(MemoryQuestionnaires::default());
    let results = Arc::new(MemoryResults::default());
    let service = ScreeningService::new(
        questionnaires.clone(),
        results.clone(),
        Arc::new(CatalogStore::new(DrugCatalog::standard())),
    );
    (service, questionnaires, results)
}

pub(super) fn router_with_service(
    service: ScreeningService<MemoryQuestionnaires, MemoryResults>,
) -> axum::Router {
    screening_router(Arc::new(service))
}

#[derive(Default, Clone)]
pub(super) struct MemoryQuestionnaires {
    pub(super) records: Arc<Mutex<HashMap<QuestionnaireId, QuestionnaireRecord>>>,
}

impl QuestionnaireRepository for MemoryQuestionnaires {
    fn insert(&self, record: QuestionnaireRecord) -> Result<QuestionnaireRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: QuestionnaireRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(record.id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &QuestionnaireId) -> Result<Option<QuestionnaireRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn remove(&self, id: &QuestionnaireId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.remove(id).map(|_| ()).ok_or(RepositoryError::NotFound)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryResults {
    pub(super) records: Arc<Mutex<BTreeMap<QuestionnaireId, ScreeningRecord>>>,
}

impl ScreeningResultRepository for MemoryResults {
    fn insert(&self, record: ScreeningRecord) -> Result<ScreeningRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.questionnaire_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.questionnaire_id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: ScreeningRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(record.questionnaire_id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &QuestionnaireId) -> Result<Option<ScreeningRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn pending(&self, skip: usize, limit: usize) -> Result<Vec<ScreeningRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.is_pending_review())
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }
}

pub(super) struct UnavailableResults;

impl ScreeningResultRepository for UnavailableResults {
    fn insert(&self, _record: ScreeningRecord) -> Result<ScreeningRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _record: ScreeningRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &QuestionnaireId) -> Result<Option<ScreeningRecord>, RepositoryError> {
        Ok(None)
    }

    fn pending(&self, _skip: usize, _limit: usize) -> Result<Vec<ScreeningRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
