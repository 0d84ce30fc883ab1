use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ClinicalProfile, QuestionnaireId, QuestionnaireStatus, QuestionnaireSubmission};
use super::evaluation::ScreeningOutcome;

/// Stored questionnaire: the raw answers plus the normalized profile once submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionnaireRecord {
    pub id: QuestionnaireId,
    pub submission: QuestionnaireSubmission,
    pub profile: Option<ClinicalProfile>,
    pub status: QuestionnaireStatus,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl QuestionnaireRecord {
    pub fn status_view(&self) -> QuestionnaireStatusView {
        QuestionnaireStatusView {
            questionnaire_id: self.id.clone(),
            status: self.status.label(),
            created_at: self.created_at,
            submitted_at: self.submitted_at,
        }
    }
}

/// Persisted engine outcome with the doctor's review fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningRecord {
    pub questionnaire_id: QuestionnaireId,
    #[serde(flatten)]
    pub outcome: ScreeningOutcome,
    pub created_at: DateTime<Utc>,
    pub doctor_selected_medication: Option<String>,
    pub doctor_notes: Option<String>,
    pub doctor_approved_at: Option<DateTime<Utc>>,
}

impl ScreeningRecord {
    pub fn is_pending_review(&self) -> bool {
        self.doctor_selected_medication.is_none()
    }
}

/// Storage for questionnaires so the service can be exercised without a database.
pub trait QuestionnaireRepository: Send + Sync {
    fn insert(&self, record: QuestionnaireRecord) -> Result<QuestionnaireRecord, RepositoryError>;
    fn update(&self, record: QuestionnaireRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &QuestionnaireId) -> Result<Option<QuestionnaireRecord>, RepositoryError>;
    /// Only drafts are ever removed; the service enforces that before calling.
    fn remove(&self, id: &QuestionnaireId) -> Result<(), RepositoryError>;
}

/// Storage for screening results, keyed by questionnaire.
pub trait ScreeningResultRepository: Send + Sync {
    /// Must fail with [`RepositoryError::Conflict`] when a result already exists.
    fn insert(&self, record: ScreeningRecord) -> Result<ScreeningRecord, RepositoryError>;
    fn update(&self, record: ScreeningRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &QuestionnaireId) -> Result<Option<ScreeningRecord>, RepositoryError>;
    /// Results with no doctor selection, oldest questionnaire id first, after skipping `skip`.
    fn pending(&self, skip: usize, limit: usize) -> Result<Vec<ScreeningRecord>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Sanitized questionnaire state for API responses. Never carries clinical answers.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionnaireStatusView {
    pub questionnaire_id: QuestionnaireId,
    pub status: &'static str,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}
