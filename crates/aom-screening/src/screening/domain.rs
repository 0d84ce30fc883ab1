use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier wrapper for stored questionnaires.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QuestionnaireId(pub String);

impl QuestionnaireId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionnaireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A scalar answer as the client sent it.
///
/// Values of the wrong JSON type are kept verbatim instead of failing deserialization, so
/// intake can report them together with every other problem in the questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer<T> {
    Given(T),
    Unreadable(serde_json::Value),
}

impl<T> From<T> for Answer<T> {
    fn from(value: T) -> Self {
        Answer::Given(value)
    }
}

/// Raw questionnaire answers exactly as a web or mobile client submits them.
///
/// Nothing here is trusted: required answers may be missing or of the wrong type, numbers
/// may be out of range and key lists may carry spellings the catalog has never heard of.
/// [`IntakeNormalizer`](super::IntakeNormalizer) turns this into a [`ClinicalProfile`] or
/// reports every offending field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireSubmission {
    #[serde(default)]
    pub age: Option<Answer<i64>>,
    #[serde(default)]
    pub gender: Option<Answer<String>>,
    #[serde(default)]
    pub is_childbearing_age_woman: Option<bool>,
    #[serde(default)]
    pub has_reliable_contraception: Option<bool>,
    #[serde(default)]
    pub bariatric_surgery_status: Option<String>,
    #[serde(default)]
    pub months_since_bariatric_surgery: Option<Answer<i64>>,
    #[serde(default)]
    pub bariatric_weight_plateau: bool,
    #[serde(default)]
    pub height_ft: Option<Answer<i64>>,
    #[serde(default)]
    pub height_in: Option<Answer<i64>>,
    #[serde(default)]
    pub weight_lb: Option<Answer<f64>>,
    #[serde(default)]
    pub comorbidities: Vec<String>,
    #[serde(default, alias = "symptoms")]
    pub eating_habits: Vec<String>,
    #[serde(default)]
    pub health_conditions: Vec<String>,
    #[serde(default)]
    pub current_medications: Vec<String>,
    #[serde(default)]
    pub has_drug_allergies: bool,
    #[serde(default)]
    pub drug_allergies: Vec<String>,
    #[serde(default)]
    pub additional_remarks: Option<String>,
    #[serde(default = "answered_yes")]
    pub has_medical_evaluation: bool,
    #[serde(default = "answered_yes")]
    pub attempted_lifestyle_modifications: bool,
    #[serde(default)]
    pub previous_aom_history: Option<String>,
}

fn answered_yes() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn from_key(raw: &str) -> Option<Self> {
        match normalize_key(raw).as_str() {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BariatricSurgeryStatus {
    Yes,
    No,
    NotApplicable,
}

impl BariatricSurgeryStatus {
    pub fn from_key(raw: &str) -> Option<Self> {
        match normalize_key(raw).as_str() {
            "yes" => Some(Self::Yes),
            "no" => Some(Self::No),
            "not_applicable" => Some(Self::NotApplicable),
            _ => None,
        }
    }
}

/// Post-operative details that unlock the bariatric admission route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BariatricFollowUp {
    pub months_since_surgery: u32,
    pub weight_plateau: bool,
}

/// Every condition key either questionnaire section may carry.
///
/// The first block mirrors the comorbidity checklist, the second the medical
/// conditions checklist. Declaration order is the iteration order everywhere a
/// set of keys is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKey {
    Hypertension,
    Dyslipidemia,
    CoronaryArteryDisease,
    Diabetes,
    SleepApnea,
    Arthritis,
    Gerd,
    UncontrolledHypertension,
    ControlledHypertension,
    RecurrentKidneyStones,
    Glaucoma,
    HistoryStroke,
    HeartDisease,
    IntracranialHypertension,
    Adhd,
    AdhdOnMedication,
    PsychiatricTreatment,
    TakingTamoxifen,
    PregnancyBreastfeeding,
    PlanningPregnancy,
    HistoryDrugAbuse,
    Hyperthyroidism,
    ThyroidCancer,
    HistoryPancreatitis,
    Gastroparesis,
    None,
    NoComorbidities,
}

impl ConditionKey {
    pub const ALL: [ConditionKey; 27] = [
        ConditionKey::Hypertension,
        ConditionKey::Dyslipidemia,
        ConditionKey::CoronaryArteryDisease,
        ConditionKey::Diabetes,
        ConditionKey::SleepApnea,
        ConditionKey::Arthritis,
        ConditionKey::Gerd,
        ConditionKey::UncontrolledHypertension,
        ConditionKey::ControlledHypertension,
        ConditionKey::RecurrentKidneyStones,
        ConditionKey::Glaucoma,
        ConditionKey::HistoryStroke,
        ConditionKey::HeartDisease,
        ConditionKey::IntracranialHypertension,
        ConditionKey::Adhd,
        ConditionKey::AdhdOnMedication,
        ConditionKey::PsychiatricTreatment,
        ConditionKey::TakingTamoxifen,
        ConditionKey::PregnancyBreastfeeding,
        ConditionKey::PlanningPregnancy,
        ConditionKey::HistoryDrugAbuse,
        ConditionKey::Hyperthyroidism,
        ConditionKey::ThyroidCancer,
        ConditionKey::HistoryPancreatitis,
        ConditionKey::Gastroparesis,
        ConditionKey::None,
        ConditionKey::NoComorbidities,
    ];

    pub fn from_key(raw: &str) -> Option<Self> {
        let key = normalize_key(raw);
        Self::ALL.into_iter().find(|candidate| candidate.as_str() == key)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ConditionKey::Hypertension => "hypertension",
            ConditionKey::Dyslipidemia => "dyslipidemia",
            ConditionKey::CoronaryArteryDisease => "coronary_artery_disease",
            ConditionKey::Diabetes => "diabetes",
            ConditionKey::SleepApnea => "sleep_apnea",
            ConditionKey::Arthritis => "arthritis",
            ConditionKey::Gerd => "gerd",
            ConditionKey::UncontrolledHypertension => "uncontrolled_hypertension",
            ConditionKey::ControlledHypertension => "controlled_hypertension",
            ConditionKey::RecurrentKidneyStones => "recurrent_kidney_stones",
            ConditionKey::Glaucoma => "glaucoma",
            ConditionKey::HistoryStroke => "history_stroke",
            ConditionKey::HeartDisease => "heart_disease",
            ConditionKey::IntracranialHypertension => "intracranial_hypertension",
            ConditionKey::Adhd => "adhd",
            ConditionKey::AdhdOnMedication => "adhd_on_medication",
            ConditionKey::PsychiatricTreatment => "psychiatric_treatment",
            ConditionKey::TakingTamoxifen => "taking_tamoxifen",
            ConditionKey::PregnancyBreastfeeding => "pregnancy_breastfeeding",
            ConditionKey::PlanningPregnancy => "planning_pregnancy",
            ConditionKey::HistoryDrugAbuse => "history_drug_abuse",
            ConditionKey::Hyperthyroidism => "hyperthyroidism",
            ConditionKey::ThyroidCancer => "thyroid_cancer",
            ConditionKey::HistoryPancreatitis => "history_pancreatitis",
            ConditionKey::Gastroparesis => "gastroparesis",
            ConditionKey::None => "none",
            ConditionKey::NoComorbidities => "no_comorbidities",
        }
    }

    /// Human readable label used in reasons, warnings, and the trace.
    pub const fn label(self) -> &'static str {
        match self {
            ConditionKey::Hypertension => "Hypertension",
            ConditionKey::Dyslipidemia => "Dyslipidemia",
            ConditionKey::CoronaryArteryDisease => "Coronary artery disease",
            ConditionKey::Diabetes => "Diabetes",
            ConditionKey::SleepApnea => "Sleep apnea",
            ConditionKey::Arthritis => "Arthritis",
            ConditionKey::Gerd => "GERD",
            ConditionKey::UncontrolledHypertension => "Uncontrolled hypertension",
            ConditionKey::ControlledHypertension => "Controlled hypertension",
            ConditionKey::RecurrentKidneyStones => "Recurrent kidney stones",
            ConditionKey::Glaucoma => "Glaucoma",
            ConditionKey::HistoryStroke => "History of stroke",
            ConditionKey::HeartDisease => "Cardiovascular disease",
            ConditionKey::IntracranialHypertension => "Intracranial hypertension",
            ConditionKey::Adhd => "ADD/ADHD",
            ConditionKey::AdhdOnMedication => "ADD/ADHD on medication",
            ConditionKey::PsychiatricTreatment => "Psychiatric disorders",
            ConditionKey::TakingTamoxifen => "Currently taking Tamoxifen",
            ConditionKey::PregnancyBreastfeeding => "Pregnancy or breastfeeding",
            ConditionKey::PlanningPregnancy => "Planning pregnancy",
            ConditionKey::HistoryDrugAbuse => "History of substance abuse",
            ConditionKey::Hyperthyroidism => "Thyroid dysfunction",
            ConditionKey::ThyroidCancer => "Medullary thyroid cancer",
            ConditionKey::HistoryPancreatitis => "History of pancreatitis",
            ConditionKey::Gastroparesis => "Gastroparesis",
            ConditionKey::None => "None",
            ConditionKey::NoComorbidities => "No comorbidities",
        }
    }

    /// `none` and `no_comorbidities` are checklist answers, not conditions.
    pub const fn is_sentinel(self) -> bool {
        matches!(self, ConditionKey::None | ConditionKey::NoComorbidities)
    }
}

/// Eating-habit and feeling answers from the symptoms section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EatingHabit {
    ExcessiveAppetite,
    LackOfSatiety,
    BingeEating,
    EmotionalEating,
    NightEating,
    FrequentSnacking,
    NoSymptoms,
}

impl EatingHabit {
    pub const ALL: [EatingHabit; 7] = [
        EatingHabit::ExcessiveAppetite,
        EatingHabit::LackOfSatiety,
        EatingHabit::BingeEating,
        EatingHabit::EmotionalEating,
        EatingHabit::NightEating,
        EatingHabit::FrequentSnacking,
        EatingHabit::NoSymptoms,
    ];

    pub fn from_key(raw: &str) -> Option<Self> {
        let key = normalize_key(raw);
        Self::ALL.into_iter().find(|candidate| candidate.as_str() == key)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            EatingHabit::ExcessiveAppetite => "excessive_appetite",
            EatingHabit::LackOfSatiety => "lack_of_satiety",
            EatingHabit::BingeEating => "binge_eating",
            EatingHabit::EmotionalEating => "emotional_eating",
            EatingHabit::NightEating => "night_eating",
            EatingHabit::FrequentSnacking => "frequent_snacking",
            EatingHabit::NoSymptoms => "no_symptoms",
        }
    }

    pub const fn class(self) -> Option<HabitClass> {
        match self {
            EatingHabit::ExcessiveAppetite | EatingHabit::LackOfSatiety | EatingHabit::BingeEating => {
                Some(HabitClass::Appetite)
            }
            EatingHabit::EmotionalEating | EatingHabit::NightEating | EatingHabit::FrequentSnacking => {
                Some(HabitClass::Behavioral)
            }
            EatingHabit::NoSymptoms => None,
        }
    }
}

/// Behavioral target class a drug can be boosted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabitClass {
    Appetite,
    Behavioral,
}

impl HabitClass {
    pub const fn label(self) -> &'static str {
        match self {
            HabitClass::Appetite => "appetite-driven eating",
            HabitClass::Behavioral => "emotional or behavioral eating",
        }
    }
}

/// Overall eating-habit picture used to pick a drug display order.
///
/// Reporting both classes is its own pattern rather than the sum of the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabitPattern {
    Appetite,
    Behavioral,
    Mixed,
}

impl HabitPattern {
    pub const fn label(self) -> &'static str {
        match self {
            HabitPattern::Appetite => "appetite-driven eating",
            HabitPattern::Behavioral => "emotional or behavioral eating",
            HabitPattern::Mixed => "combined appetite and behavioral eating",
        }
    }
}

/// The validated, canonical patient profile the engine evaluates. Never mutated after intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalProfile {
    pub age: u32,
    pub gender: Gender,
    pub is_childbearing_age_woman: bool,
    pub has_reliable_contraception: bool,
    pub bariatric_surgery_status: BariatricSurgeryStatus,
    pub bariatric_follow_up: Option<BariatricFollowUp>,
    pub height_ft: u8,
    pub height_in: u8,
    pub weight_lb: f64,
    pub comorbidities: BTreeSet<ConditionKey>,
    pub health_conditions: BTreeSet<ConditionKey>,
    pub eating_habits: BTreeSet<EatingHabit>,
    pub current_medications: Vec<String>,
    pub has_drug_allergies: bool,
    pub drug_allergies: Vec<String>,
    pub additional_remarks: Option<String>,
    pub has_medical_evaluation: bool,
    pub attempted_lifestyle_modifications: bool,
    pub previous_aom_history: Option<String>,
}

impl ClinicalProfile {
    /// Union of both checklists, sentinels removed.
    pub fn qualifying_comorbidities(&self) -> BTreeSet<ConditionKey> {
        self.comorbidities
            .iter()
            .chain(self.health_conditions.iter())
            .copied()
            .filter(|key| !key.is_sentinel())
            .collect()
    }

    pub fn habit_classes(&self) -> BTreeSet<HabitClass> {
        self.eating_habits
            .iter()
            .filter_map(|habit| habit.class())
            .collect()
    }

    /// `None` when no classified habit was reported.
    pub fn habit_pattern(&self) -> Option<HabitPattern> {
        let classes = self.habit_classes();
        match (
            classes.contains(&HabitClass::Appetite),
            classes.contains(&HabitClass::Behavioral),
        ) {
            (true, true) => Some(HabitPattern::Mixed),
            (true, false) => Some(HabitPattern::Appetite),
            (false, true) => Some(HabitPattern::Behavioral),
            (false, false) => None,
        }
    }

    pub fn needs_contraception_counselling(&self) -> bool {
        self.is_childbearing_age_woman && !self.has_reliable_contraception
    }
}

/// Lifecycle state tracked by the orchestration service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionnaireStatus {
    Draft,
    Submitted,
    Reviewed,
}

impl QuestionnaireStatus {
    pub const fn label(self) -> &'static str {
        match self {
            QuestionnaireStatus::Draft => "draft",
            QuestionnaireStatus::Submitted => "submitted",
            QuestionnaireStatus::Reviewed => "reviewed",
        }
    }
}

pub(crate) fn normalize_key(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

pub(crate) fn join_labels<I>(keys: I) -> String
where
    I: IntoIterator<Item = ConditionKey>,
{
    keys.into_iter()
        .map(ConditionKey::label)
        .collect::<Vec<_>>()
        .join(", ")
}
