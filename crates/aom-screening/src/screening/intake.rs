use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use super::domain::{
    Answer, BariatricFollowUp, BariatricSurgeryStatus, ClinicalProfile, ConditionKey, EatingHabit,
    Gender, QuestionnaireSubmission,
};

const MIN_HEIGHT_FT: i64 = 3;
const MAX_HEIGHT_FT: i64 = 8;
const MAX_HEIGHT_IN: i64 = 11;

/// One rejected questionnaire field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: &'static str,
    pub problem: String,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.problem)
    }
}

/// Intake failure naming every offending field, in questionnaire order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("questionnaire rejected: {}", render_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn fields(&self) -> Vec<&'static str> {
        self.issues.iter().map(|issue| issue.field).collect()
    }
}

fn render_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validates raw answers and produces the canonical [`ClinicalProfile`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IntakeNormalizer;

impl IntakeNormalizer {
    pub fn normalize(
        &self,
        submission: &QuestionnaireSubmission,
    ) -> Result<ClinicalProfile, ValidationError> {
        let mut issues = Vec::new();

        let age = match required("age", &submission.age, "a whole number", &mut issues) {
            Some(&age) if age > 0 && age <= i64::from(u32::MAX) => Some(age as u32),
            Some(&age) => {
                issues.push(issue("age", format!("must be a positive integer, got {age}")));
                None
            }
            None => None,
        };

        let gender = match required("gender", &submission.gender, "a string", &mut issues) {
            Some(raw) => {
                let parsed = Gender::from_key(raw);
                if parsed.is_none() {
                    issues.push(issue(
                        "gender",
                        format!("'{raw}' is not one of male, female, other"),
                    ));
                }
                parsed
            }
            None => None,
        };

        let bariatric_surgery_status = match submission.bariatric_surgery_status.as_deref() {
            None => Some(BariatricSurgeryStatus::NotApplicable),
            Some(raw) => {
                let parsed = BariatricSurgeryStatus::from_key(raw);
                if parsed.is_none() {
                    issues.push(issue(
                        "bariatric_surgery_status",
                        format!("'{raw}' is not one of yes, no, not_applicable"),
                    ));
                }
                parsed
            }
        };

        let months_since_surgery = match &submission.months_since_bariatric_surgery {
            Some(Answer::Given(months)) if *months < 0 || *months > i64::from(u32::MAX) => {
                issues.push(issue(
                    "months_since_bariatric_surgery",
                    format!("must be zero or more, got {months}"),
                ));
                None
            }
            Some(Answer::Given(months)) => Some(*months as u32),
            Some(Answer::Unreadable(raw)) => {
                issues.push(issue(
                    "months_since_bariatric_surgery",
                    format!("must be a whole number, got {raw}"),
                ));
                None
            }
            None => None,
        };

        let height_ft = match required(
            "height_ft",
            &submission.height_ft,
            "a whole number",
            &mut issues,
        ) {
            Some(&feet) if (MIN_HEIGHT_FT..=MAX_HEIGHT_FT).contains(&feet) => Some(feet as u8),
            Some(&feet) => {
                issues.push(issue(
                    "height_ft",
                    format!("must be between {MIN_HEIGHT_FT} and {MAX_HEIGHT_FT}, got {feet}"),
                ));
                None
            }
            None => None,
        };

        let height_in = match required(
            "height_in",
            &submission.height_in,
            "a whole number",
            &mut issues,
        ) {
            Some(&inches) if (0..=MAX_HEIGHT_IN).contains(&inches) => Some(inches as u8),
            Some(&inches) => {
                issues.push(issue(
                    "height_in",
                    format!("must be between 0 and {MAX_HEIGHT_IN}, got {inches}"),
                ));
                None
            }
            None => None,
        };

        let weight_lb = match required(
            "weight_lb",
            &submission.weight_lb,
            "a number",
            &mut issues,
        ) {
            Some(&pounds) if pounds.is_finite() && pounds > 0.0 => Some(pounds),
            Some(&pounds) => {
                issues.push(issue(
                    "weight_lb",
                    format!("must be greater than zero, got {pounds}"),
                ));
                None
            }
            None => None,
        };

        let comorbidities = parse_keys(
            "comorbidities",
            &submission.comorbidities,
            ConditionKey::from_key,
            &mut issues,
        );
        let eating_habits = parse_keys(
            "eating_habits",
            &submission.eating_habits,
            EatingHabit::from_key,
            &mut issues,
        );
        let health_conditions = parse_keys(
            "health_conditions",
            &submission.health_conditions,
            ConditionKey::from_key,
            &mut issues,
        );

        let (age, gender, bariatric_surgery_status, height_ft, height_in, weight_lb) =
            match (age, gender, bariatric_surgery_status, height_ft, height_in, weight_lb) {
                (Some(age), Some(gender), Some(status), Some(feet), Some(inches), Some(pounds))
                    if issues.is_empty() =>
                {
                    (age, gender, status, feet, inches, pounds)
                }
                _ => return Err(ValidationError { issues }),
            };

        let is_childbearing_age_woman = submission.is_childbearing_age_woman.unwrap_or(false);
        let bariatric_follow_up = match bariatric_surgery_status {
            BariatricSurgeryStatus::Yes => months_since_surgery.map(|months| BariatricFollowUp {
                months_since_surgery: months,
                weight_plateau: submission.bariatric_weight_plateau,
            }),
            BariatricSurgeryStatus::No | BariatricSurgeryStatus::NotApplicable => None,
        };

        Ok(ClinicalProfile {
            age,
            gender,
            is_childbearing_age_woman,
            has_reliable_contraception: is_childbearing_age_woman
                && submission.has_reliable_contraception.unwrap_or(false),
            bariatric_surgery_status,
            bariatric_follow_up,
            height_ft,
            height_in,
            weight_lb,
            comorbidities,
            health_conditions,
            eating_habits,
            current_medications: non_blank(&submission.current_medications),
            has_drug_allergies: submission.has_drug_allergies,
            drug_allergies: if submission.has_drug_allergies {
                non_blank(&submission.drug_allergies)
            } else {
                Vec::new()
            },
            additional_remarks: trimmed(submission.additional_remarks.as_deref()),
            has_medical_evaluation: submission.has_medical_evaluation,
            attempted_lifestyle_modifications: submission.attempted_lifestyle_modifications,
            previous_aom_history: trimmed(submission.previous_aom_history.as_deref()),
        })
    }
}

fn issue(field: &'static str, problem: String) -> FieldIssue {
    FieldIssue { field, problem }
}

/// Unwrap a required scalar answer, recording an issue when it is missing or mistyped.
fn required<'a, T>(
    field: &'static str,
    answer: &'a Option<Answer<T>>,
    expected: &str,
    issues: &mut Vec<FieldIssue>,
) -> Option<&'a T> {
    match answer {
        Some(Answer::Given(value)) => Some(value),
        Some(Answer::Unreadable(raw)) => {
            issues.push(issue(field, format!("must be {expected}, got {raw}")));
            None
        }
        None => {
            issues.push(issue(field, "is required".to_string()));
            None
        }
    }
}

fn parse_keys<T, F>(
    field: &'static str,
    raw: &[String],
    parse: F,
    issues: &mut Vec<FieldIssue>,
) -> BTreeSet<T>
where
    T: Ord,
    F: Fn(&str) -> Option<T>,
{
    let mut parsed = BTreeSet::new();
    let mut unknown = Vec::new();
    for value in raw {
        match parse(value) {
            Some(key) => {
                parsed.insert(key);
            }
            None => unknown.push(format!("'{}'", value.trim())),
        }
    }

    if !unknown.is_empty() {
        issues.push(issue(field, format!("unknown key(s) {}", unknown.join(", "))));
    }
    parsed
}

fn non_blank(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
