use super::common::*;
use crate::screening::domain::{
    BariatricFollowUp, BariatricSurgeryStatus, ConditionKey, EatingHabit, Gender,
    QuestionnaireSubmission,
};
use crate::screening::intake::IntakeNormalizer;

#[test]
fn normalizes_keys_and_free_text() {
    let mut submission = submission();
    submission.gender = given(" Female ".to_string());
    submission.comorbidities = keys(&["Diabetes", " sleep_apnea", "no_comorbidities"]);
    submission.eating_habits = keys(&["EMOTIONAL_EATING", "binge_eating"]);
    submission.health_conditions = keys(&["gerd"]);
    submission.current_medications = keys(&["  Metformin ", "", "   "]);
    submission.additional_remarks = Some("   ".to_string());

    let profile = IntakeNormalizer
        .normalize(&submission)
        .expect("submission is valid");

    assert_eq!(profile.gender, Gender::Female);
    assert_eq!(
        profile.comorbidities.iter().copied().collect::<Vec<_>>(),
        [
            ConditionKey::Diabetes,
            ConditionKey::SleepApnea,
            ConditionKey::NoComorbidities
        ]
    );
    assert_eq!(
        profile.eating_habits.iter().copied().collect::<Vec<_>>(),
        [EatingHabit::BingeEating, EatingHabit::EmotionalEating]
    );
    assert_eq!(profile.current_medications, ["Metformin"]);
    assert_eq!(profile.additional_remarks, None);
    assert_eq!(
        profile.qualifying_comorbidities().into_iter().collect::<Vec<_>>(),
        [
            ConditionKey::Diabetes,
            ConditionKey::SleepApnea,
            ConditionKey::Gerd
        ]
    );
}

#[test]
fn reports_every_invalid_field_in_questionnaire_order() {
    let mut submission = submission();
    submission.age = given(0);
    submission.gender = given("unknown".to_string());
    submission.bariatric_surgery_status = Some("maybe".to_string());
    submission.height_ft = given(2);
    submission.height_in = given(12);
    submission.weight_lb = given(-5.0);
    submission.comorbidities = keys(&["diabetes", "gout"]);
    submission.eating_habits = keys(&["grazing"]);
    submission.health_conditions = keys(&["glaucoma", "vertigo", "tinnitus"]);

    let err = IntakeNormalizer
        .normalize(&submission)
        .expect_err("submission is invalid");

    assert_eq!(
        err.fields(),
        [
            "age",
            "gender",
            "bariatric_surgery_status",
            "height_ft",
            "height_in",
            "weight_lb",
            "comorbidities",
            "eating_habits",
            "health_conditions"
        ]
    );
    let health = &err.issues[8];
    assert!(health.problem.contains("'vertigo'"));
    assert!(health.problem.contains("'tinnitus'"));
    assert!(!health.problem.contains("glaucoma"));
}

#[test]
fn rejects_non_finite_weight() {
    let mut submission = submission();
    submission.weight_lb = given(f64::NAN);
    let err = IntakeNormalizer
        .normalize(&submission)
        .expect_err("NaN weight is invalid");
    assert_eq!(err.fields(), ["weight_lb"]);
}

#[test]
fn height_bounds_are_inclusive() {
    for (feet, inches) in [(3, 0), (8, 11)] {
        let mut submission = submission();
        submission.height_ft = given(feet);
        submission.height_in = given(inches);
        assert!(IntakeNormalizer.normalize(&submission).is_ok());
    }
}

#[test]
fn missing_bariatric_status_defaults_to_not_applicable() {
    let mut submission = submission();
    submission.bariatric_surgery_status = None;
    submission.months_since_bariatric_surgery = given(12);

    let profile = IntakeNormalizer.normalize(&submission).expect("valid");
    assert_eq!(
        profile.bariatric_surgery_status,
        BariatricSurgeryStatus::NotApplicable
    );
    assert_eq!(profile.bariatric_follow_up, None);
}

#[test]
fn bariatric_follow_up_only_recorded_for_surgical_patients() {
    let mut submission = submission();
    submission.bariatric_surgery_status = Some("yes".to_string());
    submission.months_since_bariatric_surgery = given(9);
    submission.bariatric_weight_plateau = true;

    let profile = IntakeNormalizer.normalize(&submission).expect("valid");
    assert_eq!(
        profile.bariatric_follow_up,
        Some(BariatricFollowUp {
            months_since_surgery: 9,
            weight_plateau: true,
        })
    );

    submission.months_since_bariatric_surgery = given(-1);
    let err = IntakeNormalizer
        .normalize(&submission)
        .expect_err("negative months are invalid");
    assert_eq!(err.fields(), ["months_since_bariatric_surgery"]);
}

#[test]
fn contraception_only_counts_for_childbearing_patients() {
    let mut submission = submission();
    submission.is_childbearing_age_woman = Some(false);
    submission.has_reliable_contraception = Some(true);
    let profile = IntakeNormalizer.normalize(&submission).expect("valid");
    assert!(!profile.has_reliable_contraception);
    assert!(!profile.needs_contraception_counselling());

    submission.is_childbearing_age_woman = Some(true);
    submission.has_reliable_contraception = None;
    let profile = IntakeNormalizer.normalize(&submission).expect("valid");
    assert!(profile.needs_contraception_counselling());
}

#[test]
fn allergies_are_dropped_when_not_declared() {
    let mut submission = submission();
    submission.has_drug_allergies = false;
    submission.drug_allergies = keys(&["Penicillin"]);
    let profile = IntakeNormalizer.normalize(&submission).expect("valid");
    assert!(profile.drug_allergies.is_empty());
}

#[test]
fn legacy_symptoms_key_and_defaults_are_accepted() {
    let payload = serde_json::json!({
        "age": 41,
        "gender": "male",
        "height_ft": 5,
        "height_in": 10,
        "weight_lb": 250.0,
        "symptoms": ["excessive_appetite"]
    });

    let submission: QuestionnaireSubmission =
        serde_json::from_value(payload).expect("payload deserializes");
    assert!(submission.has_medical_evaluation);
    assert!(submission.attempted_lifestyle_modifications);

    let profile = IntakeNormalizer.normalize(&submission).expect("valid");
    assert!(profile
        .eating_habits
        .contains(&EatingHabit::ExcessiveAppetite));
    assert!(!profile.is_childbearing_age_woman);
}

#[test]
fn mistyped_and_missing_scalars_are_reported_together() {
    let payload = serde_json::json!({
        "age": "abc",
        "gender": "female",
        "height_ft": 5,
        "weight_lb": "heavy",
        "months_since_bariatric_surgery": 2.5,
        "eating_habits": ["grazing"]
    });

    let submission: QuestionnaireSubmission =
        serde_json::from_value(payload).expect("loose answers still deserialize");
    let err = IntakeNormalizer
        .normalize(&submission)
        .expect_err("submission is invalid");

    assert_eq!(
        err.fields(),
        [
            "age",
            "months_since_bariatric_surgery",
            "height_in",
            "weight_lb",
            "eating_habits"
        ]
    );
    assert_eq!(err.issues[0].problem, "must be a whole number, got \"abc\"");
    assert_eq!(err.issues[2].problem, "is required");
    assert_eq!(err.issues[3].problem, "must be a number, got \"heavy\"");
}

#[test]
fn integral_weight_is_accepted_as_a_number() {
    let payload = serde_json::json!({
        "age": 35,
        "gender": "female",
        "height_ft": 5,
        "height_in": 4,
        "weight_lb": 200
    });

    let submission: QuestionnaireSubmission =
        serde_json::from_value(payload).expect("payload deserializes");
    let profile = IntakeNormalizer.normalize(&submission).expect("valid");
    assert_eq!(profile.weight_lb, 200.0);
}
