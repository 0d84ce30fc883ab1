use crate::infra::{InMemoryQuestionnaireRepository, InMemoryScreeningResultRepository};
use aom_screening::error::AppError;
use aom_screening::screening::{
    evaluate, Answer, CatalogStore, DoctorApproval, DrugCatalog, IntakeNormalizer,
    QuestionnaireSubmission, ScreeningOutcome, ScreeningService,
};
use clap::Args;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScreenArgs {
    /// Questionnaire JSON file to screen
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Screen against this catalog file instead of the built-in one
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Print only the summary lines instead of the full JSON result
    #[arg(long)]
    pub(crate) summary: bool,
}

#[derive(Args, Debug)]
pub(crate) struct CatalogValidateArgs {
    /// Catalog JSON file to check
    pub(crate) path: PathBuf,
    /// Parse the way a reload does, reporting quarantined entries instead of failing
    #[arg(long)]
    pub(crate) lenient: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Print the step-by-step screening trace for each scenario
    #[arg(long)]
    pub(crate) show_trace: bool,
    /// Skip the doctor approval step at the end of the walkthrough
    #[arg(long)]
    pub(crate) skip_approval: bool,
}

pub(crate) fn run_screen(args: ScreenArgs) -> Result<(), AppError> {
    let ScreenArgs {
        input,
        catalog,
        summary,
    } = args;

    let submission: QuestionnaireSubmission =
        serde_json::from_reader(BufReader::new(File::open(&input)?))?;
    let profile = IntakeNormalizer.normalize(&submission)?;
    let catalog = match catalog {
        Some(path) => DrugCatalog::from_path(path)?,
        None => DrugCatalog::standard(),
    };

    let outcome = evaluate(&profile, &catalog);
    if summary {
        render_outcome(&outcome, false);
    } else {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }
    Ok(())
}

pub(crate) fn run_catalog_validate(args: CatalogValidateArgs) -> Result<(), AppError> {
    let catalog = if args.lenient {
        let raw = std::fs::read_to_string(&args.path)?;
        DrugCatalog::from_json_lenient(&raw)?
    } else {
        DrugCatalog::from_path(&args.path)?
    };

    println!(
        "Catalog {} is valid: version {} with {} drugs",
        args.path.display(),
        catalog.version(),
        catalog.drugs().len()
    );
    for drug in catalog.drugs() {
        println!(
            "  - {} (base {}, {} absolute / {} relative contraindications)",
            drug.name,
            drug.base_priority,
            drug.absolute_contraindications.len(),
            drug.relative_contraindications.len()
        );
    }
    if !catalog.quarantined().is_empty() {
        println!("Quarantined entries:");
        for entry in catalog.quarantined() {
            println!("  - {}: {}", entry.name, entry.problem);
        }
    }
    Ok(())
}

pub(crate) fn run_catalog_show() -> Result<(), AppError> {
    println!(
        "{}",
        serde_json::to_string_pretty(&DrugCatalog::standard())?
    );
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        show_trace,
        skip_approval,
    } = args;

    println!("AOM screening demo");
    let service = ScreeningService::new(
        Arc::new(InMemoryQuestionnaireRepository::default()),
        Arc::new(InMemoryScreeningResultRepository::default()),
        Arc::new(CatalogStore::default()),
    );
    println!(
        "- Catalog version {} ({} drugs)",
        service.catalog().snapshot().version(),
        service.catalog().snapshot().drugs().len()
    );

    let mut last_screened = None;
    for (label, submission) in demo_scenarios() {
        println!("\n{}", label);
        let draft = match service.create(submission) {
            Ok(record) => record,
            Err(err) => {
                println!("  Draft rejected: {}", err);
                continue;
            }
        };
        if let Err(err) = service.submit(&draft.id) {
            println!("  Submission rejected: {}", err);
            continue;
        }
        let screening = match service.run(&draft.id) {
            Ok(record) => record,
            Err(err) => {
                println!("  Screening unavailable: {}", err);
                continue;
            }
        };
        println!("  Questionnaire {}", draft.id);
        render_outcome(&screening.outcome, show_trace);
        if screening.outcome.is_eligible && !screening.outcome.recommended_drugs.is_empty() {
            last_screened = Some(screening);
        }
    }

    if skip_approval {
        return Ok(());
    }

    let Some(screening) = last_screened else {
        println!("\nNo screening produced a recommendation to approve");
        return Ok(());
    };
    let Some(top) = screening.outcome.recommended_drugs.first() else {
        return Ok(());
    };
    let approval = DoctorApproval {
        selected_medication: top.medication.clone(),
        notes: Some("Demo approval of the top-ranked option".to_string()),
    };
    match service.approve(&screening.questionnaire_id, approval) {
        Ok(record) => println!(
            "\nDoctor approved {} for {}; {} screenings still pending review",
            record.doctor_selected_medication.as_deref().unwrap_or("-"),
            record.questionnaire_id,
            service.pending(0, 100).map(|pending| pending.len()).unwrap_or(0)
        ),
        Err(err) => println!("\nApproval rejected: {}", err),
    }

    Ok(())
}

fn render_outcome(outcome: &ScreeningOutcome, show_trace: bool) {
    println!(
        "  {} | category: {}",
        outcome.eligibility_message, outcome.bmi_category
    );
    if outcome.recommended_drugs.is_empty() {
        println!("  Recommendations: none");
    } else {
        println!("  Recommendations:");
        for entry in &outcome.recommended_drugs {
            println!(
                "    - {} ({}): {}",
                entry.medication, entry.priority, entry.reasoning
            );
        }
    }
    if !outcome.absolute_exclusions.is_empty() {
        println!("  Excluded:");
        for (drug, reason) in &outcome.absolute_exclusions {
            println!("    - {}: {}", drug, reason);
        }
    }
    if !outcome.relative_warnings.is_empty() {
        println!("  Cautions:");
        for (drug, reason) in &outcome.relative_warnings {
            println!("    - {}: {}", drug, reason);
        }
    }
    for warning in &outcome.warnings {
        println!("  ! {}", warning);
    }
    if show_trace {
        println!("  Trace:");
        for step in &outcome.screening_logic {
            println!("    {} -> {}", step.step, step.result);
        }
    }
}

fn given<T>(value: T) -> Option<Answer<T>> {
    Some(Answer::Given(value))
}

fn demo_scenarios() -> Vec<(&'static str, QuestionnaireSubmission)> {
    let base = QuestionnaireSubmission {
        age: given(35),
        gender: given("female".to_string()),
        is_childbearing_age_woman: Some(true),
        has_reliable_contraception: None,
        bariatric_surgery_status: Some("no".to_string()),
        months_since_bariatric_surgery: None,
        bariatric_weight_plateau: false,
        height_ft: given(5),
        height_in: given(4),
        weight_lb: given(200.0),
        comorbidities: Vec::new(),
        eating_habits: Vec::new(),
        health_conditions: vec!["pregnancy_breastfeeding".to_string()],
        current_medications: Vec::new(),
        has_drug_allergies: false,
        drug_allergies: Vec::new(),
        additional_remarks: None,
        has_medical_evaluation: true,
        attempted_lifestyle_modifications: true,
        previous_aom_history: None,
    };

    let below_threshold = QuestionnaireSubmission {
        age: given(42),
        gender: given("male".to_string()),
        is_childbearing_age_woman: None,
        weight_lb: given(145.65),
        comorbidities: vec!["no_comorbidities".to_string()],
        health_conditions: Vec::new(),
        ..base.clone()
    };

    let comorbidity_route = QuestionnaireSubmission {
        age: given(48),
        gender: given("male".to_string()),
        is_childbearing_age_woman: None,
        weight_lb: given(163.1),
        comorbidities: vec!["diabetes".to_string()],
        eating_habits: vec!["excessive_appetite".to_string()],
        health_conditions: vec!["gerd".to_string(), "controlled_hypertension".to_string()],
        ..base.clone()
    };

    vec![
        ("Scenario A: pregnant, BMI 34.33, no contraception", base),
        ("Scenario B: BMI 25.00, no comorbidities", below_threshold),
        (
            "Scenario C: BMI 28.00 with diabetes and GERD",
            comorbidity_route,
        ),
    ]
}
