//! Versioned drug catalog: the fixed rule set the engine evaluates every profile against.
//!
//! A catalog is loaded once (strictly) at startup and then shared read-only. Reloads go
//! through [`CatalogStore::reload_from_path`], which parses leniently: an entry that fails
//! validation is quarantined instead of taking the whole catalog down, and the engine
//! surfaces a standing warning for it on every run.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{ConditionKey, HabitPattern};

pub const STANDARD_CATALOG_VERSION: &str = "2024.1";
const STANDARD_BASE_PRIORITY: i32 = 50;
/// Upper bound for a base priority and for the magnitude of any single boost.
pub const MAX_PRIORITY_MAGNITUDE: i32 = 1_000;

/// Priority bonus applied when the patient has a condition the drug is indicated for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicationBoost {
    pub condition: ConditionKey,
    pub boost: i32,
}

/// Priority bonus applied when the patient's overall eating-habit pattern matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitBoost {
    #[serde(alias = "class")]
    pub pattern: HabitPattern,
    pub boost: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrugCandidate {
    pub name: String,
    pub base_priority: i32,
    pub absolute_contraindications: BTreeSet<ConditionKey>,
    pub relative_contraindications: BTreeSet<ConditionKey>,
    #[serde(default)]
    pub indications: Vec<IndicationBoost>,
    #[serde(default)]
    pub habit_targets: Vec<HabitBoost>,
    #[serde(default)]
    pub teratogenic: bool,
}

/// A catalog entry that failed validation during a lenient load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantinedEntry {
    pub name: String,
    pub problem: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrugCatalog {
    version: String,
    drugs: Vec<DrugCandidate>,
    quarantined: Vec<QuarantinedEntry>,
}

/// Errors raised while loading a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("unable to read drug catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("drug catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("drug '{drug}' references unknown condition key '{key}'")]
    UnknownConditionKey { drug: String, key: String },
    #[error("catalog entry #{index} is malformed: {problem}")]
    MalformedEntry { index: usize, problem: String },
    #[error("drug '{0}' is declared more than once")]
    DuplicateDrug(String),
    #[error("drug catalog declares no drugs")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    version: String,
    drugs: Vec<serde_json::Value>,
}

/// Entry shape before condition keys are checked against [`ConditionKey`].
#[derive(Debug, Deserialize)]
struct RawDrugEntry {
    name: String,
    base_priority: i32,
    #[serde(default)]
    absolute_contraindications: Vec<String>,
    #[serde(default)]
    relative_contraindications: Vec<String>,
    #[serde(default)]
    indications: Vec<RawIndication>,
    #[serde(default)]
    habit_targets: Vec<HabitBoost>,
    #[serde(default)]
    teratogenic: bool,
}

#[derive(Debug, Deserialize)]
struct RawIndication {
    condition: String,
    boost: i32,
}

impl DrugCatalog {
    /// Build a catalog from already-typed entries, applying the same checks as a file load.
    pub fn new(version: impl Into<String>, drugs: Vec<DrugCandidate>) -> Result<Self, CatalogError> {
        if drugs.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = BTreeSet::new();
        for (index, drug) in drugs.iter().enumerate() {
            if drug.name.trim().is_empty() {
                return Err(CatalogError::MalformedEntry {
                    index,
                    problem: "drug name is blank".to_string(),
                });
            }
            if let Some(key) = drug
                .absolute_contraindications
                .iter()
                .chain(drug.relative_contraindications.iter())
                .find(|key| key.is_sentinel())
            {
                return Err(CatalogError::MalformedEntry {
                    index,
                    problem: format!("'{}' cannot be used as a contraindication", key.as_str()),
                });
            }
            check_priorities(index, drug)?;
            if !seen.insert(drug.name.to_ascii_lowercase()) {
                return Err(CatalogError::DuplicateDrug(drug.name.clone()));
            }
        }

        Ok(Self {
            version: version.into(),
            drugs,
            quarantined: Vec::new(),
        })
    }

    /// Strict load used at startup: any malformed entry fails the whole catalog.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_reader(reader)?;
        let mut drugs = Vec::with_capacity(document.drugs.len());
        for (index, value) in document.drugs.into_iter().enumerate() {
            drugs.push(parse_entry(index, value)?);
        }
        Self::new(document.version, drugs)
    }

    /// Lenient load used for reloads: malformed entries are quarantined, not fatal.
    ///
    /// The document itself must still parse and yield at least one valid drug.
    pub fn from_json_lenient(raw: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_str(raw)?;
        let mut drugs: Vec<DrugCandidate> = Vec::with_capacity(document.drugs.len());
        let mut quarantined = Vec::new();
        let mut seen = BTreeSet::new();

        for (index, value) in document.drugs.into_iter().enumerate() {
            let name = value
                .get("name")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("entry #{index}"));

            let checked = parse_entry(index, value).and_then(|drug| {
                if drug.name.trim().is_empty() {
                    Err(CatalogError::MalformedEntry {
                        index,
                        problem: "drug name is blank".to_string(),
                    })
                } else if seen.contains(&drug.name.to_ascii_lowercase()) {
                    Err(CatalogError::DuplicateDrug(drug.name.clone()))
                } else {
                    Ok(drug)
                }
            });

            match checked {
                Ok(drug) => {
                    seen.insert(drug.name.to_ascii_lowercase());
                    drugs.push(drug);
                }
                Err(err) => {
                    warn!(drug = %name, error = %err, "quarantining malformed catalog entry");
                    quarantined.push(QuarantinedEntry {
                        name,
                        problem: err.to_string(),
                    });
                }
            }
        }

        if drugs.is_empty() {
            return Err(CatalogError::Empty);
        }

        Ok(Self {
            version: document.version,
            drugs,
            quarantined,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Drugs in declaration order; this order breaks priority ties.
    pub fn drugs(&self) -> &[DrugCandidate] {
        &self.drugs
    }

    pub fn quarantined(&self) -> &[QuarantinedEntry] {
        &self.quarantined
    }

    pub fn get(&self, name: &str) -> Option<&DrugCandidate> {
        self.drugs
            .iter()
            .find(|drug| drug.name.eq_ignore_ascii_case(name))
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.drugs
            .iter()
            .position(|drug| drug.name.eq_ignore_ascii_case(name))
    }

    /// The nine-drug formulary the clinic screens against.
    pub fn standard() -> Self {
        use ConditionKey::{
            Adhd, AdhdOnMedication, ControlledHypertension, CoronaryArteryDisease, Diabetes,
            Gastroparesis, Gerd, Glaucoma, HeartDisease, HistoryDrugAbuse, HistoryPancreatitis,
            HistoryStroke, Hypertension, Hyperthyroidism, IntracranialHypertension,
            PlanningPregnancy, PregnancyBreastfeeding, PsychiatricTreatment, RecurrentKidneyStones,
            SleepApnea, TakingTamoxifen, ThyroidCancer, UncontrolledHypertension,
        };

        let stimulant_exclusions = [
            Hypertension,
            UncontrolledHypertension,
            Adhd,
            AdhdOnMedication,
            HistoryStroke,
            IntracranialHypertension,
            HeartDisease,
            HistoryDrugAbuse,
        ];
        let pregnancy_and_stones = [RecurrentKidneyStones, PlanningPregnancy, PregnancyBreastfeeding];
        let incretin_exclusions = [ThyroidCancer, HistoryPancreatitis, Gastroparesis];

        let drugs = vec![
            StandardDrug::new("Phentermine")
                .absolute(&stimulant_exclusions)
                .absolute(&[Glaucoma, Hyperthyroidism])
                .relative(&[ControlledHypertension, CoronaryArteryDisease])
                .habit(HabitPattern::Appetite, 40),
            StandardDrug::new("Topiramate")
                .absolute(&pregnancy_and_stones)
                .absolute(&[Glaucoma, PsychiatricTreatment])
                .habit(HabitPattern::Appetite, 10)
                .habit(HabitPattern::Behavioral, 30)
                .teratogenic(),
            StandardDrug::new("Qsymia")
                .absolute(&stimulant_exclusions)
                .absolute(&pregnancy_and_stones)
                .absolute(&[Glaucoma, PsychiatricTreatment, Hyperthyroidism])
                .relative(&[ControlledHypertension])
                .habit(HabitPattern::Appetite, 20)
                .habit(HabitPattern::Mixed, 40)
                .teratogenic(),
            StandardDrug::new("Contrave")
                .absolute(&[Hypertension, UncontrolledHypertension, TakingTamoxifen])
                .absolute(&[PsychiatricTreatment])
                .relative(&[ControlledHypertension])
                .habit(HabitPattern::Behavioral, 40)
                .habit(HabitPattern::Mixed, 30),
            StandardDrug::new("Naltrexone").habit(HabitPattern::Behavioral, 20),
            StandardDrug::new("Bupropion")
                .absolute(&[Hypertension, UncontrolledHypertension, TakingTamoxifen])
                .absolute(&[PsychiatricTreatment])
                .relative(&[ControlledHypertension])
                .habit(HabitPattern::Behavioral, 10),
            StandardDrug::new("Vyvanse")
                .absolute(&stimulant_exclusions)
                .absolute(&[Glaucoma])
                .relative(&[ControlledHypertension, CoronaryArteryDisease])
                .habit(HabitPattern::Appetite, 30),
            StandardDrug::new("Wegovy")
                .absolute(&incretin_exclusions)
                .relative(&[Gerd])
                .indication(Diabetes, 15)
                .indication(CoronaryArteryDisease, 10),
            StandardDrug::new("Zepbound")
                .absolute(&incretin_exclusions)
                .relative(&[Gerd])
                .indication(Diabetes, 15)
                .indication(SleepApnea, 10),
        ];

        Self {
            version: STANDARD_CATALOG_VERSION.to_string(),
            drugs: drugs.into_iter().map(StandardDrug::build).collect(),
            quarantined: Vec::new(),
        }
    }
}

fn parse_entry(index: usize, value: serde_json::Value) -> Result<DrugCandidate, CatalogError> {
    let raw: RawDrugEntry =
        serde_json::from_value(value).map_err(|err| CatalogError::MalformedEntry {
            index,
            problem: err.to_string(),
        })?;

    let absolute = parse_condition_set(&raw.name, &raw.absolute_contraindications, index)?;
    let relative = parse_condition_set(&raw.name, &raw.relative_contraindications, index)?;

    let mut indications = Vec::with_capacity(raw.indications.len());
    for indication in raw.indications {
        let condition = parse_condition(&raw.name, &indication.condition)?;
        indications.push(IndicationBoost {
            condition,
            boost: indication.boost,
        });
    }

    let drug = DrugCandidate {
        name: raw.name.trim().to_string(),
        base_priority: raw.base_priority,
        absolute_contraindications: absolute,
        relative_contraindications: relative,
        indications,
        habit_targets: raw.habit_targets,
        teratogenic: raw.teratogenic,
    };
    check_priorities(index, &drug)?;
    Ok(drug)
}

/// Keeps every reachable score well inside `i32`.
fn check_priorities(index: usize, drug: &DrugCandidate) -> Result<(), CatalogError> {
    if !(0..=MAX_PRIORITY_MAGNITUDE).contains(&drug.base_priority) {
        return Err(CatalogError::MalformedEntry {
            index,
            problem: format!(
                "base_priority {} is outside 0..={MAX_PRIORITY_MAGNITUDE}",
                drug.base_priority
            ),
        });
    }
    let boosts = drug
        .indications
        .iter()
        .map(|indication| indication.boost)
        .chain(drug.habit_targets.iter().map(|target| target.boost));
    for boost in boosts {
        if boost.unsigned_abs() > MAX_PRIORITY_MAGNITUDE.unsigned_abs() {
            return Err(CatalogError::MalformedEntry {
                index,
                problem: format!("boost {boost} is outside -{0}..={0}", MAX_PRIORITY_MAGNITUDE),
            });
        }
    }
    Ok(())
}

fn parse_condition_set(
    drug: &str,
    keys: &[String],
    index: usize,
) -> Result<BTreeSet<ConditionKey>, CatalogError> {
    let mut parsed = BTreeSet::new();
    for key in keys {
        let condition = parse_condition(drug, key)?;
        if condition.is_sentinel() {
            return Err(CatalogError::MalformedEntry {
                index,
                problem: format!("'{}' cannot be used as a contraindication", condition.as_str()),
            });
        }
        parsed.insert(condition);
    }
    Ok(parsed)
}

fn parse_condition(drug: &str, key: &str) -> Result<ConditionKey, CatalogError> {
    ConditionKey::from_key(key).ok_or_else(|| CatalogError::UnknownConditionKey {
        drug: drug.to_string(),
        key: key.to_string(),
    })
}

struct StandardDrug(DrugCandidate);

impl StandardDrug {
    fn new(name: &str) -> Self {
        Self(DrugCandidate {
            name: name.to_string(),
            base_priority: STANDARD_BASE_PRIORITY,
            absolute_contraindications: BTreeSet::new(),
            relative_contraindications: BTreeSet::new(),
            indications: Vec::new(),
            habit_targets: Vec::new(),
            teratogenic: false,
        })
    }

    fn absolute(mut self, keys: &[ConditionKey]) -> Self {
        self.0.absolute_contraindications.extend(keys.iter().copied());
        self
    }

    fn relative(mut self, keys: &[ConditionKey]) -> Self {
        self.0.relative_contraindications.extend(keys.iter().copied());
        self
    }

    fn indication(mut self, condition: ConditionKey, boost: i32) -> Self {
        self.0.indications.push(IndicationBoost { condition, boost });
        self
    }

    fn habit(mut self, pattern: HabitPattern, boost: i32) -> Self {
        self.0.habit_targets.push(HabitBoost { pattern, boost });
        self
    }

    fn teratogenic(mut self) -> Self {
        self.0.teratogenic = true;
        self
    }

    fn build(self) -> DrugCandidate {
        self.0
    }
}

/// Process-wide holder for the active catalog.
///
/// Readers take an `Arc` snapshot and keep evaluating against it even if a reload swaps the
/// reference mid-run.
#[derive(Debug)]
pub struct CatalogStore {
    current: RwLock<Arc<DrugCatalog>>,
}

impl CatalogStore {
    pub fn new(catalog: DrugCatalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    pub fn snapshot(&self) -> Arc<DrugCatalog> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in a new catalog, returning the one it replaced.
    pub fn replace(&self, catalog: DrugCatalog) -> Arc<DrugCatalog> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(catalog))
    }

    /// Reload from disk leniently. On error the active catalog is left untouched.
    pub fn reload_from_path(&self, path: impl AsRef<Path>) -> Result<Arc<DrugCatalog>, CatalogError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = DrugCatalog::from_json_lenient(&raw)?;
        info!(
            version = catalog.version(),
            drugs = catalog.drugs().len(),
            quarantined = catalog.quarantined().len(),
            "drug catalog reloaded"
        );
        self.replace(catalog);
        Ok(self.snapshot())
    }
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new(DrugCatalog::standard())
    }
}
